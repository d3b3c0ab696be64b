//! Search definitions for a single sampler hyperparameter.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use ns_types::{config_error, NsResult, ParameterValue};

/// How the values of the tuned hyperparameter are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSearch {
    /// Evaluate every value once, in the supplied order.
    Candidates(Vec<ParameterValue>),
    /// Bisection over the closed interval `[low, high]`.
    Bisection { low: f64, high: f64 },
}

impl ParameterSearch {
    pub fn candidates<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        Self::Candidates(values.into_iter().map(Into::into).collect())
    }

    pub fn bisection(low: f64, high: f64) -> Self {
        Self::Bisection { low, high }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Candidates(_) => "candidates",
            Self::Bisection { .. } => "bisection",
        }
    }

    /// Whether an integer-only bisection has at least one value to try.
    pub fn has_integers(&self) -> bool {
        match self {
            Self::Candidates(_) => true,
            Self::Bisection { low, high } => low.ceil() <= high.floor(),
        }
    }

    pub fn validate(&self) -> NsResult<()> {
        match self {
            Self::Candidates(values) if values.is_empty() => {
                Err(config_error!("candidate list must not be empty"))
            }
            Self::Candidates(_) => Ok(()),
            Self::Bisection { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(config_error!(
                        "bisection bounds must be finite, got ({low}, {high})"
                    ));
                }
                if low > high {
                    return Err(config_error!(
                        "bisection lower bound {low} exceeds upper bound {high}"
                    ));
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bisection interval
// ---------------------------------------------------------------------------

/// Working interval of a bisection search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
    pub int_only: bool,
}

impl Interval {
    /// With `int_only` the bounds shrink to the integers inside `[low, high]`.
    pub fn new(low: f64, high: f64, int_only: bool) -> Self {
        let (low, high) = if int_only {
            (low.ceil(), high.floor())
        } else {
            (low, high)
        };
        Self {
            low: low.min(high),
            high: low.max(high),
            int_only,
        }
    }

    pub fn mid(&self) -> f64 {
        let mid = (self.low + self.high) / 2.0;
        if self.int_only {
            mid.trunc()
        } else {
            mid
        }
    }

    /// The three points evaluated each round: low, mid, high.
    pub fn points(&self) -> [f64; 3] {
        [self.low, self.mid(), self.high]
    }

    pub fn is_collapsed(&self) -> bool {
        self.low == self.high
    }

    /// Parameter value handed to the sampler for point `x`.
    pub fn value(&self, x: f64) -> ParameterValue {
        if self.int_only {
            ParameterValue::Int(x as i64)
        } else {
            ParameterValue::Float(x)
        }
    }

    /// Keep the two best-scoring points as the next interval.
    pub fn narrow(&self, points: &[f64; 3], scores: &[f64; 3]) -> Self {
        let ranked = rank_descending(scores);
        let a = points[ranked[0]];
        let b = points[ranked[1]];
        Self::new(a, b, self.int_only)
    }
}

/// Indices of `scores` from best to worst.
///
/// The sort is stable, so equal scores keep their input order. NaN ranks
/// below every number.
pub fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));
    order
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
