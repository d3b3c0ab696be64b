//! Scores produced by scoring methods and their aggregation across trials.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{NsError, NsResult};

/// Output of a scoring method: a single number or a distribution
/// (e.g. a degree histogram) that accumulates element-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Scalar(f64),
    Distribution(Vec<f64>),
}

impl Score {
    /// Scalar view; distributions cannot be ranked.
    pub fn as_scalar(&self) -> NsResult<f64> {
        match self {
            Self::Scalar(v) => Ok(*v),
            Self::Distribution(values) => Err(NsError::Validation(format!(
                "expected a scalar score, got a distribution of {} values",
                values.len()
            ))),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

impl From<f64> for Score {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for Score {
    fn from(v: Vec<f64>) -> Self {
        Self::Distribution(v)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Distribution(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", joined.join(";"))
            }
        }
    }
}

/// How trial scores for one configuration are reduced to a representative score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Sum,
}

impl Aggregate {
    /// Reduce plain numbers.
    pub fn reduce_scalars(self, values: &[f64]) -> NsResult<f64> {
        if values.is_empty() {
            return Err(NsError::Validation(
                "cannot aggregate an empty set of scores".to_string(),
            ));
        }
        let n = values.len() as f64;
        let out = match self {
            Self::Mean => values.iter().sum::<f64>() / n,
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Ok(out)
    }

    /// Reduce trial scores. Distributions are reduced position by position,
    /// with shorter distributions padded by zeros.
    pub fn reduce(self, scores: &[Score]) -> NsResult<Score> {
        let first = scores.first().ok_or_else(|| {
            NsError::Validation("cannot aggregate an empty set of scores".to_string())
        })?;

        match first {
            Score::Scalar(_) => {
                let values = scores
                    .iter()
                    .map(|s| match s {
                        Score::Scalar(v) => Ok(*v),
                        Score::Distribution(_) => Err(mixed_kinds()),
                    })
                    .collect::<NsResult<Vec<f64>>>()?;
                Ok(Score::Scalar(self.reduce_scalars(&values)?))
            }
            Score::Distribution(_) => {
                let rows = scores
                    .iter()
                    .map(|s| match s {
                        Score::Distribution(values) => Ok(values.as_slice()),
                        Score::Scalar(_) => Err(mixed_kinds()),
                    })
                    .collect::<NsResult<Vec<&[f64]>>>()?;

                let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
                let mut column = Vec::with_capacity(rows.len());
                let mut out = Vec::with_capacity(width);
                for i in 0..width {
                    column.clear();
                    column.extend(rows.iter().map(|r| r.get(i).copied().unwrap_or(0.0)));
                    out.push(self.reduce_scalars(&column)?);
                }
                Ok(Score::Distribution(out))
            }
        }
    }
}

fn mixed_kinds() -> NsError {
    NsError::Validation("cannot aggregate scalar and distribution scores together".to_string())
}
