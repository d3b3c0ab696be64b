//! Tuning session tracking and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ns_types::ParameterValue;

use crate::search::ParameterSearch;

/// Unique tuning session identifier.
pub type SessionId = Uuid;

/// Lifecycle state of a tuning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningState {
    Pending,
    Running,
    Completed,
}

/// Why a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every candidate value was evaluated.
    Exhausted,
    /// The bisection round limit was reached.
    MaxIterations,
    /// The best score did not improve for the configured number of rounds.
    NoImprovement,
    /// The bisection interval collapsed to a single point.
    Converged,
}

/// One evaluated parameter value and its aggregated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub round: usize,
    pub value: ParameterValue,
    pub score: f64,
}

/// Outcome of a tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub id: SessionId,
    pub parameter: String,
    pub sampler: String,
    pub scorer: String,
    pub search: ParameterSearch,
    pub n_trials: usize,
    pub state: TuningState,
    pub evaluations: Vec<Evaluation>,
    pub rounds: usize,
    pub stop_reason: Option<StopReason>,
    pub best_value: Option<ParameterValue>,
    pub best_score: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TuningReport {
    pub fn new(
        parameter: impl Into<String>,
        sampler: impl Into<String>,
        scorer: impl Into<String>,
        search: ParameterSearch,
        n_trials: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parameter: parameter.into(),
            sampler: sampler.into(),
            scorer: scorer.into(),
            search,
            n_trials,
            state: TuningState::Pending,
            evaluations: Vec::new(),
            rounds: 0,
            stop_reason: None,
            best_value: None,
            best_score: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = TuningState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, reason: StopReason) {
        self.state = TuningState::Completed;
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    /// Record an evaluation. Returns true when it became the new best.
    ///
    /// The best starts at negative infinity and only a strictly greater score
    /// replaces it, so ties keep the earlier value and NaN never wins.
    pub fn record(&mut self, round: usize, value: ParameterValue, score: f64) -> bool {
        self.evaluations.push(Evaluation {
            round,
            value,
            score,
        });
        let improved = score > self.best_score.unwrap_or(f64::NEG_INFINITY);
        if improved {
            self.best_score = Some(score);
            self.best_value = Some(value);
        }
        improved
    }

    /// Evaluations made in one round, in dispatch order.
    pub fn round(&self, round: usize) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(move |e| e.round == round)
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}
