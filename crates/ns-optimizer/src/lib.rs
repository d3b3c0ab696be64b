//! # ns-optimizer
//!
//! Hyperparameter tuning for netsample samplers.
//!
//! Provides search definitions for one sampler hyperparameter (a discrete
//! candidate sweep or bisection over a bounded interval), tuning session
//! configuration, and session reports with the full evaluation history.

mod report;
mod search;
mod tuner;

pub use report::{Evaluation, SessionId, StopReason, TuningReport, TuningState};
pub use search::{rank_descending, Interval, ParameterSearch};
pub use tuner::{ParameterTuner, TuneConfig};
