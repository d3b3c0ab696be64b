//! Capabilities expected from sampling algorithms and scoring metrics.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{NsError, NsResult};
use crate::graph::{Graph, NodeId};
use crate::params::ParameterValue;
use crate::score::Score;

/// A graph sampling algorithm with tunable hyperparameters.
///
/// `sample` takes `&self`: a configured sampler is an immutable snapshot and
/// may be shared between concurrently running trials. Hyperparameters change
/// only through `set_parameter` on an owned copy.
pub trait SamplingMethod: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name, used as the default table label.
    fn name(&self) -> &str;

    /// Draw a sample from `graph`, spreading from `start_node` when given.
    fn sample(&self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Graph>;

    /// Names accepted by `set_parameter`.
    fn parameter_names(&self) -> Vec<&'static str>;

    /// Assign one hyperparameter by name.
    fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()>;

    /// Current value of one hyperparameter, if it exists.
    fn parameter(&self, name: &str) -> Option<ParameterValue>;

    /// Check the current configuration before the sampler is used.
    fn validate(&self) -> NsResult<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SamplingMethod>;
}

impl Clone for Box<dyn SamplingMethod> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Fixed keyword parameters handed to a scoring callable.
pub type ScoreParams = BTreeMap<String, ParameterValue>;

/// A quality metric evaluated on a sampled graph.
pub trait ScoringMethod: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn evaluate(&self, graph: &Graph) -> NsResult<Score>;

    /// Fixed parameters the metric is evaluated with.
    fn params(&self) -> &ScoreParams;

    fn validate(&self) -> NsResult<()> {
        Ok(())
    }
}

/// Scoring callable signature.
pub type ScoreFn = dyn Fn(&Graph, &ScoreParams) -> NsResult<Score> + Send + Sync;

/// A scoring callable paired with its fixed parameters.
#[derive(Clone)]
pub struct ScoringFn {
    name: String,
    func: Arc<ScoreFn>,
    params: ScoreParams,
    required: Vec<&'static str>,
}

impl ScoringFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Graph, &ScoreParams) -> NsResult<Score> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            params: ScoreParams::new(),
            required: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Declare a parameter that must be present for the metric to be usable.
    pub fn requires(mut self, key: &'static str) -> Self {
        if !self.required.contains(&key) {
            self.required.push(key);
        }
        self
    }

    pub fn param(&self, key: &str) -> Option<&ParameterValue> {
        self.params.get(key)
    }
}

impl ScoringMethod for ScoringFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, graph: &Graph) -> NsResult<Score> {
        (self.func)(graph, &self.params)
    }

    fn params(&self) -> &ScoreParams {
        &self.params
    }

    fn validate(&self) -> NsResult<()> {
        if self.name.trim().is_empty() {
            return Err(NsError::Config("scorer name must not be empty".to_string()));
        }
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|key| !self.params.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(NsError::Config(format!(
                "scorer '{}' is missing required parameters: {}",
                self.name,
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ScoringFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringFn")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Fetch a numeric scoring parameter.
pub fn required_f64(params: &ScoreParams, key: &str) -> NsResult<f64> {
    params
        .get(key)
        .ok_or_else(|| NsError::Config(format!("missing scoring parameter '{key}'")))?
        .as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_ratio() -> ScoringFn {
        ScoringFn::new("edge_ratio", |graph, params| {
            let scale = required_f64(params, "scale")?;
            Ok(Score::Scalar(graph.edge_count() as f64 * scale))
        })
        .requires("scale")
    }

    #[test]
    fn scoring_fn_passes_fixed_params() {
        let scorer = edge_ratio().with_param("scale", 0.5);
        scorer.validate().unwrap();
        let graph = Graph::from_edges([(1, 2), (2, 3)]);
        assert_eq!(scorer.evaluate(&graph).unwrap(), Score::Scalar(1.0));
        assert_eq!(scorer.param("scale"), Some(&ParameterValue::Float(0.5)));
    }

    #[test]
    fn missing_required_param_fails_validation() {
        match edge_ratio().validate() {
            Err(NsError::Config(msg)) => assert!(msg.contains("scale")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_name_fails_validation() {
        let scorer = ScoringFn::new("  ", |_, _| Ok(Score::Scalar(0.0)));
        assert!(matches!(scorer.validate(), Err(NsError::Config(_))));
    }
}
