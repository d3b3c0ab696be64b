//! Sampler/scorer adapter.
//!
//! [`NetworkSampler`] pairs one sampling algorithm with one scoring metric:
//! `sample` draws a subgraph and remembers it, `score` evaluates the most
//! recent sample. Cloning is cheap and yields an independent adapter with its
//! own last sample, which is how trials are distributed to workers.

use std::sync::Arc;
use tracing::debug;

use ns_types::{
    config_error, state_error, Graph, NodeId, NsError, NsResult, ParameterValue, SamplingMethod,
    Score, ScoringMethod,
};

#[derive(Debug, Clone)]
pub struct NetworkSampler {
    sampler: Arc<dyn SamplingMethod>,
    scorer: Arc<dyn ScoringMethod>,
    last_sample: Option<Arc<Graph>>,
}

impl NetworkSampler {
    /// Pair a sampler with a scorer. Both are validated up front.
    pub fn new<S, C>(sampler: S, scorer: C) -> NsResult<Self>
    where
        S: SamplingMethod + 'static,
        C: ScoringMethod + 'static,
    {
        Self::from_parts(Arc::new(sampler), Arc::new(scorer))
    }

    pub fn from_parts(
        sampler: Arc<dyn SamplingMethod>,
        scorer: Arc<dyn ScoringMethod>,
    ) -> NsResult<Self> {
        check_sampler(sampler.as_ref())?;
        check_scorer(scorer.as_ref())?;
        debug!(
            "Paired sampler {} with scorer {}",
            sampler.name(),
            scorer.name()
        );
        Ok(Self {
            sampler,
            scorer,
            last_sample: None,
        })
    }

    /// Swap the sampling algorithm. The previous sample no longer describes
    /// the current sampler and is dropped.
    pub fn replace_sampler(&mut self, sampler: Arc<dyn SamplingMethod>) -> NsResult<()> {
        check_sampler(sampler.as_ref())?;
        self.sampler = sampler;
        self.last_sample = None;
        Ok(())
    }

    /// Swap the scoring metric, keeping the last sample so it can be rescored.
    pub fn replace_scorer(&mut self, scorer: Arc<dyn ScoringMethod>) -> NsResult<()> {
        check_scorer(scorer.as_ref())?;
        self.scorer = scorer;
        Ok(())
    }

    pub fn sample(&mut self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Arc<Graph>> {
        let sample = Arc::new(self.sampler.sample(graph, start_node)?);
        self.last_sample = Some(Arc::clone(&sample));
        Ok(sample)
    }

    /// Score the most recent sample.
    pub fn score(&self) -> NsResult<Score> {
        let sample = self.last_sample.as_ref().ok_or_else(|| {
            state_error!("score() requires a sample; call sample() first")
        })?;
        self.scorer.evaluate(sample)
    }

    pub fn sample_and_score(
        &mut self,
        graph: &Graph,
        start_node: Option<NodeId>,
    ) -> NsResult<(Arc<Graph>, Score)> {
        let sample = self.sample(graph, start_node)?;
        let score = self.score()?;
        Ok((sample, score))
    }

    /// Forget the last sample.
    pub fn reset(&mut self) {
        self.last_sample = None;
    }

    pub fn last_sample(&self) -> Option<&Arc<Graph>> {
        self.last_sample.as_ref()
    }

    /// Assign a sampler hyperparameter. The sampler is copied before the
    /// change, so clones handed out earlier keep their configuration.
    pub fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()> {
        if !self.has_parameter(name) {
            return Err(config_error!(
                "sampler {} has no parameter '{}' (known: {})",
                self.sampler.name(),
                name,
                self.sampler.parameter_names().join(", ")
            ));
        }
        let mut next = self.sampler.clone_box();
        next.set_parameter(name, value)?;
        check_sampler(next.as_ref())?;
        self.sampler = Arc::from(next);
        self.last_sample = None;
        Ok(())
    }

    /// Independent copy with one hyperparameter changed.
    pub fn with_parameter(&self, name: &str, value: &ParameterValue) -> NsResult<Self> {
        let mut copy = Self {
            sampler: Arc::clone(&self.sampler),
            scorer: Arc::clone(&self.scorer),
            last_sample: None,
        };
        copy.set_parameter(name, value)?;
        Ok(copy)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.sampler
            .parameter_names()
            .iter()
            .any(|known| *known == name)
    }

    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.sampler.parameter_names()
    }

    pub fn parameter(&self, name: &str) -> Option<ParameterValue> {
        self.sampler.parameter(name)
    }

    pub fn sampler(&self) -> &Arc<dyn SamplingMethod> {
        &self.sampler
    }

    pub fn scorer(&self) -> &Arc<dyn ScoringMethod> {
        &self.scorer
    }

    pub fn sampler_name(&self) -> &str {
        self.sampler.name()
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }
}

fn check_sampler(sampler: &dyn SamplingMethod) -> NsResult<()> {
    if sampler.name().trim().is_empty() {
        return Err(config_error!("sampler name must not be empty"));
    }
    sampler.validate().map_err(into_config)
}

fn check_scorer(scorer: &dyn ScoringMethod) -> NsResult<()> {
    scorer.validate().map_err(into_config)
}

/// Validation failures at construction time are configuration errors.
fn into_config(err: NsError) -> NsError {
    match err {
        NsError::Config(_) => err,
        other => NsError::Config(other.to_string()),
    }
}
