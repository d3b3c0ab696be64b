//! Trial evaluation: one sample followed by one score.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use ns_types::{internal_error, Aggregate, Graph, NodeId, NsResult, ParameterValue, Score};

use crate::adapter::NetworkSampler;
use crate::pool::WorkerPool;

/// Draw a fresh sample with `adapter` and score it.
///
/// Only the adapter's own last sample is touched, so independent adapter
/// copies can run this concurrently against the same graph.
pub fn rescore(
    adapter: &mut NetworkSampler,
    graph: &Graph,
    start_node: Option<NodeId>,
) -> NsResult<Score> {
    adapter.sample(graph, start_node)?;
    adapter.score()
}

/// A self-contained unit of work for the worker pool.
#[derive(Debug, Clone)]
pub struct TrialTask {
    pub adapter: NetworkSampler,
    pub graph: Arc<Graph>,
    pub start_node: Option<NodeId>,
}

impl TrialTask {
    pub fn new(adapter: NetworkSampler, graph: Arc<Graph>, start_node: Option<NodeId>) -> Self {
        Self {
            adapter,
            graph,
            start_node,
        }
    }

    pub fn run(mut self) -> NsResult<Score> {
        rescore(&mut self.adapter, &self.graph, self.start_node)
    }
}

/// Scores of `n_trials` independent trials for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBatch {
    /// Hyperparameter value the trials ran with, when tuning.
    pub value: Option<ParameterValue>,
    pub scores: Vec<Score>,
    pub aggregate: Aggregate,
}

impl TrialBatch {
    pub fn new(value: Option<ParameterValue>, scores: Vec<Score>, aggregate: Aggregate) -> Self {
        Self {
            value,
            scores,
            aggregate,
        }
    }

    /// Representative score of the batch.
    pub fn aggregated(&self) -> NsResult<Score> {
        self.aggregate.reduce(&self.scores)
    }

    /// Representative score as a number; fails for distribution scores.
    pub fn scalar(&self) -> NsResult<f64> {
        self.aggregated()?.as_scalar()
    }
}

/// Run `n_trials` trials for each configured adapter as one pool batch.
///
/// Every trial gets its own copy of its adapter. Batches come back in the
/// order of `configs`.
pub fn run_trial_batches(
    pool: &WorkerPool,
    configs: &[(Option<ParameterValue>, NetworkSampler)],
    graph: &Arc<Graph>,
    start_node: Option<NodeId>,
    n_trials: usize,
    aggregate: Aggregate,
) -> NsResult<Vec<TrialBatch>> {
    let jobs: Vec<_> = configs
        .iter()
        .flat_map(|(_, adapter)| {
            (0..n_trials).map(move |_| {
                let task = TrialTask::new(adapter.clone(), Arc::clone(graph), start_node);
                move || task.run()
            })
        })
        .collect();

    debug!(
        "Dispatching {} trials for {} configurations",
        jobs.len(),
        configs.len()
    );
    let mut scores = pool.run_batch(jobs)?.into_iter();

    let mut batches = Vec::with_capacity(configs.len());
    for (value, _) in configs {
        let chunk: Vec<Score> = scores.by_ref().take(n_trials).collect();
        if chunk.len() != n_trials {
            return Err(internal_error!(
                "expected {} trial scores, received {}",
                n_trials,
                chunk.len()
            ));
        }
        batches.push(TrialBatch::new(*value, chunk, aggregate));
    }
    Ok(batches)
}

/// Run `n_trials` trials of one adapter configuration.
pub fn run_trials(
    pool: &WorkerPool,
    adapter: &NetworkSampler,
    graph: &Arc<Graph>,
    start_node: Option<NodeId>,
    n_trials: usize,
    aggregate: Aggregate,
) -> NsResult<TrialBatch> {
    let configs = [(None, adapter.clone())];
    run_trial_batches(pool, &configs, graph, start_node, n_trials, aggregate)?
        .pop()
        .ok_or_else(|| internal_error!("trial batch missing"))
}
