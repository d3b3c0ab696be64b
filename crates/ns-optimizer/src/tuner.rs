//! Tuning sessions over one sampler hyperparameter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use ns_sampling::{run_trial_batches, NetworkSampler, TrialBatch, WorkerPool, WorkerPoolConfig};
use ns_types::{config_error, Aggregate, Graph, NodeId, NsResult, ParameterValue};

use crate::report::{StopReason, TuningReport};
use crate::search::{Interval, ParameterSearch};

/// Configuration of one tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneConfig {
    /// Sampler hyperparameter to tune.
    pub parameter: String,
    pub search: ParameterSearch,

    /// Bisect over integers: bounds round inward, midpoints truncate.
    #[serde(default)]
    pub int_only: bool,

    /// Independent trials per evaluated value.
    #[serde(default = "default_trials")]
    pub n_trials: usize,

    /// Maximum bisection rounds.
    #[serde(default = "default_iterations")]
    pub n_iter: usize,

    /// Stop bisection after this many rounds without a better score.
    #[serde(default)]
    pub n_no_improve: Option<usize>,

    #[serde(default)]
    pub aggregate: Aggregate,

    /// Wall-clock limit for each pool batch, in milliseconds: one candidate's
    /// trials, or one bisection round.
    #[serde(default)]
    pub batch_timeout_ms: Option<u64>,
}

fn default_trials() -> usize {
    1
}

fn default_iterations() -> usize {
    10
}

impl TuneConfig {
    pub fn new(parameter: impl Into<String>, search: ParameterSearch) -> Self {
        Self {
            parameter: parameter.into(),
            search,
            int_only: false,
            n_trials: default_trials(),
            n_iter: default_iterations(),
            n_no_improve: None,
            aggregate: Aggregate::Mean,
            batch_timeout_ms: None,
        }
    }

    pub fn with_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    pub fn with_iterations(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_no_improve(mut self, n: usize) -> Self {
        self.n_no_improve = Some(n);
        self
    }

    pub fn int_only(mut self, int_only: bool) -> Self {
        self.int_only = int_only;
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> NsResult<()> {
        self.search.validate()?;
        if self.int_only && !self.search.has_integers() {
            return Err(config_error!(
                "no integer lies inside the bisection bounds of '{}'",
                self.parameter
            ));
        }
        if self.n_trials == 0 {
            return Err(config_error!("n_trials must be at least 1"));
        }
        if self.n_iter == 0 {
            return Err(config_error!("n_iter must be at least 1"));
        }
        if self.n_no_improve == Some(0) {
            return Err(config_error!("n_no_improve must be at least 1 when set"));
        }
        if self.batch_timeout_ms == Some(0) {
            return Err(config_error!("batch timeout must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tuner
// ---------------------------------------------------------------------------

/// Tunes one hyperparameter of an adapter's sampler against a fixed graph
/// and start node.
///
/// Every evaluated value runs on its own adapter snapshot, so the tuner's
/// adapter is never modified by a session.
#[derive(Debug)]
pub struct ParameterTuner {
    adapter: NetworkSampler,
    graph: Arc<Graph>,
    start_node: Option<NodeId>,
    pool: Option<WorkerPool>,
}

impl ParameterTuner {
    pub fn new(
        adapter: NetworkSampler,
        graph: impl Into<Arc<Graph>>,
        start_node: Option<NodeId>,
    ) -> Self {
        Self {
            adapter,
            graph: graph.into(),
            start_node,
            pool: None,
        }
    }

    /// Run trials on `pool` instead of a pool sized to the machine.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn adapter(&self) -> &NetworkSampler {
        &self.adapter
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Run one tuning session.
    ///
    /// All argument checks happen before the first trial is dispatched. Any
    /// trial failure aborts the session.
    pub fn tune(&self, config: &TuneConfig) -> NsResult<TuningReport> {
        config.validate()?;
        if !self.adapter.has_parameter(&config.parameter) {
            return Err(config_error!(
                "sampler {} has no parameter '{}' (known: {})",
                self.adapter.sampler_name(),
                config.parameter,
                self.adapter.parameter_names().join(", ")
            ));
        }

        let owned;
        let pool = match &self.pool {
            Some(pool) => {
                if config.batch_timeout_ms.is_some() {
                    debug!("Using the supplied worker pool's own batch timeout");
                }
                pool
            }
            None => {
                let mut pool_config = WorkerPoolConfig::default();
                if let Some(timeout) = config.batch_timeout() {
                    pool_config = pool_config.with_batch_timeout(timeout);
                }
                owned = WorkerPool::new(pool_config)?;
                &owned
            }
        };

        let mut report = TuningReport::new(
            config.parameter.clone(),
            self.adapter.sampler_name(),
            self.adapter.scorer_name(),
            config.search.clone(),
            config.n_trials,
        );
        report.mark_running();
        info!(
            "Tuning '{}' of {} against {} ({} search, {} trials per value, {} workers)",
            config.parameter,
            report.sampler,
            report.scorer,
            config.search.mode(),
            config.n_trials,
            pool.num_workers()
        );

        let reason = match &config.search {
            ParameterSearch::Candidates(values) => {
                self.sweep_candidates(pool, config, values, &mut report)?
            }
            ParameterSearch::Bisection { low, high } => {
                let interval = Interval::new(*low, *high, config.int_only);
                self.bisect(pool, config, interval, &mut report)?
            }
        };
        report.mark_completed(reason);

        match (&report.best_value, report.best_score) {
            (Some(value), Some(score)) => info!(
                "Tuning finished after {} round(s) ({:?}): best {} = {} (score {})",
                report.rounds, reason, config.parameter, value, score
            ),
            _ => info!(
                "Tuning finished after {} round(s) ({:?}) without a finite best score",
                report.rounds, reason
            ),
        }
        Ok(report)
    }

    /// Tune one parameter and return only the best value found.
    pub fn tune_single(
        &self,
        name: &str,
        search: ParameterSearch,
        int_only: bool,
        n_trials: usize,
        n_iter: usize,
        n_no_improve: Option<usize>,
    ) -> NsResult<Option<ParameterValue>> {
        let mut config = TuneConfig::new(name, search)
            .int_only(int_only)
            .with_trials(n_trials)
            .with_iterations(n_iter);
        config.n_no_improve = n_no_improve;
        Ok(self.tune(&config)?.best_value)
    }

    /// Adapter snapshots for `values`, built before anything is dispatched.
    fn snapshots(
        &self,
        parameter: &str,
        values: &[ParameterValue],
    ) -> NsResult<Vec<(Option<ParameterValue>, NetworkSampler)>> {
        values
            .iter()
            .map(|value| Ok((Some(*value), self.adapter.with_parameter(parameter, value)?)))
            .collect()
    }

    fn evaluate(
        &self,
        pool: &WorkerPool,
        config: &TuneConfig,
        values: &[ParameterValue],
    ) -> NsResult<Vec<f64>> {
        let configs = self.snapshots(&config.parameter, values)?;
        let batches = run_trial_batches(
            pool,
            &configs,
            &self.graph,
            self.start_node,
            config.n_trials,
            config.aggregate,
        )?;
        batches.iter().map(TrialBatch::scalar).collect()
    }

    fn sweep_candidates(
        &self,
        pool: &WorkerPool,
        config: &TuneConfig,
        values: &[ParameterValue],
        report: &mut TuningReport,
    ) -> NsResult<StopReason> {
        // One batch per candidate, in the order supplied.
        for value in values {
            for score in self.evaluate(pool, config, std::slice::from_ref(value))? {
                debug!("{} = {}: score {}", config.parameter, value, score);
                report.record(1, *value, score);
            }
        }
        report.rounds = 1;
        Ok(StopReason::Exhausted)
    }

    fn bisect(
        &self,
        pool: &WorkerPool,
        config: &TuneConfig,
        mut interval: Interval,
        report: &mut TuningReport,
    ) -> NsResult<StopReason> {
        let mut stale_rounds = 0usize;

        for round in 1..=config.n_iter {
            let points = interval.points();
            let values = points.map(|x| interval.value(x));
            let scores = self.evaluate(pool, config, &values)?;
            let scores: [f64; 3] = [scores[0], scores[1], scores[2]];

            let mut improved = false;
            for (value, score) in values.iter().zip(scores) {
                improved |= report.record(round, *value, score);
            }
            report.rounds = round;
            stale_rounds = if improved { 0 } else { stale_rounds + 1 };

            debug!(
                "Round {}: [{}, {}, {}] scored [{}, {}, {}], {} round(s) without improvement",
                round,
                values[0],
                values[1],
                values[2],
                scores[0],
                scores[1],
                scores[2],
                stale_rounds
            );

            if config.n_no_improve.is_some_and(|limit| stale_rounds >= limit) {
                return Ok(StopReason::NoImprovement);
            }

            interval = interval.narrow(&points, &scores);
            if interval.is_collapsed() {
                return Ok(StopReason::Converged);
            }
        }
        Ok(StopReason::MaxIterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_sampling::{scoring, RandomWalkSampler};
    use ns_types::{NsError, SamplingMethod, Score, ScoringFn, TrialError};

    /// Sampler whose sample records its parameter in the graph name.
    #[derive(Debug, Clone)]
    struct Probe {
        x: f64,
    }

    impl SamplingMethod for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn sample(&self, _graph: &Graph, _start: Option<NodeId>) -> NsResult<Graph> {
            Ok(Graph::new().with_name(self.x.to_string()))
        }

        fn parameter_names(&self) -> Vec<&'static str> {
            vec!["x"]
        }

        fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()> {
            match name {
                "x" => {
                    self.x = value.as_f64()?;
                    Ok(())
                }
                other => Err(config_error!("unknown parameter {other}")),
            }
        }

        fn parameter(&self, name: &str) -> Option<ParameterValue> {
            (name == "x").then_some(ParameterValue::Float(self.x))
        }

        fn clone_box(&self) -> Box<dyn SamplingMethod> {
            Box::new(self.clone())
        }
    }

    /// Score `-(x - peak)^2` read back from the probe's sample.
    fn peak_at(peak: f64) -> ScoringFn {
        ScoringFn::new("peak", move |graph, _| {
            let x: f64 = graph
                .name()
                .and_then(|name| name.parse().ok())
                .ok_or_else(|| NsError::Validation("probe sample without value".into()))?;
            Ok(Score::Scalar(-(x - peak).powi(2)))
        })
    }

    fn probe_tuner(scorer: ScoringFn) -> ParameterTuner {
        let adapter = NetworkSampler::new(Probe { x: 0.0 }, scorer).unwrap();
        let pool = WorkerPool::new(WorkerPoolConfig::default().with_workers(2)).unwrap();
        ParameterTuner::new(adapter, Graph::from_edges([(0, 1)]), None).with_pool(pool)
    }

    /// Sampler that sleeps `ms` milliseconds and names its sample after it.
    #[derive(Debug, Clone)]
    struct Sleepy {
        ms: f64,
    }

    impl SamplingMethod for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn sample(&self, _graph: &Graph, _start: Option<NodeId>) -> NsResult<Graph> {
            std::thread::sleep(Duration::from_millis(self.ms as u64));
            Ok(Graph::new().with_name(self.ms.to_string()))
        }

        fn parameter_names(&self) -> Vec<&'static str> {
            vec!["ms"]
        }

        fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()> {
            match name {
                "ms" => {
                    self.ms = value.as_f64()?;
                    Ok(())
                }
                other => Err(config_error!("unknown parameter {other}")),
            }
        }

        fn parameter(&self, name: &str) -> Option<ParameterValue> {
            (name == "ms").then_some(ParameterValue::Float(self.ms))
        }

        fn clone_box(&self) -> Box<dyn SamplingMethod> {
            Box::new(self.clone())
        }
    }

    fn ring(n: u64) -> Graph {
        Graph::from_edges((0..n).map(|i| (i, (i + 1) % n)))
    }

    #[test]
    fn discrete_sweep_picks_the_best_candidate() {
        let tuner = probe_tuner(peak_at(4.0));
        let best = tuner
            .tune_single("x", ParameterSearch::candidates([2i64, 4, 6]), false, 3, 10, None)
            .unwrap();
        assert_eq!(best, Some(ParameterValue::Int(4)));
    }

    #[test]
    fn discrete_ties_keep_the_first_value() {
        let tuner = probe_tuner(peak_at(4.0));
        let report = tuner
            .tune(&TuneConfig::new("x", ParameterSearch::candidates([3i64, 5, 7])))
            .unwrap();
        assert_eq!(report.best_value, Some(ParameterValue::Int(3)));
        assert_eq!(report.best_score, Some(-1.0));
        assert_eq!(report.evaluations.len(), 3);
        assert_eq!(report.stop_reason, Some(StopReason::Exhausted));
    }

    #[test]
    fn discrete_sweep_over_real_sampler() {
        // the sample size equals number_of_nodes, so the largest candidate wins
        let adapter =
            NetworkSampler::new(RandomWalkSampler::new(2), scoring::node_count()).unwrap();
        let tuner = ParameterTuner::new(adapter, ring(12), Some(0));
        let config = TuneConfig::new("number_of_nodes", ParameterSearch::candidates([2i64, 4, 6]))
            .with_trials(3);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.best_value, Some(ParameterValue::Int(6)));
        assert_eq!(report.best_score, Some(6.0));
        // the tuner's own adapter is untouched
        assert_eq!(
            tuner.adapter().parameter("number_of_nodes"),
            Some(ParameterValue::Int(2))
        );
    }

    #[test]
    fn batch_timeout_applies_to_each_candidate() {
        // each candidate fits the timeout, the whole sweep does not
        let adapter = NetworkSampler::new(Sleepy { ms: 0.0 }, peak_at(60.0)).unwrap();
        let pool = WorkerPool::new(
            WorkerPoolConfig::default()
                .with_workers(1)
                .with_batch_timeout(Duration::from_millis(150)),
        )
        .unwrap();
        let tuner = ParameterTuner::new(adapter, Graph::from_edges([(0, 1)]), None).with_pool(pool);
        let report = tuner
            .tune(&TuneConfig::new(
                "ms",
                ParameterSearch::candidates([50i64, 55, 60, 65, 70]),
            ))
            .unwrap();
        assert_eq!(report.best_value, Some(ParameterValue::Int(60)));
        assert_eq!(report.evaluations.len(), 5);
        let order: Vec<ParameterValue> = report.evaluations.iter().map(|e| e.value).collect();
        assert_eq!(
            order,
            [50i64, 55, 60, 65, 70].map(ParameterValue::Int).to_vec()
        );
    }

    #[test]
    fn bisection_finds_the_peak() {
        let tuner = probe_tuner(peak_at(5.0));
        let best = tuner
            .tune_single("x", ParameterSearch::bisection(0.0, 10.0), false, 2, 10, None)
            .unwrap()
            .unwrap();
        assert!((best.as_f64().unwrap() - 5.0).abs() <= 1.0);
    }

    #[test]
    fn integer_bisection_finds_the_peak() {
        let tuner = probe_tuner(peak_at(5.0));
        let config = TuneConfig::new("x", ParameterSearch::bisection(0.0, 10.0)).int_only(true);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.best_value, Some(ParameterValue::Int(5)));
        assert!(report.rounds <= 10);
        for evaluation in &report.evaluations {
            assert!(matches!(evaluation.value, ParameterValue::Int(_)));
        }
    }

    #[test]
    fn integer_bisection_never_leaves_the_requested_range() {
        // 0 would be an invalid sample size; 0.5 must round up to 1
        let adapter =
            NetworkSampler::new(RandomWalkSampler::new(2), scoring::node_count()).unwrap();
        let tuner = ParameterTuner::new(adapter, ring(12), Some(0));
        let config = TuneConfig::new("number_of_nodes", ParameterSearch::bisection(0.5, 4.0))
            .int_only(true)
            .with_iterations(3);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.best_value, Some(ParameterValue::Int(4)));
        for evaluation in &report.evaluations {
            let n = evaluation.value.as_f64().unwrap();
            assert!((1.0..=4.0).contains(&n), "evaluated {n}");
        }
    }

    #[test]
    fn early_stop_before_round_limit() {
        // round 1 hits the peak exactly; nothing later can beat it
        let tuner = probe_tuner(peak_at(5.0));
        let config = TuneConfig::new("x", ParameterSearch::bisection(0.0, 10.0))
            .int_only(true)
            .with_no_improve(2);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.stop_reason, Some(StopReason::NoImprovement));
        assert_eq!(report.rounds, 3);
        assert!(report.rounds < config.n_iter);
        assert_eq!(report.best_value, Some(ParameterValue::Int(5)));
    }

    #[test]
    fn collapsed_interval_converges() {
        // decreasing score: (1, 3) -> (1, 2) -> (1, 1)
        let tuner = probe_tuner(ScoringFn::new("decreasing", |graph, _| {
            let x: f64 = graph.name().and_then(|n| n.parse().ok()).unwrap_or(f64::NAN);
            Ok(Score::Scalar(-x))
        }));
        let config = TuneConfig::new("x", ParameterSearch::bisection(1.0, 3.0)).int_only(true);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.stop_reason, Some(StopReason::Converged));
        assert_eq!(report.rounds, 2);
        assert_eq!(report.best_value, Some(ParameterValue::Int(1)));
    }

    #[test]
    fn round_limit_is_respected() {
        let tuner = probe_tuner(peak_at(5.0));
        let config = TuneConfig::new("x", ParameterSearch::bisection(0.0, 10.0)).with_iterations(2);
        let report = tuner.tune(&config).unwrap();
        assert_eq!(report.stop_reason, Some(StopReason::MaxIterations));
        assert_eq!(report.rounds, 2);
        assert_eq!(report.evaluations.len(), 6);
    }

    #[test]
    fn negative_scores_can_win() {
        let tuner = probe_tuner(peak_at(100.0));
        let best = tuner
            .tune_single("x", ParameterSearch::candidates([1i64, 2]), false, 1, 10, None)
            .unwrap();
        assert_eq!(best, Some(ParameterValue::Int(2)));
    }

    #[test]
    fn invalid_arguments_are_rejected_before_dispatch() {
        let tuner = probe_tuner(peak_at(5.0));
        let bad = [
            TuneConfig::new("walk_length", ParameterSearch::candidates([1i64])),
            TuneConfig::new("x", ParameterSearch::Candidates(vec![])),
            TuneConfig::new("x", ParameterSearch::bisection(4.0, 1.0)),
            TuneConfig::new("x", ParameterSearch::bisection(0.0, f64::NAN)),
            TuneConfig::new("x", ParameterSearch::bisection(0.2, 0.8)).int_only(true),
            TuneConfig::new("x", ParameterSearch::candidates([1i64])).with_trials(0),
            TuneConfig::new("x", ParameterSearch::bisection(0.0, 1.0)).with_iterations(0),
            TuneConfig::new("x", ParameterSearch::bisection(0.0, 1.0)).with_no_improve(0),
        ];
        for config in &bad {
            let err = tuner.tune(config).unwrap_err();
            assert!(matches!(err, NsError::Config(_)), "{config:?} gave {err}");
        }
    }

    #[test]
    fn distribution_scores_are_rejected() {
        let adapter =
            NetworkSampler::new(RandomWalkSampler::new(3), scoring::degree_distribution())
                .unwrap();
        let tuner = ParameterTuner::new(adapter, ring(8), None);
        let err = tuner
            .tune(&TuneConfig::new("number_of_nodes", ParameterSearch::candidates([3i64])))
            .unwrap_err();
        assert!(matches!(err, NsError::Validation(_)));
    }

    #[test]
    fn trial_failure_aborts_the_session() {
        let failing = ScoringFn::new("failing", |_, _| {
            Err(NsError::Validation("metric undefined".into()))
        });
        let tuner = probe_tuner(failing);
        let err = tuner
            .tune(&TuneConfig::new("x", ParameterSearch::bisection(0.0, 4.0)))
            .unwrap_err();
        assert!(matches!(err, NsError::Trial(TrialError::Failed { .. })));
    }

    #[test]
    fn config_from_json_uses_defaults() {
        let config: TuneConfig = serde_json::from_str(
            r#"{"parameter": "k", "search": {"bisection": {"low": 1, "high": 20}}, "int_only": true}"#,
        )
        .unwrap();
        assert_eq!(config.n_trials, 1);
        assert_eq!(config.n_iter, 10);
        assert_eq!(config.n_no_improve, None);
        assert_eq!(config.aggregate, Aggregate::Mean);
        assert!(config.validate().is_ok());
    }
}
