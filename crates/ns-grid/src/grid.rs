//! Sampler x scorer x graph comparison runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use ns_sampling::{NetworkSampler, WorkerPool};
use ns_types::{
    config_error, internal_error, Aggregate, Graph, NodeId, NsResult, SamplingMethod, Score,
    ScoringMethod,
};

use crate::table::{json_path, ComparisonTable, SampleSummary};

/// Tables keyed by graph label.
pub type ComparisonResults = BTreeMap<String, ComparisonTable>;

/// Scores of one trial: one sample, scored by every scorer.
#[derive(Debug)]
struct GridTrial {
    nodes: usize,
    edges: usize,
    scores: Vec<Score>,
}

/// Compares every sampler against every scorer on every graph.
#[derive(Debug)]
pub struct ComparisonGrid {
    graphs: Vec<Arc<Graph>>,
    samplers: Vec<Arc<dyn SamplingMethod>>,
    scorers: Vec<Arc<dyn ScoringMethod>>,
    sampler_names: Vec<String>,
    scorer_names: Vec<String>,
    n_trials: usize,
    trials_per_graph: Option<Vec<usize>>,
    start_node: Option<NodeId>,
    aggregate: Aggregate,
    pool: Option<WorkerPool>,
    output_dir: Option<PathBuf>,
    use_cache: bool,
}

impl ComparisonGrid {
    /// Labels default to the sampler and scorer names.
    pub fn new(
        graphs: Vec<Graph>,
        samplers: Vec<Arc<dyn SamplingMethod>>,
        scorers: Vec<Arc<dyn ScoringMethod>>,
    ) -> NsResult<Self> {
        if graphs.is_empty() || samplers.is_empty() || scorers.is_empty() {
            return Err(config_error!(
                "a comparison needs at least one graph, sampler and scorer \
                 (got {} graphs, {} samplers, {} scorers)",
                graphs.len(),
                samplers.len(),
                scorers.len()
            ));
        }
        for sampler in &samplers {
            sampler
                .validate()
                .map_err(|e| config_error!("invalid sampler {}: {}", sampler.name(), e))?;
        }
        for scorer in &scorers {
            scorer
                .validate()
                .map_err(|e| config_error!("invalid scorer {}: {}", scorer.name(), e))?;
        }

        let sampler_names = samplers.iter().map(|s| s.name().to_string()).collect();
        let scorer_names = scorers.iter().map(|s| s.name().to_string()).collect();
        Ok(Self {
            graphs: graphs.into_iter().map(Arc::new).collect(),
            samplers,
            scorers,
            sampler_names,
            scorer_names,
            n_trials: 1,
            trials_per_graph: None,
            start_node: None,
            aggregate: Aggregate::Mean,
            pool: None,
            output_dir: None,
            use_cache: false,
        })
    }

    pub fn with_sampler_names<I, S>(mut self, names: I) -> NsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.samplers.len() {
            return Err(config_error!(
                "{} sampler names given for {} samplers",
                names.len(),
                self.samplers.len()
            ));
        }
        self.sampler_names = names;
        Ok(self)
    }

    pub fn with_scorer_names<I, S>(mut self, names: I) -> NsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.scorers.len() {
            return Err(config_error!(
                "{} scorer names given for {} scorers",
                names.len(),
                self.scorers.len()
            ));
        }
        self.scorer_names = names;
        Ok(self)
    }

    pub fn with_trials(mut self, n: usize) -> NsResult<Self> {
        if n == 0 {
            return Err(config_error!("n_trials must be at least 1"));
        }
        self.n_trials = n;
        Ok(self)
    }

    /// Trial counts per graph, in graph order.
    pub fn with_trials_per_graph(mut self, counts: Vec<usize>) -> NsResult<Self> {
        if counts.len() != self.graphs.len() {
            return Err(config_error!(
                "{} trial counts given for {} graphs",
                counts.len(),
                self.graphs.len()
            ));
        }
        if counts.contains(&0) {
            return Err(config_error!("every graph needs at least one trial"));
        }
        self.trials_per_graph = Some(counts);
        Ok(self)
    }

    pub fn with_start_node(mut self, node: NodeId) -> Self {
        self.start_node = Some(node);
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Export every table as JSON and CSV into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Reuse tables already exported to the output directory.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn sampler_names(&self) -> &[String] {
        &self.sampler_names
    }

    pub fn scorer_names(&self) -> &[String] {
        &self.scorer_names
    }

    /// Graph label: the graph's name, or its position in the input.
    pub fn graph_label(&self, index: usize) -> String {
        self.graphs
            .get(index)
            .and_then(|g| g.name().map(str::to_string))
            .unwrap_or_else(|| index.to_string())
    }

    /// Build the table for every graph.
    pub fn sample_all_graphs(&self) -> NsResult<ComparisonResults> {
        let owned;
        let pool = match &self.pool {
            Some(pool) => pool,
            None => {
                owned = WorkerPool::with_default_size()?;
                &owned
            }
        };

        info!(
            "Comparing {} samplers x {} scorers on {} graphs",
            self.samplers.len(),
            self.scorers.len(),
            self.graphs.len()
        );

        let mut results = ComparisonResults::new();
        for (index, graph) in self.graphs.iter().enumerate() {
            let mut label = self.graph_label(index);
            if results.contains_key(&label) {
                label = format!("{label}_{index}");
            }
            let n_trials = self
                .trials_per_graph
                .as_ref()
                .map_or(self.n_trials, |counts| counts[index]);
            let table = self.table_for(pool, graph, &label, n_trials)?;
            results.insert(label, table);
        }
        Ok(results)
    }

    /// Build the table for one graph.
    pub fn sample_by_graph(
        &self,
        graph: &Arc<Graph>,
        label: &str,
        n_trials: usize,
    ) -> NsResult<ComparisonTable> {
        match &self.pool {
            Some(pool) => self.table_for(pool, graph, label, n_trials),
            None => self.table_for(&WorkerPool::with_default_size()?, graph, label, n_trials),
        }
    }

    fn table_for(
        &self,
        pool: &WorkerPool,
        graph: &Arc<Graph>,
        label: &str,
        n_trials: usize,
    ) -> NsResult<ComparisonTable> {
        if n_trials == 0 {
            return Err(config_error!("n_trials must be at least 1"));
        }
        if let Some(table) = self.cached(label, n_trials) {
            info!("Loaded cached table for {}", label);
            return Ok(table);
        }

        info!("Sampling {} ({}) with {} trials", label, graph, n_trials);
        let mut table = ComparisonTable::new(
            label,
            self.scorer_names.clone(),
            n_trials,
            self.aggregate,
        );

        for (sampler, row_label) in self.samplers.iter().zip(&self.sampler_names) {
            let trials = self.run_row(pool, sampler, graph, n_trials)?;
            let (cells, summary) = self.reduce_row(&trials)?;
            debug!(
                "{} on {}: mean sample {:.1} nodes, {:.1} edges",
                row_label, label, summary.nodes, summary.edges
            );
            table.push_row(row_label.clone(), cells, summary)?;
        }

        if let Some(dir) = &self.output_dir {
            let (json, csv) = table.export(dir)?;
            info!("Wrote {} and {}", json.display(), csv.display());
        }
        Ok(table)
    }

    /// One pool batch of `n_trials`; each trial samples once and scores
    /// that sample with every scorer.
    fn run_row(
        &self,
        pool: &WorkerPool,
        sampler: &Arc<dyn SamplingMethod>,
        graph: &Arc<Graph>,
        n_trials: usize,
    ) -> NsResult<Vec<GridTrial>> {
        let base = NetworkSampler::from_parts(Arc::clone(sampler), Arc::clone(&self.scorers[0]))?;
        let start_node = self.start_node;

        let jobs: Vec<_> = (0..n_trials)
            .map(|_| {
                let mut adapter = base.clone();
                let scorers = self.scorers.clone();
                let graph = Arc::clone(graph);
                move || -> NsResult<GridTrial> {
                    let sample = adapter.sample(&graph, start_node)?;
                    let mut scores = Vec::with_capacity(scorers.len());
                    for scorer in scorers {
                        adapter.replace_scorer(scorer)?;
                        scores.push(adapter.score()?);
                    }
                    Ok(GridTrial {
                        nodes: sample.node_count(),
                        edges: sample.edge_count(),
                        scores,
                    })
                }
            })
            .collect();

        pool.run_batch(jobs)
    }

    fn reduce_row(&self, trials: &[GridTrial]) -> NsResult<(Vec<Score>, SampleSummary)> {
        if trials.is_empty() {
            return Err(internal_error!("no trials to aggregate"));
        }
        let mut cells = Vec::with_capacity(self.scorers.len());
        for column in 0..self.scorers.len() {
            let column_scores: Vec<Score> = trials
                .iter()
                .map(|trial| trial.scores[column].clone())
                .collect();
            cells.push(self.aggregate.reduce(&column_scores)?);
        }

        let count = trials.len() as f64;
        let summary = SampleSummary {
            nodes: trials.iter().map(|t| t.nodes as f64).sum::<f64>() / count,
            edges: trials.iter().map(|t| t.edges as f64).sum::<f64>() / count,
        };
        Ok((cells, summary))
    }

    fn cached(&self, label: &str, n_trials: usize) -> Option<ComparisonTable> {
        if !self.use_cache {
            return None;
        }
        let path = json_path(self.output_dir.as_ref()?, label);
        if !path.exists() {
            return None;
        }
        match ComparisonTable::read_json(&path) {
            Ok(table)
                if table.rows == self.sampler_names
                    && table.columns == self.scorer_names
                    && table.n_trials == n_trials
                    && table.aggregate == self.aggregate =>
            {
                Some(table)
            }
            Ok(_) => {
                warn!(
                    "Cached table {} was built with different settings; recomputing",
                    path.display()
                );
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable cached table {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_sampling::{scoring, RandomWalkSampler, SnowBallSampler, WorkerPoolConfig};
    use ns_types::{NsError, ScoringFn, TrialError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn ring(n: u64, name: &str) -> Graph {
        Graph::from_edges((0..n).map(|i| (i, (i + 1) % n))).with_name(name)
    }

    fn samplers() -> Vec<Arc<dyn SamplingMethod>> {
        vec![
            Arc::new(RandomWalkSampler::new(4).with_seed(1)),
            Arc::new(SnowBallSampler::new(5, 2).with_seed(2)),
        ]
    }

    fn scorers() -> Vec<Arc<dyn ScoringMethod>> {
        vec![Arc::new(scoring::node_count()), Arc::new(scoring::edge_count())]
    }

    fn pool() -> WorkerPool {
        WorkerPool::new(WorkerPoolConfig::default().with_workers(2)).unwrap()
    }

    #[test]
    fn mismatched_sampler_names_are_rejected() {
        let grid = ComparisonGrid::new(vec![ring(10, "ring")], samplers(), scorers()).unwrap();
        let err = grid.with_sampler_names(["only one"]).unwrap_err();
        assert!(matches!(err, NsError::Config(_)));

        let grid = ComparisonGrid::new(vec![ring(10, "ring")], samplers(), scorers()).unwrap();
        assert!(matches!(
            grid.with_scorer_names(["a", "b", "c"]).unwrap_err(),
            NsError::Config(_)
        ));

        let grid = ComparisonGrid::new(vec![ring(10, "ring")], samplers(), scorers()).unwrap();
        assert!(matches!(
            grid.with_trials_per_graph(vec![1, 2]).unwrap_err(),
            NsError::Config(_)
        ));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(ComparisonGrid::new(vec![], samplers(), scorers()).is_err());
        assert!(ComparisonGrid::new(vec![ring(5, "r")], vec![], scorers()).is_err());
        let broken: Vec<Arc<dyn SamplingMethod>> = vec![Arc::new(RandomWalkSampler::new(0))];
        assert!(matches!(
            ComparisonGrid::new(vec![ring(5, "r")], broken, scorers()).unwrap_err(),
            NsError::Config(_)
        ));
    }

    #[test]
    fn one_table_per_graph() {
        let grid = ComparisonGrid::new(
            vec![ring(12, "small"), Graph::from_edges((0..20).map(|i| (i, (i + 1) % 20)))],
            samplers(),
            scorers(),
        )
        .unwrap()
        .with_scorer_names(["nodes", "edges"])
        .unwrap()
        .with_trials(3)
        .unwrap()
        .with_pool(pool());

        let results = grid.sample_all_graphs().unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["1", "small"]);

        let small = &results["small"];
        assert_eq!(small.rows, vec!["random_walk", "snowball"]);
        assert_eq!(small.columns, vec!["nodes", "edges"]);
        assert_eq!(small.get("random_walk", "nodes"), Some(&Score::Scalar(4.0)));
        assert_eq!(small.get("snowball", "nodes"), Some(&Score::Scalar(5.0)));
        // connected arcs of a ring: one edge fewer than nodes
        assert_eq!(small.get("random_walk", "edges"), Some(&Score::Scalar(3.0)));
        assert_eq!(small.summary("snowball").unwrap().nodes, 5.0);
        assert_eq!(small.n_trials, 3);
    }

    #[test]
    fn sample_is_shared_across_scorers() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug, Clone)]
        struct CountingSampler;

        impl SamplingMethod for CountingSampler {
            fn name(&self) -> &str {
                "counting"
            }
            fn sample(&self, graph: &Graph, _start: Option<NodeId>) -> NsResult<Graph> {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(graph.clone())
            }
            fn parameter_names(&self) -> Vec<&'static str> {
                Vec::new()
            }
            fn set_parameter(
                &mut self,
                name: &str,
                _value: &ns_types::ParameterValue,
            ) -> NsResult<()> {
                Err(config_error!("no parameter {name}"))
            }
            fn parameter(&self, _name: &str) -> Option<ns_types::ParameterValue> {
                None
            }
            fn clone_box(&self) -> Box<dyn SamplingMethod> {
                Box::new(self.clone())
            }
        }

        let counting: Vec<Arc<dyn SamplingMethod>> = vec![Arc::new(CountingSampler)];
        let grid = ComparisonGrid::new(vec![ring(6, "ring")], counting, scorers())
            .unwrap()
            .with_trials(4)
            .unwrap()
            .with_pool(pool());
        let results = grid.sample_all_graphs().unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 4);
        assert_eq!(results["ring"].get("counting", "edge_count"), Some(&Score::Scalar(6.0)));
    }

    #[test]
    fn per_graph_trial_counts() {
        let grid = ComparisonGrid::new(
            vec![ring(8, "a"), ring(9, "b")],
            samplers(),
            scorers(),
        )
        .unwrap()
        .with_trials_per_graph(vec![1, 2])
        .unwrap()
        .with_pool(pool());
        let results = grid.sample_all_graphs().unwrap();
        assert_eq!(results["a"].n_trials, 1);
        assert_eq!(results["b"].n_trials, 2);
    }

    #[test]
    fn scorer_failure_aborts_the_comparison() {
        let failing: Vec<Arc<dyn ScoringMethod>> = vec![Arc::new(ScoringFn::new("failing", |_, _| {
            Err(NsError::Validation("undefined".into()))
        }))];
        let grid = ComparisonGrid::new(vec![ring(8, "a")], samplers(), failing)
            .unwrap()
            .with_pool(pool());
        let err = grid.sample_all_graphs().unwrap_err();
        assert!(matches!(err, NsError::Trial(TrialError::Failed { .. })));
    }

    #[test]
    fn exported_tables_are_reused_from_cache() {
        let dir = TempDir::new().unwrap();
        let grid = ComparisonGrid::new(vec![ring(10, "cached ring")], samplers(), scorers())
            .unwrap()
            .with_output_dir(dir.path())
            .with_pool(pool());
        let first = grid.sample_all_graphs().unwrap();
        assert!(dir.path().join("cached_ring.json").exists());
        assert!(dir.path().join("cached_ring.csv").exists());

        let grid = grid.with_cache(true);
        let second = grid.sample_all_graphs().unwrap();
        assert_eq!(
            second["cached ring"].generated_at,
            first["cached ring"].generated_at
        );
    }

    #[test]
    fn cache_with_other_trial_settings_is_recomputed() {
        let dir = TempDir::new().unwrap();
        let grid = ComparisonGrid::new(vec![ring(10, "r")], samplers(), scorers())
            .unwrap()
            .with_output_dir(dir.path())
            .with_pool(pool());
        grid.sample_all_graphs().unwrap();

        let grid = grid.with_cache(true).with_trials(3).unwrap();
        let more_trials = grid.sample_all_graphs().unwrap();
        assert_eq!(more_trials["r"].n_trials, 3);

        let grid = grid.with_aggregate(Aggregate::Max);
        let other_aggregate = grid.sample_all_graphs().unwrap();
        assert_eq!(other_aggregate["r"].aggregate, Aggregate::Max);
        assert_eq!(other_aggregate["r"].n_trials, 3);
    }

    #[test]
    fn unreadable_cache_is_recomputed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("r.json"), "not json").unwrap();
        let grid = ComparisonGrid::new(vec![ring(6, "r")], samplers(), scorers())
            .unwrap()
            .with_output_dir(dir.path())
            .with_cache(true)
            .with_pool(pool());
        let results = grid.sample_all_graphs().unwrap();
        assert_eq!(results["r"].rows.len(), 2);
    }
}
