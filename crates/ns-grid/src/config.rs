//! JSON configuration for comparison runs.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use ns_sampling::{SamplerSpec, ScorerSpec, WorkerPool, WorkerPoolConfig};
use ns_types::{Aggregate, Graph, NodeId, NsResult};

use crate::grid::ComparisonGrid;

/// An edge-list file to compare samplers on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSource {
    pub path: PathBuf,
    /// Table label; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
}

/// Configuration read by `ns-compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    pub graphs: Vec<GraphSource>,
    pub samplers: Vec<SamplerSpec>,
    #[serde(default)]
    pub sampler_names: Option<Vec<String>>,
    pub scorers: Vec<ScorerSpec>,
    #[serde(default)]
    pub scorer_names: Option<Vec<String>>,

    #[serde(default = "default_trials")]
    pub n_trials: usize,
    #[serde(default)]
    pub trials_per_graph: Option<Vec<usize>>,
    #[serde(default)]
    pub start_node: Option<NodeId>,
    #[serde(default)]
    pub aggregate: Aggregate,

    /// Worker threads; defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub batch_timeout_ms: Option<u64>,

    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub use_cache: bool,

    /// Directory relative graph and output paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_trials() -> usize {
    1
}

impl CompareConfig {
    /// Environment variable naming the config file when no argument is given.
    pub const ENV_VAR: &'static str = "NS_COMPARE_CONFIG";

    pub fn from_json(json: &str) -> NsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config file; relative paths inside it resolve against its
    /// directory.
    pub fn from_path(path: &Path) -> NsResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut config: Self = serde_json::from_reader(reader)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn load_graphs(&self) -> NsResult<Vec<Graph>> {
        self.graphs
            .iter()
            .map(|source| -> NsResult<Graph> {
                let path = self.resolve(&source.path);
                let mut graph = Graph::from_edge_list(BufReader::new(File::open(&path)?))?;
                let name = match &source.name {
                    Some(name) => name.clone(),
                    None => path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                };
                info!("Loaded {} from {}", name, path.display());
                graph.set_name(name);
                Ok(graph)
            })
            .collect()
    }

    pub fn worker_pool(&self) -> NsResult<WorkerPool> {
        let mut pool = WorkerPoolConfig::default();
        if let Some(workers) = self.workers {
            pool = pool.with_workers(workers);
        }
        if let Some(ms) = self.batch_timeout_ms {
            pool = pool.with_batch_timeout(Duration::from_millis(ms));
        }
        WorkerPool::new(pool)
    }

    /// Assemble the grid: graphs, catalog samplers and scorers, labels,
    /// trial counts and outputs.
    pub fn build_grid(&self) -> NsResult<ComparisonGrid> {
        let samplers = self.samplers.iter().map(SamplerSpec::build).collect();
        let scorers = self.scorers.iter().map(ScorerSpec::build).collect();

        let mut grid = ComparisonGrid::new(self.load_graphs()?, samplers, scorers)?
            .with_trials(self.n_trials)?
            .with_aggregate(self.aggregate)
            .with_pool(self.worker_pool()?)
            .with_cache(self.use_cache);
        if let Some(names) = &self.sampler_names {
            grid = grid.with_sampler_names(names.iter().cloned())?;
        }
        if let Some(names) = &self.scorer_names {
            grid = grid.with_scorer_names(names.iter().cloned())?;
        }
        if let Some(counts) = &self.trials_per_graph {
            grid = grid.with_trials_per_graph(counts.clone())?;
        }
        if let Some(node) = self.start_node {
            grid = grid.with_start_node(node);
        }
        if let Some(dir) = &self.output_dir {
            grid = grid.with_output_dir(self.resolve(dir));
        }
        Ok(grid)
    }
}
