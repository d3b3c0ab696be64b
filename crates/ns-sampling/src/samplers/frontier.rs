use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use ns_types::{
    config_error, validation_error, Graph, NodeId, NsResult, ParameterRegistry, ParameterValue,
    SamplingMethod,
};

use super::{check_size, random_unvisited, rng_for, seed_value, MAX_STALL_STEPS};

/// Frontier sampling: `number_of_seeds` dependent walkers, where the walker to
/// advance is chosen with probability proportional to its degree. The sample
/// holds the traversed edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierSampler {
    pub number_of_seeds: usize,
    pub number_of_nodes: usize,
    pub seed: Option<u64>,
}

impl Default for FrontierSampler {
    fn default() -> Self {
        Self {
            number_of_seeds: 10,
            number_of_nodes: 100,
            seed: None,
        }
    }
}

impl FrontierSampler {
    pub fn new(number_of_seeds: usize, number_of_nodes: usize) -> Self {
        Self {
            number_of_seeds,
            number_of_nodes,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn registry() -> &'static ParameterRegistry<Self> {
        static REGISTRY: OnceLock<ParameterRegistry<FrontierSampler>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::<Self>::new()
                .register("number_of_seeds", |s, v| {
                    s.number_of_seeds = v.as_usize()?;
                    Ok(())
                })
                .register("number_of_nodes", |s, v| {
                    s.number_of_nodes = v.as_usize()?;
                    Ok(())
                })
                .register("seed", |s, v| {
                    s.seed = Some(v.as_u64()?);
                    Ok(())
                })
        })
    }
}

impl SamplingMethod for FrontierSampler {
    fn name(&self) -> &str {
        "frontier"
    }

    fn sample(&self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Graph> {
        check_size(graph, self.number_of_nodes)?;
        check_size(graph, self.number_of_seeds)?;
        let mut rng = rng_for(self.seed);
        let all_nodes = graph.nodes();

        let mut seeds: Vec<NodeId> = Vec::with_capacity(self.number_of_seeds);
        if let Some(start) = start_node {
            if !graph.contains_node(start) {
                return Err(validation_error!("start node {start} is not in the graph"));
            }
            seeds.push(start);
        }
        let remaining: Vec<NodeId> = all_nodes
            .iter()
            .copied()
            .filter(|n| Some(*n) != start_node)
            .collect();
        seeds.extend(
            remaining
                .choose_multiple(&mut rng, self.number_of_seeds.saturating_sub(seeds.len()))
                .copied(),
        );
        if seeds.is_empty() {
            return Err(validation_error!("frontier sampler needs at least one seed"));
        }

        let mut nodes: BTreeSet<NodeId> = BTreeSet::new();
        let mut edges: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
        let mut stalled = 0usize;

        while nodes.len() < self.number_of_nodes {
            if stalled >= MAX_STALL_STEPS {
                // Walkers are confined to components that are already sampled.
                let jump = random_unvisited(graph, &nodes, &mut rng).ok_or_else(|| {
                    validation_error!(
                        "frontier sampler ran out of nodes at {} of {}",
                        nodes.len(),
                        self.number_of_nodes
                    )
                })?;
                let slot = rng.gen_range(0..seeds.len());
                seeds[slot] = jump;
                nodes.insert(jump);
                stalled = 0;
                continue;
            }

            let weights: Vec<usize> = seeds.iter().map(|s| graph.degree(*s)).collect();
            let slot = match WeightedIndex::new(&weights) {
                Ok(dist) => dist.sample(&mut rng),
                // every walker sits on an isolated node
                Err(_) => {
                    let slot = rng.gen_range(0..seeds.len());
                    let fresh = nodes.insert(seeds[slot]);
                    stalled = if fresh { 0 } else { stalled + 1 };
                    if let Some(&jump) = all_nodes.choose(&mut rng) {
                        seeds[slot] = jump;
                    }
                    continue;
                }
            };

            let source = seeds[slot];
            let neighbors = graph.neighbors(source);
            if let Some(&target) = neighbors.choose(&mut rng) {
                edges.insert(if source < target {
                    (source, target)
                } else {
                    (target, source)
                });
                let fresh_source = nodes.insert(source);
                let fresh_target = nodes.insert(target);
                stalled = if fresh_source || fresh_target {
                    0
                } else {
                    stalled + 1
                };
                seeds[slot] = target;
            }
        }

        let mut sample = Graph::new();
        for node in &nodes {
            sample.add_node(*node);
        }
        for (u, v) in edges {
            sample.add_edge(u, v);
        }
        Ok(sample)
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        Self::registry().names()
    }

    fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()> {
        Self::registry().apply(self, name, value)
    }

    fn parameter(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "number_of_seeds" => Some(ParameterValue::from(self.number_of_seeds)),
            "number_of_nodes" => Some(ParameterValue::from(self.number_of_nodes)),
            "seed" => seed_value(self.seed),
            _ => None,
        }
    }

    fn validate(&self) -> NsResult<()> {
        if self.number_of_seeds == 0 {
            return Err(config_error!("frontier: number_of_seeds must be at least 1"));
        }
        if self.number_of_nodes == 0 {
            return Err(config_error!("frontier: number_of_nodes must be at least 1"));
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SamplingMethod> {
        Box::new(self.clone())
    }
}
