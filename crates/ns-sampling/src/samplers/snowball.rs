use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::OnceLock;

use ns_types::{
    config_error, Graph, NodeId, NsResult, ParameterRegistry, ParameterValue, SamplingMethod,
};

use super::{check_size, random_unvisited, resolve_start, rng_for, seed_value};

/// Breadth-first snowball sampling: each expanded node recruits at most `k`
/// random unvisited neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowBallSampler {
    pub number_of_nodes: usize,
    pub k: usize,
    pub seed: Option<u64>,
}

impl Default for SnowBallSampler {
    fn default() -> Self {
        Self {
            number_of_nodes: 100,
            k: 50,
            seed: None,
        }
    }
}

impl SnowBallSampler {
    pub fn new(number_of_nodes: usize, k: usize) -> Self {
        Self {
            number_of_nodes,
            k,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn registry() -> &'static ParameterRegistry<Self> {
        static REGISTRY: OnceLock<ParameterRegistry<SnowBallSampler>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::<Self>::new()
                .register("number_of_nodes", |s, v| {
                    s.number_of_nodes = v.as_usize()?;
                    Ok(())
                })
                .register("k", |s, v| {
                    s.k = v.as_usize()?;
                    Ok(())
                })
                .register("seed", |s, v| {
                    s.seed = Some(v.as_u64()?);
                    Ok(())
                })
        })
    }
}

impl SamplingMethod for SnowBallSampler {
    fn name(&self) -> &str {
        "snowball"
    }

    fn sample(&self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Graph> {
        check_size(graph, self.number_of_nodes)?;
        let mut rng = rng_for(self.seed);
        let start = resolve_start(graph, start_node, &mut rng)?;

        let mut sampled = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);

        'outer: while sampled.len() < self.number_of_nodes {
            let source = match queue.pop_front() {
                Some(node) => node,
                None => match random_unvisited(graph, &sampled, &mut rng) {
                    Some(node) => {
                        sampled.insert(node);
                        queue.push_back(node);
                        continue;
                    }
                    None => break,
                },
            };

            let mut fresh: Vec<NodeId> = graph
                .neighbors(source)
                .into_iter()
                .filter(|n| !sampled.contains(n))
                .collect();
            fresh.shuffle(&mut rng);

            for neighbor in fresh.into_iter().take(self.k) {
                sampled.insert(neighbor);
                queue.push_back(neighbor);
                if sampled.len() >= self.number_of_nodes {
                    break 'outer;
                }
            }
        }

        Ok(graph.induced_subgraph(&sampled))
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        Self::registry().names()
    }

    fn set_parameter(&mut self, name: &str, value: &ParameterValue) -> NsResult<()> {
        Self::registry().apply(self, name, value)
    }

    fn parameter(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "number_of_nodes" => Some(ParameterValue::from(self.number_of_nodes)),
            "k" => Some(ParameterValue::from(self.k)),
            "seed" => seed_value(self.seed),
            _ => None,
        }
    }

    fn validate(&self) -> NsResult<()> {
        if self.number_of_nodes == 0 {
            return Err(config_error!("snowball: number_of_nodes must be at least 1"));
        }
        if self.k == 0 {
            return Err(config_error!("snowball: k must be at least 1"));
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SamplingMethod> {
        Box::new(self.clone())
    }
}
