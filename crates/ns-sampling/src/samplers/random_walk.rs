use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use ns_types::{
    config_error, Graph, NodeId, NsResult, ParameterRegistry, ParameterValue, SamplingMethod,
};

use super::{
    check_size, random_unvisited, resolve_start, rng_for, seed_value, MAX_STALL_STEPS,
};

/// Simple random walk; the sample is the subgraph induced by the visited nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkSampler {
    pub number_of_nodes: usize,
    pub seed: Option<u64>,
}

impl Default for RandomWalkSampler {
    fn default() -> Self {
        Self {
            number_of_nodes: 100,
            seed: None,
        }
    }
}

impl RandomWalkSampler {
    pub fn new(number_of_nodes: usize) -> Self {
        Self {
            number_of_nodes,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn registry() -> &'static ParameterRegistry<Self> {
        static REGISTRY: OnceLock<ParameterRegistry<RandomWalkSampler>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::<Self>::new()
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

impl SamplingMethod for RandomWalkSampler {
    fn name(&self) -> &str {
        "random_walk"
    }

    fn sample(&self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Graph> {
        check_size(graph, self.number_of_nodes)?;
        let mut rng = rng_for(self.seed);
        let mut current = resolve_start(graph, start_node, &mut rng)?;

        let mut visited = BTreeSet::from([current]);
        let mut stalled = 0usize;

        while visited.len() < self.number_of_nodes {
            let neighbors = graph.neighbors(current);
            if neighbors.is_empty() || stalled >= MAX_STALL_STEPS {
                // Dead end or a component smaller than the requested sample.
                match random_unvisited(graph, &visited, &mut rng) {
                    Some(node) => {
                        current = node;
                        visited.insert(node);
                        stalled = 0;
                        continue;
                    }
                    None => break,
                }
            }

            if let Some(&next) = neighbors.choose(&mut rng) {
                current = next;
                if visited.insert(next) {
                    stalled = 0;
                } else {
                    stalled += 1;
                }
            }
        }

        Ok(graph.induced_subgraph(&visited))
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
            "seed" => seed_value(self.seed),
            _ => None,
        }
    }

    fn validate(&self) -> NsResult<()> {
        if self.number_of_nodes == 0 {
            return Err(config_error!("random_walk: number_of_nodes must be at least 1"));
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SamplingMethod> {
        Box::new(self.clone())
    }
}
