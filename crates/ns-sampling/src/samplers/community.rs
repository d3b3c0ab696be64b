use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use ns_types::{
    config_error, Graph, NodeId, NsResult, ParameterRegistry, ParameterValue, SamplingMethod,
};

use super::{check_size, random_unvisited, resolve_start, rng_for, seed_value};

/// Community structure expansion: repeatedly adds the frontier node that
/// reaches the most nodes outside the current sample and its neighbourhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityStructureExpansionSampler {
    pub number_of_nodes: usize,
    pub seed: Option<u64>,
}

impl Default for CommunityStructureExpansionSampler {
    fn default() -> Self {
        Self {
            number_of_nodes: 100,
            seed: None,
        }
    }
}

impl CommunityStructureExpansionSampler {
    pub fn new(number_of_nodes: usize) -> Self {
        Self {
            number_of_nodes,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn registry() -> &'static ParameterRegistry<Self> {
        static REGISTRY: OnceLock<ParameterRegistry<CommunityStructureExpansionSampler>> =
            OnceLock::new();
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

impl SamplingMethod for CommunityStructureExpansionSampler {
    fn name(&self) -> &str {
        "community_structure_expansion"
    }

    fn sample(&self, graph: &Graph, start_node: Option<NodeId>) -> NsResult<Graph> {
        check_size(graph, self.number_of_nodes)?;
        let mut rng = rng_for(self.seed);
        let start = resolve_start(graph, start_node, &mut rng)?;

        let mut sampled = BTreeSet::from([start]);
        // sampled nodes plus everything adjacent to them
        let mut reached: BTreeSet<NodeId> = graph.neighbors(start).into_iter().collect();
        reached.insert(start);

        while sampled.len() < self.number_of_nodes {
            let frontier: Vec<NodeId> = reached
                .iter()
                .copied()
                .filter(|n| !sampled.contains(n))
                .collect();

            let next = if frontier.is_empty() {
                match random_unvisited(graph, &sampled, &mut rng) {
                    Some(node) => node,
                    None => break,
                }
            } else {
                let mut best_gain = 0usize;
                let mut best: Vec<NodeId> = Vec::new();
                for &candidate in &frontier {
                    let gain = graph
                        .neighbors(candidate)
                        .iter()
                        .filter(|n| !reached.contains(n))
                        .count();
                    if best.is_empty() || gain > best_gain {
                        best_gain = gain;
                        best.clear();
                        best.push(candidate);
                    } else if gain == best_gain {
                        best.push(candidate);
                    }
                }
                match best.choose(&mut rng) {
                    Some(&node) => node,
                    None => break,
                }
            };

            sampled.insert(next);
            reached.insert(next);
            reached.extend(graph.neighbors(next));
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
            "seed" => seed_value(self.seed),
            _ => None,
        }
    }

    fn validate(&self) -> NsResult<()> {
        if self.number_of_nodes == 0 {
            return Err(config_error!(
                "community_structure_expansion: number_of_nodes must be at least 1"
            ));
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SamplingMethod> {
        Box::new(self.clone())
    }
}
