//! Reference exploration samplers.
//!
//! Every sampler returns a graph whose node ids are a subset of the input
//! graph's ids. Randomness is drawn from a fresh RNG per call, seeded from the
//! sampler's `seed` when set.

mod community;
mod frontier;
mod random_walk;
mod snowball;

pub use community::CommunityStructureExpansionSampler;
pub use frontier::FrontierSampler;
pub use random_walk::RandomWalkSampler;
pub use snowball::SnowBallSampler;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;

use ns_types::{validation_error, Graph, NodeId, NsResult, ParameterValue};

/// Steps without discovering a new node before a walker teleports.
pub(crate) const MAX_STALL_STEPS: usize = 1_000;

pub(crate) fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Fail when the graph cannot supply `requested` nodes.
pub(crate) fn check_size(graph: &Graph, requested: usize) -> NsResult<()> {
    if graph.node_count() < requested {
        return Err(validation_error!(
            "requested {} nodes but the graph only has {}",
            requested,
            graph.node_count()
        ));
    }
    Ok(())
}

/// The given start node, or a uniformly random node of `graph`.
pub(crate) fn resolve_start(
    graph: &Graph,
    start_node: Option<NodeId>,
    rng: &mut StdRng,
) -> NsResult<NodeId> {
    match start_node {
        Some(node) if graph.contains_node(node) => Ok(node),
        Some(node) => Err(validation_error!("start node {node} is not in the graph")),
        None => graph
            .nodes()
            .choose(rng)
            .copied()
            .ok_or_else(|| validation_error!("cannot sample from an empty graph")),
    }
}

/// A uniformly random node not yet in `taken`.
pub(crate) fn random_unvisited(
    graph: &Graph,
    taken: &BTreeSet<NodeId>,
    rng: &mut StdRng,
) -> Option<NodeId> {
    let candidates: Vec<NodeId> = graph
        .nodes()
        .into_iter()
        .filter(|n| !taken.contains(n))
        .collect();
    candidates.choose(rng).copied()
}

pub(crate) fn seed_value(seed: Option<u64>) -> Option<ParameterValue> {
    seed.map(|s| ParameterValue::Int(s as i64))
}
