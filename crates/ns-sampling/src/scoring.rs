//! Reference scoring metrics.
//!
//! Each constructor returns a [`ScoringFn`]: a callable plus its fixed
//! parameters, ready to hand to a [`crate::NetworkSampler`].

use ns_types::{required_f64, Graph, NsResult, Score, ScoreParams, ScoringFn};

pub fn density() -> ScoringFn {
    ScoringFn::new("density", |graph: &Graph, _: &ScoreParams| {
        Ok(Score::Scalar(graph.density()))
    })
}

pub fn average_degree() -> ScoringFn {
    ScoringFn::new("average_degree", |graph: &Graph, _: &ScoreParams| {
        Ok(Score::Scalar(graph.average_degree()))
    })
}

pub fn average_clustering() -> ScoringFn {
    ScoringFn::new("average_clustering", |graph: &Graph, _: &ScoreParams| {
        Ok(Score::Scalar(graph.average_clustering()))
    })
}

pub fn node_count() -> ScoringFn {
    ScoringFn::new("node_count", |graph: &Graph, _: &ScoreParams| {
        Ok(Score::Scalar(graph.node_count() as f64))
    })
}

pub fn edge_count() -> ScoringFn {
    ScoringFn::new("edge_count", |graph: &Graph, _: &ScoreParams| {
        Ok(Score::Scalar(graph.edge_count() as f64))
    })
}

/// Share of sampled nodes in the largest connected component.
pub fn largest_component_fraction() -> ScoringFn {
    ScoringFn::new(
        "largest_component_fraction",
        |graph: &Graph, _: &ScoreParams| {
            if graph.is_empty() {
                return Ok(Score::Scalar(0.0));
            }
            let largest = graph
                .connected_components()
                .iter()
                .map(|c| c.len())
                .max()
                .unwrap_or(0);
            Ok(Score::Scalar(largest as f64 / graph.node_count() as f64))
        },
    )
}

/// Degree histogram of the sample; accumulates element-wise across trials.
pub fn degree_distribution() -> ScoringFn {
    ScoringFn::new("degree_distribution", |graph: &Graph, _: &ScoreParams| {
        let histogram = graph
            .degree_histogram()
            .into_iter()
            .map(|count| count as f64)
            .collect();
        Ok(Score::Distribution(histogram))
    })
}

/// Negative distance between the sample density and `target`; peaks at zero.
pub fn density_gap(target: f64) -> ScoringFn {
    ScoringFn::new("density_gap", |graph: &Graph, params: &ScoreParams| {
        gap(graph.density(), params)
    })
    .with_param("target", target)
    .requires("target")
}

/// Negative distance between the sample's average degree and `target`.
pub fn degree_gap(target: f64) -> ScoringFn {
    ScoringFn::new("degree_gap", |graph: &Graph, params: &ScoreParams| {
        gap(graph.average_degree(), params)
    })
    .with_param("target", target)
    .requires("target")
}

fn gap(observed: f64, params: &ScoreParams) -> NsResult<Score> {
    let target = required_f64(params, "target")?;
    Ok(Score::Scalar(-(observed - target).abs()))
}
