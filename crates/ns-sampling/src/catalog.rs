//! Serializable descriptions of the reference samplers and scorers, used by
//! configuration files.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ns_types::{SamplingMethod, ScoringFn, ScoringMethod};

use crate::samplers::{
    CommunityStructureExpansionSampler, FrontierSampler, RandomWalkSampler, SnowBallSampler,
};
use crate::scoring;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerSpec {
    RandomWalk(RandomWalkSampler),
    #[serde(rename = "snowball")]
    SnowBall(SnowBallSampler),
    Frontier(FrontierSampler),
    CommunityStructureExpansion(CommunityStructureExpansionSampler),
}

impl SamplerSpec {
    pub fn build(&self) -> Arc<dyn SamplingMethod> {
        match self {
            Self::RandomWalk(s) => Arc::new(s.clone()),
            Self::SnowBall(s) => Arc::new(s.clone()),
            Self::Frontier(s) => Arc::new(s.clone()),
            Self::CommunityStructureExpansion(s) => Arc::new(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorerSpec {
    Density,
    AverageDegree,
    AverageClustering,
    NodeCount,
    EdgeCount,
    LargestComponentFraction,
    DegreeDistribution,
    DensityGap { target: f64 },
    DegreeGap { target: f64 },
}

impl ScorerSpec {
    pub fn scoring_fn(&self) -> ScoringFn {
        match self {
            Self::Density => scoring::density(),
            Self::AverageDegree => scoring::average_degree(),
            Self::AverageClustering => scoring::average_clustering(),
            Self::NodeCount => scoring::node_count(),
            Self::EdgeCount => scoring::edge_count(),
            Self::LargestComponentFraction => scoring::largest_component_fraction(),
            Self::DegreeDistribution => scoring::degree_distribution(),
            Self::DensityGap { target } => scoring::density_gap(*target),
            Self::DegreeGap { target } => scoring::degree_gap(*target),
        }
    }

    pub fn build(&self) -> Arc<dyn ScoringMethod> {
        Arc::new(self.scoring_fn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_specs_from_json() {
        let specs: Vec<SamplerSpec> = serde_json::from_str(
            r#"[
                {"kind": "random_walk", "number_of_nodes": 20, "seed": 7},
                {"kind": "snowball", "number_of_nodes": 30, "k": 5, "seed": null},
                {"kind": "frontier", "number_of_seeds": 4, "number_of_nodes": 25, "seed": null},
                {"kind": "community_structure_expansion", "number_of_nodes": 10, "seed": 1}
            ]"#,
        )
        .unwrap();

        let names: Vec<String> = specs.iter().map(|s| s.build().name().to_string()).collect();
        assert_eq!(
            names,
            vec!["random_walk", "snowball", "frontier", "community_structure_expansion"]
        );
        assert_eq!(
            specs[0],
            SamplerSpec::RandomWalk(RandomWalkSampler::new(20).with_seed(7))
        );
    }

    #[test]
    fn scorer_specs_from_json() {
        let specs: Vec<ScorerSpec> = serde_json::from_str(
            r#"[{"kind": "density"}, {"kind": "degree_gap", "target": 3.5}]"#,
        )
        .unwrap();
        assert_eq!(specs[1], ScorerSpec::DegreeGap { target: 3.5 });
        let gap = specs[1].build();
        assert_eq!(gap.name(), "degree_gap");
        assert!(gap.validate().is_ok());
    }
}
