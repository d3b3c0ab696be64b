//! # ns-sampling
//!
//! Sampling algorithms, scoring metrics and the machinery that pairs them.
//!
//! Provides:
//! - Reference samplers (random walk, snowball, frontier, community expansion)
//! - Reference scoring metrics over sampled graphs
//! - [`NetworkSampler`], the adapter pairing one sampler with one scorer
//! - The trial evaluator and a fixed-size worker pool for parallel trials

pub mod adapter;
pub mod catalog;
pub mod evaluator;
pub mod pool;
pub mod samplers;
pub mod scoring;

pub use adapter::NetworkSampler;
pub use catalog::{SamplerSpec, ScorerSpec};
pub use evaluator::{rescore, run_trial_batches, run_trials, TrialBatch, TrialTask};
pub use pool::{WorkerPool, WorkerPoolConfig};
pub use samplers::{
    CommunityStructureExpansionSampler, FrontierSampler, RandomWalkSampler, SnowBallSampler,
};
