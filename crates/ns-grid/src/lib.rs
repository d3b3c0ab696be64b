//! # ns-grid
//!
//! Side-by-side comparison of sampling algorithms.
//!
//! Provides:
//! - [`ComparisonGrid`]: every sampler against every scorer on every graph,
//!   with one shared sample per trial across all scorers
//! - [`ComparisonTable`]: per-graph results with JSON and CSV export
//! - [`CompareConfig`]: the JSON configuration read by `ns-compare`

pub mod config;
pub mod grid;
pub mod table;

pub use config::{CompareConfig, GraphSource};
pub use grid::{ComparisonGrid, ComparisonResults};
pub use table::{ComparisonTable, SampleSummary};
