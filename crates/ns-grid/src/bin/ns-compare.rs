use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ns_grid::CompareConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CompareConfig::ENV_VAR).map(PathBuf::from))
        .with_context(|| {
            format!(
                "usage: ns-compare <config.json> (or set {})",
                CompareConfig::ENV_VAR
            )
        })?;

    let config = CompareConfig::from_path(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let grid = config.build_grid().context("invalid comparison setup")?;
    let results = grid.sample_all_graphs().context("comparison failed")?;

    for (label, table) in &results {
        println!("== {label} ({} trials, {:?})", table.n_trials, table.aggregate);
        println!("sampler\t{}\tnodes\tedges", table.columns.join("\t"));
        for ((row, cells), summary) in table.rows.iter().zip(&table.cells).zip(&table.samples) {
            let cells: Vec<String> = cells.iter().map(|score| score.to_string()).collect();
            println!(
                "{row}\t{}\t{:.1}\t{:.1}",
                cells.join("\t"),
                summary.nodes,
                summary.edges
            );
        }
    }
    Ok(())
}
