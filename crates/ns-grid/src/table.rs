//! Per-graph comparison tables and their on-disk formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ns_types::{Aggregate, NsError, NsResult, Score};

/// Average size of the samples drawn for one table row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleSummary {
    pub nodes: f64,
    pub edges: f64,
}

/// Aggregated scores for one graph: rows are samplers, columns are scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub graph: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<Score>>,
    /// One entry per row.
    pub samples: Vec<SampleSummary>,
    pub n_trials: usize,
    pub aggregate: Aggregate,
    pub generated_at: DateTime<Utc>,
}

impl ComparisonTable {
    pub fn new(
        graph: impl Into<String>,
        columns: Vec<String>,
        n_trials: usize,
        aggregate: Aggregate,
    ) -> Self {
        Self {
            graph: graph.into(),
            rows: Vec::new(),
            columns,
            cells: Vec::new(),
            samples: Vec::new(),
            n_trials,
            aggregate,
            generated_at: Utc::now(),
        }
    }

    /// Append one sampler's row. The row must have one score per column.
    pub fn push_row(
        &mut self,
        label: impl Into<String>,
        scores: Vec<Score>,
        summary: SampleSummary,
    ) -> NsResult<()> {
        let label = label.into();
        if scores.len() != self.columns.len() {
            return Err(NsError::Internal(format!(
                "row '{}' has {} scores for {} columns",
                label,
                scores.len(),
                self.columns.len()
            )));
        }
        self.rows.push(label);
        self.cells.push(scores);
        self.samples.push(summary);
        Ok(())
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Score> {
        self.cells.get(row)?.get(column)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<&Score> {
        let r = self.rows.iter().position(|label| label == row)?;
        let c = self.columns.iter().position(|label| label == column)?;
        self.cell(r, c)
    }

    pub fn summary(&self, row: &str) -> Option<&SampleSummary> {
        let r = self.rows.iter().position(|label| label == row)?;
        self.samples.get(r)
    }

    /// Write the table as CSV: one line per sampler, distribution cells as
    /// `[a;b;c]`.
    pub fn write_csv<W: Write>(&self, writer: W) -> NsResult<()> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 3);
        header.push("sampler".to_string());
        header.extend(self.columns.iter().cloned());
        header.push("sample_nodes".to_string());
        header.push("sample_edges".to_string());
        csv.write_record(&header).map_err(csv_error)?;

        for ((label, scores), summary) in self.rows.iter().zip(&self.cells).zip(&self.samples) {
            let mut record = Vec::with_capacity(header.len());
            record.push(label.clone());
            record.extend(scores.iter().map(|score| score.to_string()));
            record.push(summary.nodes.to_string());
            record.push(summary.edges.to_string());
            csv.write_record(&record).map_err(csv_error)?;
        }

        csv.flush()?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> NsResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> NsResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write `<stem>.json` and `<stem>.csv` into `dir`, creating it if needed.
    pub fn export(&self, dir: &Path) -> NsResult<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir)?;
        let json_path = json_path(dir, &self.graph);
        let csv_path = dir.join(format!("{}.csv", file_stem(&self.graph)));

        self.write_json(&json_path)?;
        self.write_csv(BufWriter::new(File::create(&csv_path)?))?;
        Ok((json_path, csv_path))
    }
}

/// Location of the cached JSON table for a graph label.
pub fn json_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{}.json", file_stem(label)))
}

/// File-system safe version of a label.
pub fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "graph".to_string()
    } else {
        stem
    }
}

fn csv_error(err: csv::Error) -> NsError {
    NsError::Csv(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> ComparisonTable {
        let mut table = ComparisonTable::new(
            "karate club",
            vec!["density".into(), "degrees".into()],
            3,
            Aggregate::Mean,
        );
        table
            .push_row(
                "random_walk",
                vec![Score::Scalar(0.5), Score::Distribution(vec![0.0, 2.0, 1.0])],
                SampleSummary {
                    nodes: 3.0,
                    edges: 2.0,
                },
            )
            .unwrap();
        table
    }

    #[test]
    fn lookup_by_label() {
        let table = table();
        assert_eq!(table.get("random_walk", "density"), Some(&Score::Scalar(0.5)));
        assert_eq!(table.get("snowball", "density"), None);
        assert_eq!(table.summary("random_walk").unwrap().edges, 2.0);
    }

    #[test]
    fn row_width_must_match_columns() {
        let mut table = table();
        let err = table
            .push_row("frontier", vec![Score::Scalar(1.0)], SampleSummary::default())
            .unwrap_err();
        assert!(matches!(err, NsError::Internal(_)));
    }

    #[test]
    fn csv_layout() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sampler,density,degrees,sample_nodes,sample_edges");
        assert_eq!(lines[1], "random_walk,0.5,[0;2;1],3,2");
    }

    #[test]
    fn export_writes_both_formats() {
        let dir = TempDir::new().unwrap();
        let (json, csv) = table().export(dir.path()).unwrap();
        assert_eq!(json.file_name().unwrap(), "karate_club.json");
        assert!(csv.exists());

        let original = table();
        let loaded = ComparisonTable::read_json(&json).unwrap();
        assert_eq!(loaded.rows, original.rows);
        assert_eq!(loaded.cells, original.cells);
        assert_eq!(loaded.samples, original.samples);
    }

    #[test]
    fn stems_are_filesystem_safe() {
        assert_eq!(file_stem("a/b c"), "a_b_c");
        assert_eq!(file_stem(".."), "graph");
        assert_eq!(file_stem("web-Google.v2"), "web-Google.v2");
    }
}
