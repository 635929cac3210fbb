//! Reading the benchmarking tool's markdown export.
//!
//! The export is one table with a row per command:
//!
//! ```text
//! | Command | Mean [ms] | Min [ms] | Max [ms] | Relative |
//! |:---|---:|---:|---:|---:|
//! | `O0` | 12.3 ± 0.4 | 11.9 | 13.5 | 2.12 ± 0.10 |
//! ```

use crate::errors::ReportError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*(?:±\s*([0-9]+(?:\.[0-9]+)?))?\s*$")
        .unwrap_or_else(|e| unreachable!("measurement pattern: {e}"))
});

const COLUMNS: usize = 5;

static UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Mean\s*\[([^\]]+)\]").unwrap_or_else(|e| unreachable!("unit pattern: {e}"))
});

/// One measured variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    /// Command name, which is the variant label.
    pub label: String,
    /// Mean wall time.
    pub mean: f64,
    /// Standard deviation of the mean, when reported.
    pub stddev: Option<f64>,
    /// Fastest run.
    pub min: f64,
    /// Slowest run.
    pub max: f64,
    /// Mean relative to the fastest variant.
    pub relative: f64,
}

/// A parsed timing report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Where the report was read from.
    pub path: PathBuf,
    /// Time unit of the measurements, e.g. `ms`.
    pub unit: String,
    /// Rows in file order.
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkReport {
    /// Reads and parses a report file.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the file cannot be read, otherwise any parse error.
    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parses report text.
    ///
    /// # Errors
    ///
    /// Returns the first malformed row.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ReportError> {
        let mut lines = text.lines().map(str::trim).filter(|l| l.starts_with('|'));

        let header = lines.next().ok_or(ReportError::NoTable)?;
        let unit = UNIT
            .captures(header)
            .map_or_else(|| "s".to_string(), |c| c[1].trim().to_string());

        let mut rows = Vec::new();
        for line in lines {
            let cells = split_row(line);
            if cells.iter().all(|c| is_separator(c)) {
                continue;
            }
            if cells.len() < COLUMNS {
                return Err(ReportError::ShortRow {
                    found: cells.len(),
                    expected: COLUMNS,
                    line: line.to_string(),
                });
            }
            let (mean, stddev) = measurement(cells[1])?;
            let (min, _) = measurement(cells[2])?;
            let (max, _) = measurement(cells[3])?;
            let (relative, _) = measurement(cells[4])?;
            rows.push(BenchmarkRow {
                label: cells[0].trim_matches('`').to_string(),
                mean,
                stddev,
                min,
                max,
                relative,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            unit,
            rows,
        })
    }

    /// Labels of the rows in file order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// Returns the row for `label`.
    #[must_use]
    pub fn row(&self, label: &str) -> Option<&BenchmarkRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// The variant with the lowest mean.
    #[must_use]
    pub fn fastest(&self) -> Option<&BenchmarkRow> {
        self.rows.iter().min_by(|a, b| a.mean.total_cmp(&b.mean))
    }

    /// Checks that every expected label has exactly one row and nothing else does.
    ///
    /// # Errors
    ///
    /// Returns the first missing, repeated or unexpected label.
    pub fn verify_labels(&self, expected: &[&str]) -> Result<(), ReportError> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            *counts.entry(row.label.as_str()).or_default() += 1;
        }

        for label in expected {
            match counts.remove(label) {
                Some(1) => {}
                Some(count) => {
                    return Err(ReportError::DuplicateRow {
                        label: (*label).to_string(),
                        count,
                    })
                }
                None => {
                    return Err(ReportError::MissingRow {
                        label: (*label).to_string(),
                    })
                }
            }
        }
        if let Some(extra) = counts.keys().min() {
            return Err(ReportError::UnexpectedRow {
                label: (*extra).to_string(),
            });
        }
        Ok(())
    }
}

fn split_row(line: &str) -> Vec<&str> {
    let inner = line.trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(str::trim).collect()
}

fn is_separator(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':'))
}

fn measurement(cell: &str) -> Result<(f64, Option<f64>), ReportError> {
    let invalid = || ReportError::Measurement {
        cell: cell.to_string(),
    };
    let caps = MEASUREMENT.captures(cell).ok_or_else(invalid)?;
    let value = caps[1].parse::<f64>().map_err(|_| invalid())?;
    let spread = caps
        .get(2)
        .map(|m| m.as_str().parse::<f64>())
        .transpose()
        .map_err(|_| invalid())?;
    Ok((value, spread))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
| Command | Mean [ms] | Min [ms] | Max [ms] | Relative |
|:---|---:|---:|---:|---:|
| `O0` | 12.3 ± 0.4 | 11.9 | 13.5 | 2.12 ± 0.10 |
| `O2` | 5.8 ± 0.2 | 5.6 | 6.3 | 1.00 |
";

    fn sample() -> BenchmarkReport {
        BenchmarkReport::parse(Path::new("filt_perf.md"), SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let report = sample();

        assert_eq!(report.unit, "ms");
        assert_eq!(report.labels(), vec!["O0", "O2"]);
        let o0 = report.row("O0").unwrap();
        assert_eq!(o0.mean, 12.3);
        assert_eq!(o0.stddev, Some(0.4));
        assert_eq!(o0.max, 13.5);
        assert_eq!(report.row("O2").unwrap().stddev, None);
        assert_eq!(report.fastest().unwrap().label, "O2");
    }

    #[test]
    fn test_verify_labels() {
        let report = sample();

        assert!(report.verify_labels(&["O0", "O2"]).is_ok());
        assert!(matches!(
            report.verify_labels(&["O0", "O2", "O3"]),
            Err(ReportError::MissingRow { label }) if label == "O3"
        ));
        assert_eq!(
            report.verify_labels(&["O0"]).unwrap_err().to_string(),
            "unexpected row O2"
        );
    }

    #[test]
    fn test_duplicate_row_rejected() {
        let text = format!("{SAMPLE}| `O2` | 5.9 ± 0.2 | 5.6 | 6.3 | 1.01 |\n");
        let report = BenchmarkReport::parse(Path::new("x"), &text).unwrap();
        assert!(matches!(
            report.verify_labels(&["O0", "O2"]),
            Err(ReportError::DuplicateRow { label, count: 2 }) if label == "O2"
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            BenchmarkReport::parse(Path::new("x"), ""),
            Err(ReportError::NoTable)
        ));
        assert!(matches!(
            BenchmarkReport::parse(
                Path::new("x"),
                "| Command | Mean [s] | Min [s] | Max [s] | Relative |\n| `O0` | fast | 1 | 2 | 1 |"
            ),
            Err(ReportError::Measurement { cell }) if cell == "fast"
        ));
        assert!(matches!(
            BenchmarkReport::parse(Path::new("x"), "| Command | Mean [s] |\n| `O0` | 1 |"),
            Err(ReportError::ShortRow { found: 2, .. })
        ));
    }

    #[test]
    fn test_unreadable_report() {
        let err = BenchmarkReport::read(Path::new("/nonexistent/filt_perf.md")).unwrap_err();
        assert!(matches!(err, ReportError::Read { .. }));
        assert!(err.to_string().starts_with("cannot read /nonexistent/filt_perf.md"));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let report = BenchmarkReport::parse(
            Path::new("x"),
            "| Command | Mean [s] | Min [s] | Max [s] | Relative |\n|:---|---:|---:|---:|---:|\n",
        )
        .unwrap();
        assert_eq!(report.unit, "s");
        assert!(report.rows.is_empty());
    }
}
