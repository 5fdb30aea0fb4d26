//! JSON report documents

use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// A report stamped with when it was produced and by which configuration
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,

    /// SHA-256 of the configuration file the run used
    pub config_hash: &'a str,

    pub report: &'a T,
}

impl<'a, T: Serialize> ReportDocument<'a, T> {
    pub fn new(config_hash: &'a str, report: &'a T) -> Self {
        Self {
            generated_at: Utc::now(),
            config_hash,
            report,
        }
    }
}

/// Writes `report` as a pretty-printed JSON document at `output_path`
///
/// Missing parent directories are created.
pub fn write_report<T: Serialize>(
    report: &T,
    config_hash: &str,
    output_path: &Path,
) -> OutputResult<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let document = ReportDocument::new(config_hash, report);
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::debug!("Wrote report to {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{MetricsAggregator, NodeMetrics, NodeState};
    use serde_json::Value;
    use tempfile::TempDir;

    fn sample_report() -> crate::CrawlReport {
        let mut aggregator = MetricsAggregator::new();
        aggregator.record(NodeMetrics {
            query: "milk".to_string(),
            depth: 0,
            api_calls: 1,
            pages_fetched: 1,
            reported_total: Some(3),
            unique_entities_at_node: 3,
            items_discovered: 4,
            expanded: false,
            outcome: NodeState::Exhausted,
            error: None,
        });
        aggregator.finish(3, false, false)
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("crawl.json");

        write_report(&sample_report(), "abc123", &path).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["config_hash"], "abc123");
        assert_eq!(written["report"]["total_unique_entities"], 3);
        assert_eq!(written["report"]["nodes"][0]["query"], "milk");
        assert!(written["generated_at"]
            .as_str()
            .unwrap()
            .parse::<DateTime<Utc>>()
            .is_ok());
    }

    #[test]
    fn test_write_report_bad_path() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened as a file
        let result = write_report(&sample_report(), "abc123", dir.path());
        assert!(result.is_err());
    }
}
