//! Report files written after a simulation.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossword_generator::stats::render_counted_keys;
use crossword_generator::SimulationResult;

/// Format tag written at the top of every report
pub const FORMAT_VERSION: &str = "v1";

/// `<prefix>.<YYYYMMDDHHMMSS>.txt` in the working directory
pub fn default_output_path(prefix: &str, now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("{}.{}.txt", prefix, now.format("%Y%m%d%H%M%S")))
}

/// Ordered `# key=value` lines heading a report
#[derive(Clone, Debug, Default)]
pub struct ReportHeader {
    entries: Vec<(String, String)>,
}
impl ReportHeader {
    /// Starts a header with the format tag, producer, generation time and output file name
    pub fn new(generated_by: &str, generated_at: DateTime<Utc>, output_path: &Path) -> ReportHeader {
        let mut header = ReportHeader::default();
        header.push("format", FORMAT_VERSION);
        header.push("generated_by", generated_by);
        header.push("generated_at_utc", generated_at.to_rfc3339());
        let name = output_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        header.push("output_path", name);
        header
    }

    pub fn push<V: ToString>(&mut self, key: &str, value: V) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    pub fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    /// Run counts shared by every simulation report
    pub fn push_run_counts(&mut self, runs: usize, result: &SimulationResult) {
        self.push("runs", runs);
        self.push("successful_runs", result.successful_runs);
        self.push("failed_runs", result.failed_runs);
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Creates the directory holding `path` when missing
pub fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Writes `header` followed by `key:count` lines
pub fn write_counted_keys(path: &Path, header: &ReportHeader, counts: &BTreeMap<String, usize>) -> Result<()> {
    create_parent(path)?;
    let text = render_counted_keys(header.entries(), counts.iter());
    fs::write(path, text).with_context(|| format!("writing report {}", path.display()))
}

/// Writes one summary line per run
pub fn write_summaries(path: &Path, result: &SimulationResult) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating summaries {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in result.summaries() {
        writeln!(writer, "{}", line)?;
    }
    writer.flush().with_context(|| format!("writing summaries {}", path.display()))
}

/// Writes every run report as a JSON array
pub fn write_json(path: &Path, result: &SimulationResult) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating json output {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &result.runs)
        .with_context(|| format!("writing json output {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crossword_generator::RunReport;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn default_path_carries_timestamp() {
        assert_eq!(default_output_path("mutate", fixed_time()), PathBuf::from("mutate.20260304050607.txt"));
    }

    #[test]
    fn header_starts_with_format_and_producer() {
        let header = ReportHeader::new("repeatability exhaustive", fixed_time(), Path::new("out/exhaustive.txt"));
        let keys: Vec<&str> = header.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["format", "generated_by", "generated_at_utc", "output_path"]);
        assert_eq!(header.entries()[3].1, "exhaustive.txt");
    }

    #[test]
    fn report_file_is_parseable_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.txt");
        let mut header = ReportHeader::new("test", fixed_time(), &path);
        let result = SimulationResult { successful_runs: 2, failed_runs: 1, ..Default::default() };
        header.push_run_counts(3, &result);
        let counts: BTreeMap<String, usize> = [("CANE".to_string(), 1), ("ACRE".to_string(), 2)].into_iter().collect();
        write_counted_keys(&path, &header, &counts).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# format=v1\n"));
        assert!(text.contains("# failed_runs=1\n"));
        assert!(text.ends_with("acre:2\ncane:1\n"));
        let parsed = crossword_generator::stats::parse_counted_keys(&text, &path, crossword_generator::KeyKind::Word).unwrap();
        assert_eq!(parsed.counts.get("ACRE"), Some(&2));
    }

    #[test]
    fn summaries_and_json_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let result = SimulationResult { runs: vec![RunReport::new(1)], failed_runs: 1, ..Default::default() };
        let summaries = dir.path().join("summaries.txt");
        write_summaries(&summaries, &result).unwrap();
        assert_eq!(fs::read_to_string(&summaries).unwrap(), "- 0 0 0 []\n");

        let json = dir.path().join("runs.json");
        write_json(&json, &result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value[0]["run"], 1);
        assert!(value[0]["accepted"].is_null());
    }
}
