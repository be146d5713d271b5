//! Run summary: aggregate `cleanup_complete` records from one or more
//! activity logs into a markdown table and a mermaid bar chart.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::core::errors::{MdsError, Result};
use crate::logger::jsonl::{EventType, LogEntry};

/// Maximum number of bars in the chart.
pub const CHART_CAP: usize = 50;

const UNKNOWN_IMAGE: &str = "unknown";

// ──────────────────── summary types ────────────────────

/// Averages for one (image, level) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub image: String,
    pub level: u8,
    pub runs: u64,
    pub avg_freed_gib: f64,
    pub avg_after_gib: f64,
    pub avg_duration_secs: f64,
    /// Zero when the average duration is zero.
    pub gib_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Sorted by (image, level).
    pub groups: Vec<GroupStats>,
    pub records: u64,
    /// Lines that were not valid JSON or were incomplete `cleanup_complete` records.
    pub skipped_lines: u64,
}

#[derive(Debug, Default)]
struct Accumulator {
    runs: u64,
    sum_freed_gib: i64,
    sum_after_gib: u64,
    sum_duration_ms: u64,
}

// ──────────────────── aggregation ────────────────────

/// Incremental aggregator; feed it log contents, then call [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    groups: BTreeMap<(String, u8), Accumulator>,
    records: u64,
    skipped_lines: u64,
}

impl SummaryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest JSONL text. Blank lines are ignored; other event types are
    /// read and discarded.
    pub fn ingest_str(&mut self, raw: &str) {
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(entry) = serde_json::from_str::<LogEntry>(line) else {
                self.skipped_lines += 1;
                continue;
            };
            if entry.event != EventType::CleanupComplete {
                continue;
            }
            let (Some(level), Some(freed), Some(after)) =
                (entry.level, entry.freed_gib, entry.after_gib)
            else {
                self.skipped_lines += 1;
                continue;
            };
            let image = entry.image.unwrap_or_else(|| UNKNOWN_IMAGE.to_string());
            let acc = self.groups.entry((image, level)).or_default();
            acc.runs += 1;
            acc.sum_freed_gib = acc.sum_freed_gib.saturating_add(freed);
            acc.sum_after_gib = acc.sum_after_gib.saturating_add(after);
            acc.sum_duration_ms = acc
                .sum_duration_ms
                .saturating_add(entry.duration_ms.unwrap_or(0));
            self.records += 1;
        }
    }

    pub fn ingest_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path).map_err(|source| MdsError::io(path, source))?;
        self.ingest_str(&raw);
        Ok(())
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> RunSummary {
        let groups = self
            .groups
            .into_iter()
            .map(|((image, level), acc)| {
                let runs = acc.runs.max(1) as f64;
                let avg_freed_gib = acc.sum_freed_gib as f64 / runs;
                let avg_duration_secs = acc.sum_duration_ms as f64 / runs / 1000.0;
                let gib_per_sec = if avg_duration_secs > 0.0 {
                    avg_freed_gib / avg_duration_secs
                } else {
                    0.0
                };
                GroupStats {
                    image,
                    level,
                    runs: acc.runs,
                    avg_freed_gib,
                    avg_after_gib: acc.sum_after_gib as f64 / runs,
                    avg_duration_secs,
                    gib_per_sec,
                }
            })
            .collect();
        RunSummary {
            groups,
            records: self.records,
            skipped_lines: self.skipped_lines,
        }
    }
}

/// Aggregate every file in `paths`. An unreadable file is an error.
pub fn summarize_files<P: AsRef<Path>>(paths: &[P]) -> Result<RunSummary> {
    let mut builder = SummaryBuilder::new();
    for path in paths {
        builder.ingest_file(path.as_ref())?;
    }
    Ok(builder.finish())
}

// ──────────────────── rendering ────────────────────

impl RunSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Markdown report: heading, table, then the chart when there is data.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Disk Space Cleanup Summary\n\n");
        if self.is_empty() {
            out.push_str("No cleanup runs found.\n");
            return out;
        }

        out.push_str(
            "Image | Level | Runs | Avg Freed | Avg Available After | Avg Duration | GiB/sec\n",
        );
        out.push_str("--- | --- | --- | --- | --- | --- | ---\n");
        for g in &self.groups {
            let _ = writeln!(
                out,
                "{} | {} | {} | {:.2} GiB | {:.2} GiB | {:.1}s | {:.3}",
                g.image,
                g.level,
                g.runs,
                g.avg_freed_gib,
                g.avg_after_gib,
                g.avg_duration_secs,
                g.gib_per_sec
            );
        }
        if self.skipped_lines > 0 {
            let _ = writeln!(out, "\n_{} malformed line(s) skipped._", self.skipped_lines);
        }

        out.push('\n');
        out.push_str(&self.mermaid_chart());
        out
    }

    /// `xychart-beta` of average freed GiB, first [`CHART_CAP`] groups.
    #[must_use]
    pub fn mermaid_chart(&self) -> String {
        let charted = &self.groups[..self.groups.len().min(CHART_CAP)];
        let labels: Vec<String> = charted
            .iter()
            .map(|g| format!("\"{}/{}\"", g.image, g.level))
            .collect();
        let values: Vec<String> = charted
            .iter()
            .map(|g| format!("{:.2}", g.avg_freed_gib))
            .collect();

        let mut out = String::from("```mermaid\nxychart-beta\n");
        out.push_str("  title \"Avg Freed (GiB)\"\n");
        let _ = writeln!(out, "  x-axis [{}]", labels.join(", "));
        let _ = writeln!(out, "  y-axis \"GiB\" 0 --> {}", y_axis_max(charted));
        let _ = writeln!(out, "  bar [{}]", values.join(", "));
        out.push_str("```\n");
        out
    }
}

/// 100, or the largest bar rounded up to the next multiple of 10.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn y_axis_max(groups: &[GroupStats]) -> u64 {
    let peak = groups
        .iter()
        .map(|g| g.avg_freed_gib)
        .fold(0.0_f64, f64::max);
    let rounded = ((peak / 10.0).ceil() * 10.0) as u64;
    rounded.max(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(image: &str, level: u8, freed: i64, after: u64, duration_ms: u64) -> String {
        format!(
            r#"{{"ts":"2026-01-01T00:00:00Z","event":"cleanup_complete","severity":"info","image":"{image}","level":{level},"before_gib":10,"after_gib":{after},"freed_gib":{freed},"duration_ms":{duration_ms}}}"#
        )
    }

    #[test]
    fn groups_by_image_and_level_and_averages() {
        let log = [
            complete("ubuntu24/1.0", 2, 10, 30, 20_000),
            complete("ubuntu24/1.0", 2, 20, 40, 40_000),
            complete("ubuntu22/1.0", 4, 30, 50, 60_000),
        ]
        .join("\n");

        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&log);
        let summary = builder.finish();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.groups.len(), 2);
        // Sorted by key: ubuntu22 first.
        assert_eq!(summary.groups[0].image, "ubuntu22/1.0");
        let g = &summary.groups[1];
        assert_eq!((g.level, g.runs), (2, 2));
        assert!((g.avg_freed_gib - 15.0).abs() < f64::EPSILON);
        assert!((g.avg_after_gib - 35.0).abs() < f64::EPSILON);
        assert!((g.avg_duration_secs - 30.0).abs() < f64::EPSILON);
        assert!((g.gib_per_sec - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_duration_gives_zero_rate() {
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&complete("img", 1, 5, 20, 0));
        let summary = builder.finish();
        assert!(summary.groups[0].gib_per_sec.abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_lines_are_counted_and_other_events_ignored() {
        let log = format!(
            "not json\n\n{}\n{}\n{}\n",
            r#"{"ts":"x","event":"space_report","severity":"info","available_gib":3}"#,
            r#"{"ts":"x","event":"cleanup_complete","severity":"info"}"#,
            complete("img", 3, 1, 2, 1000)
        );
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&log);
        let summary = builder.finish();

        assert_eq!(summary.skipped_lines, 2);
        assert_eq!(summary.records, 1);
        assert!(summary.to_markdown().contains("2 malformed line(s) skipped"));
    }

    #[test]
    fn missing_image_groups_as_unknown() {
        let line = r#"{"ts":"x","event":"cleanup_complete","severity":"info","level":2,"after_gib":9,"freed_gib":4}"#;
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(line);
        assert_eq!(builder.finish().groups[0].image, "unknown");
    }

    #[test]
    fn markdown_has_table_and_chart() {
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&complete("ubuntu24/1.0", 3, 12, 31, 24_000));
        let md = builder.finish().to_markdown();

        assert!(md.contains("Image | Level | Runs"));
        assert!(md.contains("ubuntu24/1.0 | 3 | 1 | 12.00 GiB | 31.00 GiB | 24.0s | 0.500"));
        assert!(md.contains("```mermaid\nxychart-beta\n"));
        assert!(md.contains("x-axis [\"ubuntu24/1.0/3\"]"));
        assert!(md.contains("bar [12.00]"));
        assert!(md.contains("0 --> 100"));
    }

    #[test]
    fn chart_is_capped() {
        let log: Vec<String> = (0..60)
            .map(|i| complete(&format!("img{i:02}"), 1, 1, 1, 1000))
            .collect();
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&log.join("\n"));
        let summary = builder.finish();

        assert_eq!(summary.groups.len(), 60);
        let chart = summary.mermaid_chart();
        let bar_line = chart.lines().find(|l| l.starts_with("  bar")).unwrap();
        assert_eq!(bar_line.matches(',').count(), CHART_CAP - 1);
    }

    #[test]
    fn y_axis_grows_past_one_hundred() {
        let mut builder = SummaryBuilder::new();
        builder.ingest_str(&complete("img", 4, 123, 140, 1000));
        assert!(builder.finish().mermaid_chart().contains("0 --> 130"));
    }

    #[test]
    fn empty_summary_renders_placeholder() {
        let md = RunSummary::default().to_markdown();
        assert!(md.contains("No cleanup runs found."));
        assert!(!md.contains("mermaid"));
    }

    #[test]
    fn summarize_files_reads_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.jsonl");
        fs::write(&a, complete("img", 2, 4, 10, 1000)).unwrap();
        fs::write(&b, complete("img", 2, 6, 12, 3000)).unwrap();

        let summary = summarize_files(&[a, b]).unwrap();
        assert_eq!(summary.records, 2);
        assert!((summary.groups[0].avg_freed_gib - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = summarize_files(&["/nonexistent/mds/activity.jsonl"]).unwrap_err();
        assert_eq!(err.code(), "MDS-4201");
    }
}
