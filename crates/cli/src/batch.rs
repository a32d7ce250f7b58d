//! Batch summary: `comparison_summary.txt` and `comparison_summary.json`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dbrecon_io::WrittenReport;
use serde::Serialize;

use crate::runner::JobOutcome;

pub const SUMMARY_TXT: &str = "comparison_summary.txt";
pub const SUMMARY_JSON: &str = "comparison_summary.json";

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub summary_metadata: Metadata,
    pub execution_status: ExecutionStatus,
    pub matching_status: MatchingStatus,
    pub jobs: Vec<JobDetail>,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub generated_at: String,
    pub total_jobs: usize,
    pub config_file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExecutionStatus {
    pub total_jobs: usize,
    pub successfully_executed: usize,
    pub failed_execution: usize,
    pub failed_jobs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchingStatus {
    pub perfect_matches: usize,
    pub jobs_with_perfect_match: Vec<String>,
    pub with_differences: usize,
    pub jobs_with_differences: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Execution {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Matching {
    #[serde(rename = "PERFECT_MATCH")]
    PerfectMatch,
    #[serde(rename = "DIFFERENCES_FOUND")]
    DifferencesFound,
    #[serde(rename = "N/A")]
    NotApplicable,
}

#[derive(Debug, Serialize)]
pub struct JobDetail {
    pub job_name: String,
    pub execution_status: Execution,
    pub matching_status: Matching,
    pub metrics: Option<JobMetrics>,
    pub output_files: Option<OutputFiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-job numbers; floats rounded to 2 decimals.
#[derive(Debug, PartialEq, Serialize)]
pub struct JobMetrics {
    pub total_rows: usize,
    pub equal_rows: usize,
    pub different_rows: usize,
    pub only_in_source1: usize,
    pub only_in_source2: usize,
    pub in_both: usize,
    pub match_percentage: f64,
    pub source1_rows: usize,
    pub source2_rows: usize,
    pub merged_cells: usize,
    pub elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct OutputFiles {
    pub output_dir: PathBuf,
    pub reports: Vec<WrittenReport>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl BatchSummary {
    /// Successful jobs first in run order, then failed jobs.
    pub fn build(outcomes: &[JobOutcome], config_file: &Path, generated_at: String) -> Self {
        let mut jobs = Vec::new();
        let mut failed = Vec::new();
        let mut perfect = Vec::new();
        let mut different = Vec::new();

        for outcome in outcomes {
            let report = match &outcome.result {
                Ok(report) => report,
                Err(_) => {
                    failed.push(outcome.name.clone());
                    continue;
                }
            };
            let s = &report.summary;
            let matching = if s.is_perfect_match() {
                perfect.push(outcome.name.clone());
                Matching::PerfectMatch
            } else {
                different.push(outcome.name.clone());
                Matching::DifferencesFound
            };
            jobs.push(JobDetail {
                job_name: outcome.name.clone(),
                execution_status: Execution::Success,
                matching_status: matching,
                metrics: Some(JobMetrics {
                    total_rows: s.total_rows,
                    equal_rows: s.equal_rows,
                    different_rows: s.different_rows,
                    only_in_source1: s.only_in_source1,
                    only_in_source2: s.only_in_source2,
                    in_both: s.in_both,
                    match_percentage: round2(s.match_percentage),
                    source1_rows: report.metrics.source1_rows,
                    source2_rows: report.metrics.source2_rows,
                    merged_cells: report.metrics.merged_cells,
                    elapsed_ms: round2(report.metrics.elapsed_ms),
                }),
                output_files: Some(OutputFiles {
                    output_dir: report.output_dir.clone(),
                    reports: report.reports.clone(),
                }),
                error: None,
            });
        }

        for outcome in outcomes {
            if let Err(e) = &outcome.result {
                jobs.push(JobDetail {
                    job_name: outcome.name.clone(),
                    execution_status: Execution::Failed,
                    matching_status: Matching::NotApplicable,
                    metrics: None,
                    output_files: None,
                    error: Some(e.to_string()),
                });
            }
        }

        let total = outcomes.len();
        Self {
            summary_metadata: Metadata {
                generated_at,
                total_jobs: total,
                config_file: config_file.to_path_buf(),
            },
            execution_status: ExecutionStatus {
                total_jobs: total,
                successfully_executed: total - failed.len(),
                failed_execution: failed.len(),
                failed_jobs: failed,
            },
            matching_status: MatchingStatus {
                perfect_matches: perfect.len(),
                jobs_with_perfect_match: perfect,
                with_differences: different.len(),
                jobs_with_differences: different,
            },
            jobs,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        let rule = "=".repeat(80);
        let exec = &self.execution_status;
        let matching = &self.matching_status;

        writeln!(out, "{rule}")?;
        writeln!(out, "DATABASE COMPARISON SUMMARY")?;
        writeln!(out, "{rule}")?;
        writeln!(out)?;

        writeln!(out, "EXECUTION STATUS:")?;
        writeln!(out, "  Total Jobs: {}", exec.total_jobs)?;
        writeln!(out, "  Successfully Executed: {}", exec.successfully_executed)?;
        writeln!(out, "  Failed Execution: {}", exec.failed_execution)?;
        if !exec.failed_jobs.is_empty() {
            writeln!(out, "  Failed Jobs: {}", exec.failed_jobs.join(", "))?;
        }
        writeln!(out)?;

        writeln!(out, "MATCHING STATUS:")?;
        writeln!(out, "  Perfect Matches: {}", matching.perfect_matches)?;
        if !matching.jobs_with_perfect_match.is_empty() {
            writeln!(out, "    Jobs: {}", matching.jobs_with_perfect_match.join(", "))?;
        }
        writeln!(out, "  With Differences: {}", matching.with_differences)?;
        if !matching.jobs_with_differences.is_empty() {
            writeln!(out, "    Jobs: {}", matching.jobs_with_differences.join(", "))?;
        }
        writeln!(out)?;

        writeln!(out, "{rule}")?;
        writeln!(out, "DETAILED RESULTS:")?;
        writeln!(out, "{rule}")?;
        writeln!(out)?;

        for job in &self.jobs {
            writeln!(out, "Job: {}", job.job_name)?;
            match (&job.metrics, &job.error) {
                (Some(m), _) => {
                    writeln!(out, "  Execution Status: SUCCESS")?;
                    let status = match job.matching_status {
                        Matching::PerfectMatch => "PERFECT MATCH",
                        _ => "DIFFERENCES FOUND",
                    };
                    writeln!(out, "  Matching Status: {status}")?;
                    writeln!(out, "  Total Rows: {}", m.total_rows)?;
                    writeln!(out, "  Equal Rows: {}", m.equal_rows)?;
                    writeln!(out, "  Different Rows: {}", m.different_rows)?;
                    writeln!(out, "  Only in Source1: {}", m.only_in_source1)?;
                    writeln!(out, "  Only in Source2: {}", m.only_in_source2)?;
                    writeln!(out, "  Match Percentage: {:.2}%", m.match_percentage)?;
                    writeln!(out, "  Elapsed: {:.2} ms", m.elapsed_ms)?;
                }
                (None, error) => {
                    writeln!(out, "  Execution Status: FAILED")?;
                    if let Some(error) = error {
                        writeln!(out, "  Error: {error}")?;
                    }
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write both summary files into `dir`, returning their paths.
    pub fn write(&self, dir: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let txt = dir.join(SUMMARY_TXT);
        std::fs::write(&txt, self.render_text())?;
        let json = dir.join(SUMMARY_JSON);
        let body = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&json, body)?;
        Ok((txt, json))
    }
}
