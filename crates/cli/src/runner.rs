//! Job execution. Each job is isolated: a failure is logged and recorded, and
//! the batch moves on.

use std::path::PathBuf;
use std::time::Instant;

use dbrecon_config::{ConfigError, Job, JobFile};
use dbrecon_io::{write_reports, DataSource, ReportContext, ReportError, SourceError, WrittenReport};
use dbrecon_recon::{fetch_and_compare, ComparisonSummary, RunMetrics};
use thiserror::Error;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// A job that ran to completion.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub summary: ComparisonSummary,
    pub metrics: RunMetrics,
    pub output_dir: PathBuf,
    pub reports: Vec<WrittenReport>,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub result: Result<JobReport, JobError>,
}

impl JobOutcome {
    pub fn has_differences(&self) -> bool {
        matches!(&self.result, Ok(r) if !r.summary.is_perfect_match())
    }
}

/// Collect both sides, compare, and write the enabled reports.
pub fn run_job(file: &JobFile, job: &Job) -> Result<JobReport, JobError> {
    let started = Instant::now();
    let options = job.config.compare_options(&job.name)?;
    let (source1, source2) = file.resolve_sources(job)?;
    info!(
        source1 = %source1.name,
        source2 = %source2.name,
        keys = ?options.key_columns(),
        "starting comparison"
    );

    let mut collector1 = DataSource::from_resolved(&source1);
    let mut collector2 = DataSource::from_resolved(&source2);
    let comparison = fetch_and_compare::<_, _, SourceError>(&mut collector1, &mut collector2, &options)?;

    let output_dir = file.output_dir(job);
    let ctx = ReportContext {
        comparison: &comparison,
        options: &options,
        source1: &source1,
        source2: &source2,
    };
    let reports = write_reports(&output_dir, &ctx, &job.config.reports)?;

    let mut metrics = comparison.metrics.clone();
    metrics.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(elapsed_ms = metrics.elapsed_ms, "job completed");

    Ok(JobReport {
        summary: comparison.summary,
        metrics,
        output_dir,
        reports,
    })
}

/// Run every job in file order, or only `only` when given.
pub fn run_all(file: &JobFile, only: Option<&str>) -> Result<Vec<JobOutcome>, ConfigError> {
    let jobs: Vec<&Job> = match only {
        Some(name) => vec![file.job(name)?],
        None => file.jobs.iter().collect(),
    };

    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        let _span = info_span!("job", name = %job.name).entered();
        let result = run_job(file, job);
        match &result {
            Ok(report) if report.summary.is_perfect_match() => {
                info!(rows = report.summary.total_rows, "PERFECT MATCH");
            }
            Ok(report) => {
                let s = &report.summary;
                warn!(
                    different = s.different_rows,
                    only_in_source1 = s.only_in_source1,
                    only_in_source2 = s.only_in_source2,
                    "DIFFERENCES FOUND"
                );
            }
            Err(e) => error!(error = %e, "job failed"),
        }
        outcomes.push(JobOutcome {
            name: job.name.clone(),
            result,
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    const CONFIG: &str = r#"
[jobs.good]
join_keys = ["id"]

[jobs.good.source1]
kind = "csv"
path = "a.csv"

[jobs.good.source2]
kind = "csv"
path = "b.csv"

[jobs.broken]
join_keys = ["id"]

[jobs.broken.source1]
kind = "csv"
path = "missing.csv"

[jobs.broken.source2]
kind = "csv"
path = "b.csv"
"#;

    #[test]
    fn failed_job_does_not_stop_batch() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.csv", "id,v\n1,1\n2,2\n");
        write(dir.path(), "b.csv", "id,v\n1,1\n2,3\n");
        write(dir.path(), "jobs.toml", CONFIG);
        let file = JobFile::load(&dir.path().join("jobs.toml")).unwrap();

        let outcomes = run_all(&file, None).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "good");
        assert!(outcomes[0].has_differences());
        let report = outcomes[0].result.as_ref().unwrap();
        assert_eq!(report.summary.different_rows, 1);
        assert_eq!(report.output_dir, dir.path().join("output").join("good"));
        assert_eq!(report.reports.len(), 3);
        assert!(report.output_dir.join("summary_report.txt").exists());

        assert!(matches!(
            outcomes[1].result,
            Err(JobError::Source(SourceError::Read { .. }))
        ));
        assert!(!outcomes[1].has_differences());
    }

    #[test]
    fn single_job_selection() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.csv", "id\n1\n");
        write(dir.path(), "b.csv", "id\n1\n");
        write(dir.path(), "jobs.toml", CONFIG);
        let file = JobFile::load(&dir.path().join("jobs.toml")).unwrap();

        let outcomes = run_all(&file, Some("good")).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].has_differences());
        assert!(matches!(run_all(&file, Some("nope")), Err(ConfigError::UnknownJob(_))));
    }
}
