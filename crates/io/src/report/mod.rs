//! Report sinks. Each writer consumes a finished [`Comparison`] and knows
//! nothing about how it was computed.

pub mod csv;
pub mod summary;
pub mod xlsx;

use std::path::{Path, PathBuf};

use dbrecon_config::{ReportConfig, ResolvedSource};
use dbrecon_recon::{CompareOptions, Comparison, Side};
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;

pub const FULL_CSV: &str = "comparison_report.csv";
pub const DIFF_CSV: &str = "differences_only.csv";
pub const SUMMARY_TXT: &str = "summary_report.txt";
pub const SIDE_BY_SIDE_XLSX: &str = "side_by_side_comparison.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Duplicates,
    FullCsv,
    DifferencesCsv,
    Summary,
    Excel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReport {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub path: PathBuf,
}

/// Everything a report writer may show about one job.
pub struct ReportContext<'a> {
    pub comparison: &'a Comparison,
    pub options: &'a CompareOptions,
    pub source1: &'a ResolvedSource,
    pub source2: &'a ResolvedSource,
}

impl ReportContext<'_> {
    pub fn source(&self, side: Side) -> &ResolvedSource {
        match side {
            Side::Source1 => self.source1,
            Side::Source2 => self.source2,
        }
    }
}

/// Write every enabled report into `out_dir`, creating it if needed.
/// Returns what was written, in write order.
pub fn write_reports(
    out_dir: &Path,
    ctx: &ReportContext<'_>,
    reports: &ReportConfig,
) -> Result<Vec<WrittenReport>, ReportError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ReportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();

    if let Some(dups) = &ctx.comparison.duplicates {
        for side in [Side::Source1, Side::Source2] {
            let report = dups.for_side(side);
            if report.is_empty() {
                continue;
            }
            let path = out_dir.join(format!("duplicates_{}.csv", ctx.source(side).name));
            csv::write_duplicates(&path, report)?;
            info!(path = %path.display(), "duplicates saved");
            written.push(WrittenReport { kind: ReportKind::Duplicates, path });
        }
    }

    let merged = &ctx.comparison.merged;
    let (name1, name2) = (ctx.source1.name.as_str(), ctx.source2.name.as_str());

    if reports.full_csv {
        let path = out_dir.join(FULL_CSV);
        csv::write_merged(&path, merged, merged.records.iter(), name1, name2)?;
        info!(path = %path.display(), "comparison report saved");
        written.push(WrittenReport { kind: ReportKind::FullCsv, path });
    }

    if reports.diff_csv {
        let path = out_dir.join(DIFF_CSV);
        csv::write_merged(&path, merged, merged.differences(), name1, name2)?;
        info!(path = %path.display(), "differences report saved");
        written.push(WrittenReport { kind: ReportKind::DifferencesCsv, path });
    }

    if reports.summary {
        let path = out_dir.join(SUMMARY_TXT);
        summary::write_summary(&path, ctx)?;
        info!(path = %path.display(), "summary report saved");
        written.push(WrittenReport { kind: ReportKind::Summary, path });
    }

    if reports.side_by_side_excel {
        let path = out_dir.join(SIDE_BY_SIDE_XLSX);
        let layout = xlsx::LayoutMode::from_flags(
            reports.show_join_columns_both_sides,
            reports.show_transformed_columns,
        );
        xlsx::write_side_by_side(&path, ctx, layout)?;
        info!(path = %path.display(), "side-by-side workbook saved");
        written.push(WrittenReport { kind: ReportKind::Excel, path });
    }

    Ok(written)
}
