use std::fmt::Write as _;
use std::path::Path;

use dbrecon_recon::{Presence, Side};

use super::ReportContext;
use crate::error::ReportError;

const RULE_WIDTH: usize = 80;

pub fn write_summary(path: &Path, ctx: &ReportContext<'_>) -> Result<(), ReportError> {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    std::fs::write(path, render_summary(ctx, &generated)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Plain-text summary of one job.
pub fn render_summary(ctx: &ReportContext<'_>, generated: &str) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, ctx, generated);
    out
}

fn render_into(out: &mut String, ctx: &ReportContext<'_>, generated: &str) -> std::fmt::Result {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let s = &ctx.comparison.summary;
    let metrics = &ctx.comparison.metrics;
    let (name1, name2) = (ctx.source1.name.as_str(), ctx.source2.name.as_str());

    writeln!(out, "{heavy}")?;
    writeln!(out, "DATABASE COMPARISON SUMMARY REPORT")?;
    writeln!(out, "{heavy}")?;
    writeln!(out)?;
    writeln!(out, "Generated: {generated}")?;
    writeln!(out)?;

    for (side, rows) in [(Side::Source1, metrics.source1_rows), (Side::Source2, metrics.source2_rows)] {
        let source = ctx.source(side);
        let n = if side == Side::Source1 { 1 } else { 2 };
        writeln!(out, "Data Source {n}: {}", source.name)?;
        writeln!(
            out,
            "  Database: {} - {}",
            source.backend.kind(),
            source.backend.path().display()
        )?;
        writeln!(out, "  Rows: {rows}")?;
        writeln!(out)?;
    }

    writeln!(out, "Join Columns: {}", ctx.options.key_columns().join(", "))?;
    if let Some(fields) = ctx.options.fields.as_ref().filter(|f| !f.is_empty()) {
        writeln!(out, "Comparing Columns: {}", fields.join(", "))?;
    }
    writeln!(out)?;

    writeln!(out, "{light}")?;
    writeln!(out, "COMPARISON RESULTS")?;
    writeln!(out, "{light}")?;
    writeln!(out)?;

    writeln!(out, "Total Rows (after merge): {}", s.total_rows)?;
    writeln!(out, "Equal Rows: {}", s.equal_rows)?;
    writeln!(out, "Different Rows: {}", s.different_rows)?;
    writeln!(out, "Match Percentage: {:.2}%", s.match_percentage)?;
    writeln!(out)?;

    writeln!(out, "MERGE STATUS:")?;
    writeln!(out, "  Rows in Both Sources: {}", s.in_both)?;
    writeln!(out, "  Only in {name1}: {}", s.only_in_source1)?;
    writeln!(out, "  Only in {name2}: {}", s.only_in_source2)?;
    writeln!(out)?;

    if s.is_perfect_match() {
        writeln!(out, "MATCHING STATUS: PERFECT MATCH [OK]")?;
        writeln!(out, "All rows are present in both sources and all values match.")?;
    } else {
        writeln!(out, "MATCHING STATUS: DIFFERENCES FOUND [WARNING]")?;
        if s.different_rows > 0 {
            writeln!(out, "  - {} rows have different values", s.different_rows)?;
        }
        if s.only_in_source1 > 0 {
            writeln!(out, "  - {} rows exist only in {name1}", s.only_in_source1)?;
        }
        if s.only_in_source2 > 0 {
            writeln!(out, "  - {} rows exist only in {name2}", s.only_in_source2)?;
        }
    }
    writeln!(out)?;

    // Most frequent first; stable for ties.
    let mut distribution = [
        (Presence::InBoth, s.in_both),
        (Presence::OnlyInSource1, s.only_in_source1),
        (Presence::OnlyInSource2, s.only_in_source2),
    ];
    distribution.sort_by(|a, b| b.1.cmp(&a.1));
    writeln!(out, "Row Distribution:")?;
    for (presence, count) in distribution.iter().filter(|(_, c)| *c > 0) {
        writeln!(out, "  {}: {count}", presence.label(name1, name2))?;
    }
    Ok(())
}
