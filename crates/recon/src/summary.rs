use crate::model::{ComparisonSummary, MergedDataset, Presence};

/// Reduce a compared merged dataset to row counts and a match percentage.
pub fn summarize(merged: &MergedDataset) -> ComparisonSummary {
    let mut equal_rows = 0;
    let mut only_in_source1 = 0;
    let mut only_in_source2 = 0;
    let mut in_both = 0;

    for record in &merged.records {
        if record.is_equal {
            equal_rows += 1;
        }
        match record.presence {
            Presence::OnlyInSource1 => only_in_source1 += 1,
            Presence::OnlyInSource2 => only_in_source2 += 1,
            Presence::InBoth => in_both += 1,
        }
    }

    let total_rows = merged.records.len();
    let match_percentage = if total_rows > 0 {
        equal_rows as f64 / total_rows as f64 * 100.0
    } else {
        0.0
    };

    ComparisonSummary {
        total_rows,
        equal_rows,
        different_rows: total_rows - equal_rows,
        match_percentage,
        only_in_source1,
        only_in_source2,
        in_both,
    }
}
