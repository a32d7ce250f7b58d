use std::fmt;

use serde::Serialize;

use crate::value::Value;

// ---------------------------------------------------------------------------
// Sides and presence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source1,
    Source2,
}

impl Side {
    /// Suffix attached to colliding non-key columns in the merged schema.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Source1 => "_source1",
            Self::Source2 => "_source2",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source1 => write!(f, "source1"),
            Self::Source2 => write!(f, "source2"),
        }
    }
}

/// Which side(s) of the outer join produced a merged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    OnlyInSource1,
    OnlyInSource2,
    InBoth,
}

impl Presence {
    /// Human label used by report sinks, e.g. `Only in before`.
    pub fn label(self, source1: &str, source2: &str) -> String {
        match self {
            Self::OnlyInSource1 => format!("Only in {source1}"),
            Self::OnlyInSource2 => format!("Only in {source2}"),
            Self::InBoth => "Present in Both".to_string(),
        }
    }

    pub fn has(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::InBoth, _) | (Self::OnlyInSource1, Side::Source1) | (Self::OnlyInSource2, Side::Source2)
        )
    }
}

// ---------------------------------------------------------------------------
// Merged dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Canonical join key, present once.
    Key,
    From(Side),
}

/// One column of the merged schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedColumn {
    /// Name in the merged schema (suffixed when the field collided).
    pub name: String,
    /// Field name in its source dataset.
    pub field: String,
    pub origin: ColumnOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    /// Aligned with [`MergedDataset::columns`].
    pub values: Vec<Value>,
    pub presence: Presence,
    /// Aligned with [`MergedDataset::compared_fields`].
    pub field_matches: Vec<bool>,
    pub is_equal: bool,
}

/// Result of the outer join plus per-field comparison flags.
///
/// Schema guarantee for report sinks: join keys unsuffixed, colliding fields
/// suffixed `_source1`/`_source2`, then `presence`, `is_equal` and one
/// `<field>_match` flag per compared field.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    pub key_columns: Vec<String>,
    pub columns: Vec<MergedColumn>,
    pub compared_fields: Vec<String>,
    pub records: Vec<MergedRecord>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of `field` as contributed by `side`. Join keys resolve for both sides.
    pub fn field_index(&self, field: &str, side: Side) -> Option<usize> {
        self.columns.iter().position(|c| {
            c.field == field
                && match c.origin {
                    ColumnOrigin::Key => true,
                    ColumnOrigin::From(s) => s == side,
                }
        })
    }

    pub fn value<'a>(&self, record: &'a MergedRecord, column: &str) -> Option<&'a Value> {
        self.column_index(column).map(|i| &record.values[i])
    }

    pub fn field_match(&self, record: &MergedRecord, field: &str) -> Option<bool> {
        let idx = self.compared_fields.iter().position(|f| f == field)?;
        record.field_matches.get(idx).copied()
    }

    /// Flat header: merged columns, `presence`, `is_equal`, then `<field>_match` flags.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        header.push("presence".to_string());
        header.push("is_equal".to_string());
        header.extend(self.compared_fields.iter().map(|f| format!("{f}_match")));
        header
    }

    pub fn differences(&self) -> impl Iterator<Item = &MergedRecord> {
        self.records.iter().filter(|r| !r.is_equal)
    }
}

// ---------------------------------------------------------------------------
// Summary, duplicates, metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub total_rows: usize,
    pub equal_rows: usize,
    pub different_rows: usize,
    pub match_percentage: f64,
    pub only_in_source1: usize,
    pub only_in_source2: usize,
    pub in_both: usize,
}

impl ComparisonSummary {
    /// No differences and nothing one-sided.
    pub fn is_perfect_match(&self) -> bool {
        self.different_rows == 0 && self.only_in_source1 == 0 && self.only_in_source2 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateKey {
    /// Key values as first seen in the dataset.
    pub key: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub side: Side,
    pub key_columns: Vec<String>,
    pub duplicates: Vec<DuplicateKey>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCheck {
    pub source1: DuplicateReport,
    pub source2: DuplicateReport,
}

impl DuplicateCheck {
    pub fn is_clean(&self) -> bool {
        self.source1.is_empty() && self.source2.is_empty()
    }

    pub fn for_side(&self, side: Side) -> &DuplicateReport {
        match side {
            Side::Source1 => &self.source1,
            Side::Source2 => &self.source2,
        }
    }
}

/// Size and timing of one comparison run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub source1_rows: usize,
    pub source2_rows: usize,
    pub merged_rows: usize,
    /// Merged rows times the width of the flat report header.
    pub merged_cells: usize,
    pub elapsed_ms: f64,
}
