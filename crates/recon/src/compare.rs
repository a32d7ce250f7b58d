//! Per-field comparison of merged records.
//!
//! A field is compared when both sides contributed it to the merged schema.
//! Without a tolerance, values must be equal under [`Value::same_as`]; with a
//! tolerance `t`, numeric values match when `|v1 - v2| <= t`. Two nulls always
//! match, one null never does.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::ReconError;
use crate::model::{MergedDataset, Side};
use crate::value::Value;

/// Per-field absolute tolerances. Always finite and non-negative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToleranceMap(BTreeMap<String, f64>);

impl ToleranceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, tolerance: f64) -> Result<(), ReconError> {
        let field = field.into();
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ReconError::InvalidTolerance { field, value: tolerance });
        }
        self.0.insert(field, tolerance);
        Ok(())
    }

    pub fn with(mut self, field: impl Into<String>, tolerance: f64) -> Result<Self, ReconError> {
        self.insert(field, tolerance)?;
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl TryFrom<BTreeMap<String, f64>> for ToleranceMap {
    type Error = ReconError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut out = Self::new();
        for (field, tol) in map {
            out.insert(field, tol)?;
        }
        Ok(out)
    }
}

/// Fields to compare: the declared set, or every source1 column, minus join keys.
pub fn resolve_fields(
    declared: Option<&[String]>,
    source1_columns: &[String],
    key_columns: &[String],
) -> Vec<String> {
    declared
        .unwrap_or(source1_columns)
        .iter()
        .filter(|f| !key_columns.contains(f))
        .cloned()
        .collect()
}

/// Compare one pair of values.
pub fn values_match(
    field: &str,
    v1: &Value,
    v2: &Value,
    tolerance: Option<f64>,
) -> Result<bool, ReconError> {
    let Some(tol) = tolerance else {
        return Ok(match (v1.is_null(), v2.is_null()) {
            (true, true) => true,
            (false, false) => v1.same_as(v2),
            _ => false,
        });
    };

    for v in [v1, v2] {
        if !v.is_null() && !v.is_numeric() {
            return Err(ReconError::ToleranceTypeError {
                field: field.to_string(),
                value: format!("'{v}' ({})", v.type_name()),
            });
        }
    }

    Ok(match (v1, v2) {
        _ if v1.is_null() && v2.is_null() => true,
        _ if v1.is_null() || v2.is_null() => false,
        (Value::Int(a), Value::Int(b)) => ((*a as i128) - (*b as i128)).unsigned_abs() as f64 <= tol,
        _ => match (v1.as_f64(), v2.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= tol,
            _ => false,
        },
    })
}

/// Fill per-field match flags and `is_equal` on every merged record.
///
/// Declared fields missing from either side of the merged schema are skipped.
pub fn compare_fields(
    merged: &mut MergedDataset,
    fields: &[String],
    tolerances: &ToleranceMap,
) -> Result<(), ReconError> {
    let mut plan = Vec::new();
    for field in fields {
        let left = merged.field_index(field, Side::Source1);
        let right = merged.field_index(field, Side::Source2);
        match (left, right) {
            (Some(l), Some(r)) if l != r => plan.push((field.clone(), l, r, tolerances.get(field))),
            _ => debug!(field = %field, "field not present on both sides, not compared"),
        }
    }

    for (field, _, _, tol) in &plan {
        if let Some(t) = tol {
            info!(field = %field, tolerance = t, "applying tolerance");
        }
    }

    for record in &mut merged.records {
        let mut flags = Vec::with_capacity(plan.len());
        for (field, l, r, tol) in &plan {
            flags.push(values_match(field, &record.values[*l], &record.values[*r], *tol)?);
        }
        record.is_equal = flags.iter().all(|&f| f);
        record.field_matches = flags;
    }

    merged.compared_fields = plan.into_iter().map(|(field, ..)| field).collect();
    Ok(())
}
