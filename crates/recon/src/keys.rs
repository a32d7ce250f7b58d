//! Canonical join-key construction.
//!
//! Each [`JoinKeySpec`] names a canonical key and where it comes from on each side.
//! The pipeline mutates both datasets in place, so it runs once per comparison.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::ReconError;
use crate::model::Side;
use crate::transform::Transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeySpec {
    pub target: String,
    pub source1_column: String,
    pub source2_column: String,
    pub source1_transform: Option<Transform>,
    pub source2_transform: Option<Transform>,
}

impl JoinKeySpec {
    /// Same column name on both sides, no transforms.
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            source1_column: target.clone(),
            source2_column: target.clone(),
            target,
            source1_transform: None,
            source2_transform: None,
        }
    }

    pub fn source1(mut self, column: impl Into<String>, transform: Option<Transform>) -> Self {
        self.source1_column = column.into();
        self.source1_transform = transform;
        self
    }

    pub fn source2(mut self, column: impl Into<String>, transform: Option<Transform>) -> Self {
        self.source2_column = column.into();
        self.source2_transform = transform;
        self
    }

    /// Build from registry names, failing on unknown transforms.
    pub fn from_names(
        target: &str,
        source1_column: Option<&str>,
        source2_column: Option<&str>,
        source1_transform: Option<&str>,
        source2_transform: Option<&str>,
    ) -> Result<Self, ReconError> {
        let t1 = source1_transform.map(Transform::from_name).transpose()?;
        let t2 = source2_transform.map(Transform::from_name).transpose()?;
        Ok(Self::new(target)
            .source1(source1_column.unwrap_or(target), t1)
            .source2(source2_column.unwrap_or(target), t2))
    }

    pub fn column(&self, side: Side) -> &str {
        match side {
            Side::Source1 => &self.source1_column,
            Side::Source2 => &self.source2_column,
        }
    }

    pub fn transform(&self, side: Side) -> Option<&Transform> {
        match side {
            Side::Source1 => self.source1_transform.as_ref(),
            Side::Source2 => self.source2_transform.as_ref(),
        }
    }
}

/// Canonical key name → the source column it was built from, per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginalKeyColumns {
    pub source1: BTreeMap<String, String>,
    pub source2: BTreeMap<String, String>,
}

impl OriginalKeyColumns {
    /// Original column for `target`, falling back to `target` itself.
    pub fn get<'a>(&'a self, side: Side, target: &'a str) -> &'a str {
        let map = match side {
            Side::Source1 => &self.source1,
            Side::Source2 => &self.source2,
        };
        map.get(target).map(String::as_str).unwrap_or(target)
    }

    /// Whether `target` was derived from a differently named column.
    pub fn is_renamed(&self, side: Side, target: &str) -> bool {
        self.get(side, target) != target
    }
}

/// Rename source1 columns before key construction. Absent columns are ignored.
pub fn apply_column_mapping(dataset: &mut Dataset, mapping: &BTreeMap<String, String>) {
    if mapping.is_empty() {
        return;
    }
    for (from, to) in mapping {
        if dataset.rename_column(from, to) {
            debug!(from = %from, to = %to, "mapped source1 column");
        }
    }
    info!(columns = ?dataset.columns(), "applied column mapping");
}

pub struct KeyTransformPipeline<'a> {
    specs: &'a [JoinKeySpec],
    fields: Option<&'a [String]>,
}

impl<'a> KeyTransformPipeline<'a> {
    pub fn new(specs: &'a [JoinKeySpec], fields: Option<&'a [String]>) -> Self {
        Self { specs, fields }
    }

    pub fn key_columns(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.target.clone()).collect()
    }

    /// Build canonical key columns on both datasets, then prune to keys,
    /// declared fields and the original key columns.
    pub fn apply(
        &self,
        source1: &mut Dataset,
        source2: &mut Dataset,
    ) -> Result<OriginalKeyColumns, ReconError> {
        let mut originals = OriginalKeyColumns::default();
        for spec in self.specs {
            apply_side(spec, Side::Source1, source1)?;
            apply_side(spec, Side::Source2, source2)?;
            originals
                .source1
                .insert(spec.target.clone(), spec.source1_column.clone());
            originals
                .source2
                .insert(spec.target.clone(), spec.source2_column.clone());
        }

        if let Some(fields) = self.fields {
            let mut keep: Vec<&str> = self.specs.iter().map(|s| s.target.as_str()).collect();
            keep.extend(fields.iter().map(String::as_str));
            for spec in self.specs {
                for side in [Side::Source1, Side::Source2] {
                    if spec.column(side) != spec.target {
                        keep.push(spec.column(side));
                    }
                }
            }
            source1.retain_columns(|c| keep.contains(&c));
            source2.retain_columns(|c| keep.contains(&c));
            info!(fields = ?fields, "pruned datasets to compared fields");
        }

        debug!(source1 = ?source1.columns(), source2 = ?source2.columns(), "key columns ready");
        Ok(originals)
    }
}

fn apply_side(spec: &JoinKeySpec, side: Side, dataset: &mut Dataset) -> Result<(), ReconError> {
    let column = spec.column(side);
    if !dataset.has_column(column) {
        // Nothing to build. The matcher reports the canonical key if it is still absent.
        debug!(%side, column, "join source column absent, skipped");
        return Ok(());
    }

    match spec.transform(side) {
        Some(transform) => {
            info!(%side, column, transform = transform.name(), target = %spec.target, "applying key transform");
            let transformed = match dataset.column_values(column) {
                Some(values) => transform.apply_all(values),
                None => return Ok(()),
            };
            dataset.set_column(&spec.target, transformed)?;
        }
        None if column != spec.target => {
            dataset.rename_column(column, &spec.target);
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn ds(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::from_rows(columns.iter().copied(), rows).unwrap()
    }

    #[test]
    fn transform_keeps_original_column() {
        let mut d1 = ds(&["legacy_id", "amount"], vec![vec!["1001".into(), 5.into()]]);
        let mut d2 = ds(&["ext_id", "amount"], vec![vec!["ext-1001".into(), 5.into()]]);
        let specs = vec![JoinKeySpec::from_names(
            "id",
            Some("legacy_id"),
            Some("ext_id"),
            Some("to_int"),
            Some("remove_prefix_and_int"),
        )
        .unwrap()];

        let originals = KeyTransformPipeline::new(&specs, None).apply(&mut d1, &mut d2).unwrap();

        assert_eq!(d1.columns(), ["legacy_id", "amount", "id"]);
        assert_eq!(d1.get(0, "id"), Some(&Value::Int(1001)));
        assert_eq!(d2.get(0, "id"), Some(&Value::Int(1001)));
        assert_eq!(originals.get(Side::Source1, "id"), "legacy_id");
        assert!(originals.is_renamed(Side::Source2, "id"));
    }

    #[test]
    fn rename_without_transform() {
        let mut d1 = ds(&["cust_no", "v"], vec![vec![1.into(), 1.into()]]);
        let mut d2 = ds(&["id", "v"], vec![vec![1.into(), 1.into()]]);
        let specs = vec![JoinKeySpec::new("id").source1("cust_no", None)];

        KeyTransformPipeline::new(&specs, None).apply(&mut d1, &mut d2).unwrap();

        assert_eq!(d1.columns(), ["id", "v"]);
        assert_eq!(d2.columns(), ["id", "v"]);
    }

    #[test]
    fn absent_source_column_is_skipped() {
        let mut d1 = ds(&["a"], vec![vec![1.into()]]);
        let mut d2 = ds(&["a"], vec![vec![1.into()]]);
        let specs = vec![JoinKeySpec::new("id").source1("missing", Transform::from_name("to_int").ok())];

        KeyTransformPipeline::new(&specs, None).apply(&mut d1, &mut d2).unwrap();

        assert!(!d1.has_column("id"));
        assert!(!d2.has_column("id"));
    }

    #[test]
    fn pruning_keeps_keys_fields_and_originals() {
        let mut d1 = ds(
            &["legacy_id", "amount", "note", "extra"],
            vec![vec!["7".into(), 1.into(), "x".into(), 0.into()]],
        );
        let mut d2 = ds(&["id", "amount", "other"], vec![vec![7.into(), 1.into(), 0.into()]]);
        let specs = vec![JoinKeySpec::new("id").source1("legacy_id", Transform::from_name("to_int").ok())];
        let fields = vec!["amount".to_string()];

        KeyTransformPipeline::new(&specs, Some(fields.as_slice())).apply(&mut d1, &mut d2).unwrap();

        assert_eq!(d1.columns(), ["legacy_id", "amount", "id"]);
        assert_eq!(d2.columns(), ["id", "amount"]);
    }

    #[test]
    fn column_mapping_renames_and_ignores_missing() {
        let mut d1 = ds(&["AMT", "id"], vec![vec![1.into(), 1.into()]]);
        let mapping = BTreeMap::from([
            ("AMT".to_string(), "amount".to_string()),
            ("GONE".to_string(), "x".to_string()),
        ]);
        apply_column_mapping(&mut d1, &mapping);
        assert_eq!(d1.columns(), ["amount", "id"]);
    }
}
