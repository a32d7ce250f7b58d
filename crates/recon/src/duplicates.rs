use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::ReconError;
use crate::matcher::key_indices;
use crate::model::{DuplicateCheck, DuplicateKey, DuplicateReport, Side};
use crate::value::KeyTuple;

/// Group records by join-key tuple and report keys seen more than once.
pub fn find_duplicates(
    dataset: &Dataset,
    key_columns: &[String],
    side: Side,
) -> Result<DuplicateReport, ReconError> {
    let indices = key_indices(dataset, key_columns, side)?;

    // key -> (count, first row holding it)
    let mut groups: BTreeMap<KeyTuple, (usize, usize)> = BTreeMap::new();
    for row in 0..dataset.len() {
        groups
            .entry(dataset.key_of(row, &indices))
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, row));
    }

    let duplicates: Vec<DuplicateKey> = groups
        .into_values()
        .filter(|(count, _)| *count > 1)
        .map(|(count, first)| DuplicateKey {
            key: indices.iter().map(|&i| dataset.rows()[first][i].clone()).collect(),
            count,
        })
        .collect();

    if !duplicates.is_empty() {
        warn!(%side, keys = duplicates.len(), "duplicate join keys found");
    }

    Ok(DuplicateReport {
        side,
        key_columns: key_columns.to_vec(),
        duplicates,
    })
}

/// Check both datasets. Diagnostic only: never aborts the comparison.
pub fn validate_duplicates(
    source1: &Dataset,
    source2: &Dataset,
    key_columns: &[String],
) -> Result<DuplicateCheck, ReconError> {
    let check = DuplicateCheck {
        source1: find_duplicates(source1, key_columns, Side::Source1)?,
        source2: find_duplicates(source2, key_columns, Side::Source2)?,
    };
    if check.is_clean() {
        info!("no duplicate join keys");
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn counts_repeated_keys() {
        let ds = Dataset::from_rows(
            ["id", "v"],
            vec![
                vec![5.into(), 1.into()],
                vec![3.into(), 1.into()],
                vec![5.into(), 2.into()],
                vec![5.0.into(), 3.into()],
            ],
        )
        .unwrap();
        let report = find_duplicates(&ds, &["id".to_string()], Side::Source1).unwrap();
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].key, vec![Value::Int(5)]);
        assert_eq!(report.duplicates[0].count, 3);
    }

    #[test]
    fn clean_when_keys_unique() {
        let ds = Dataset::from_rows(["a", "b"], vec![vec![1.into(), "x".into()], vec![1.into(), "y".into()]])
            .unwrap();
        let keys = vec!["a".to_string(), "b".to_string()];
        let check = validate_duplicates(&ds, &ds, &keys).unwrap();
        assert!(check.is_clean());
    }

    #[test]
    fn missing_key_column_fails() {
        let ds = Dataset::from_rows(["a"], vec![]).unwrap();
        let err = find_duplicates(&ds, &["id".to_string()], Side::Source2).unwrap_err();
        assert!(matches!(err, ReconError::MissingKeyColumn { side: Side::Source2, .. }));
    }
}
