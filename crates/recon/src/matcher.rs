use std::collections::BTreeMap;

use tracing::info;

use crate::dataset::Dataset;
use crate::error::ReconError;
use crate::model::{ColumnOrigin, MergedColumn, MergedDataset, MergedRecord, Presence, Side};
use crate::value::{KeyTuple, Value};

/// Positions of `key_columns` in `dataset`, or `MissingKeyColumn` for the first absent one.
pub fn key_indices(
    dataset: &Dataset,
    key_columns: &[String],
    side: Side,
) -> Result<Vec<usize>, ReconError> {
    dataset
        .indices_of(key_columns)
        .map_err(|column| ReconError::MissingKeyColumn {
            side,
            column: column.to_string(),
        })
}

/// Where a merged column reads its value from.
#[derive(Clone, Copy)]
enum Pick {
    Key { left: usize, right: usize },
    Left(usize),
    Right(usize),
}

/// Full outer join of two datasets on the canonical key tuple.
///
/// Keys come out in ascending key order. A key seen k times on the left and m
/// times on the right yields k×m `InBoth` records, left-major. Comparison flags
/// are left unset (`is_equal = true`, no field flags) for the comparator to fill.
pub fn full_outer_join(
    left: &Dataset,
    right: &Dataset,
    key_columns: &[String],
) -> Result<MergedDataset, ReconError> {
    let left_keys = key_indices(left, key_columns, Side::Source1)?;
    let right_keys = key_indices(right, key_columns, Side::Source2)?;

    let (columns, picks) = merged_schema(left, right, key_columns, &left_keys, &right_keys);

    let mut groups: BTreeMap<KeyTuple, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for row in 0..left.len() {
        groups.entry(left.key_of(row, &left_keys)).or_default().0.push(row);
    }
    for row in 0..right.len() {
        groups.entry(right.key_of(row, &right_keys)).or_default().1.push(row);
    }

    let build = |l: Option<usize>, r: Option<usize>, presence: Presence| MergedRecord {
        values: picks
            .iter()
            .map(|pick| match *pick {
                Pick::Key { left: li, right: ri } => match (l, r) {
                    (Some(row), _) => left.rows()[row][li].clone(),
                    (None, Some(row)) => right.rows()[row][ri].clone(),
                    (None, None) => Value::Null,
                },
                Pick::Left(i) => l.map_or(Value::Null, |row| left.rows()[row][i].clone()),
                Pick::Right(i) => r.map_or(Value::Null, |row| right.rows()[row][i].clone()),
            })
            .collect(),
        presence,
        field_matches: Vec::new(),
        is_equal: true,
    };

    let mut records = Vec::new();
    for (lrows, rrows) in groups.values() {
        match (lrows.is_empty(), rrows.is_empty()) {
            (false, false) => {
                for &l in lrows {
                    for &r in rrows {
                        records.push(build(Some(l), Some(r), Presence::InBoth));
                    }
                }
            }
            (false, true) => {
                records.extend(lrows.iter().map(|&l| build(Some(l), None, Presence::OnlyInSource1)));
            }
            (true, false) => {
                records.extend(rrows.iter().map(|&r| build(None, Some(r), Presence::OnlyInSource2)));
            }
            (true, true) => {}
        }
    }

    info!(
        left = left.len(),
        right = right.len(),
        merged = records.len(),
        "outer join complete"
    );

    Ok(MergedDataset {
        key_columns: key_columns.to_vec(),
        columns,
        compared_fields: Vec::new(),
        records,
    })
}

/// Left columns in order (keys in place), then right non-key columns.
/// Non-key names present on both sides get the side suffix.
fn merged_schema(
    left: &Dataset,
    right: &Dataset,
    key_columns: &[String],
    left_keys: &[usize],
    right_keys: &[usize],
) -> (Vec<MergedColumn>, Vec<Pick>) {
    let is_key = |name: &str| key_columns.iter().any(|k| k == name);
    let mut columns = Vec::new();
    let mut picks = Vec::new();

    for (i, name) in left.columns().iter().enumerate() {
        if let Some(k) = left_keys.iter().position(|&idx| idx == i) {
            columns.push(MergedColumn {
                name: name.clone(),
                field: name.clone(),
                origin: ColumnOrigin::Key,
            });
            picks.push(Pick::Key { left: i, right: right_keys[k] });
            continue;
        }
        columns.push(side_column(name, Side::Source1, right.has_column(name)));
        picks.push(Pick::Left(i));
    }

    for (i, name) in right.columns().iter().enumerate() {
        if is_key(name) {
            continue;
        }
        columns.push(side_column(name, Side::Source2, left.has_column(name)));
        picks.push(Pick::Right(i));
    }

    (columns, picks)
}

fn side_column(name: &str, side: Side, collides: bool) -> MergedColumn {
    MergedColumn {
        name: if collides {
            format!("{name}{}", side.suffix())
        } else {
            name.to_string()
        },
        field: name.to_string(),
        origin: ColumnOrigin::From(side),
    }
}
