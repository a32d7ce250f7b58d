use crate::error::ReconError;
use crate::value::{KeyPart, KeyTuple, Value};

/// An ordered set of records sharing one ordered column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new<I, S>(columns: I) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(ReconError::DuplicateColumn { column: name.clone() });
            }
        }
        Ok(Self { columns, rows: Vec::new() })
    }

    /// Build a dataset from a schema and rows in one go.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ds = Self::new(columns)?;
        for row in rows {
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), ReconError> {
        if row.len() != self.columns.len() {
            return Err(ReconError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Set `name` to `values`, replacing the column in place if it already exists
    /// or appending it to the schema otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), ReconError> {
        if values.len() != self.rows.len() {
            return Err(ReconError::RowWidth {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Rename `from` to `to`. An existing column already called `to` is dropped
    /// so the schema stays unique. Returns false when `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.has_column(from);
        }
        if !self.has_column(from) {
            return false;
        }
        if let Some(existing) = self.column_index(to) {
            self.drop_column_at(existing);
        }
        if let Some(idx) = self.column_index(from) {
            self.columns[idx] = to.to_string();
        }
        true
    }

    fn drop_column_at(&mut self, idx: usize) {
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
    }

    /// Keep only the columns for which `keep` returns true, preserving schema order.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let mask: Vec<bool> = self.columns.iter().map(|c| keep(c)).collect();
        let mut i = 0;
        self.columns.retain(|_| {
            i += 1;
            mask[i - 1]
        });
        for row in &mut self.rows {
            let mut j = 0;
            row.retain(|_| {
                j += 1;
                mask[j - 1]
            });
        }
    }

    /// Indices of `names` in this schema, or the first missing name.
    pub fn indices_of<'a>(&self, names: &'a [String]) -> Result<Vec<usize>, &'a str> {
        names
            .iter()
            .map(|n| self.column_index(n).ok_or(n.as_str()))
            .collect()
    }

    /// Join-key tuple of one record, given precomputed key column indices.
    pub fn key_of(&self, row: usize, key_indices: &[usize]) -> KeyTuple {
        let r = &self.rows[row];
        key_indices.iter().map(|&i| KeyPart::from(&r[i])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            ["id", "name", "val"],
            vec![
                vec![1.into(), "a".into(), 10.into()],
                vec![2.into(), "b".into(), 20.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_wrong_width() {
        let mut ds = sample();
        let err = ds.push_row(vec![Value::Int(3)]).unwrap_err();
        assert!(matches!(err, ReconError::RowWidth { expected: 3, found: 1 }));
    }

    #[test]
    fn rejects_duplicate_columns() {
        assert!(Dataset::new(["a", "b", "a"]).is_err());
    }

    #[test]
    fn set_column_appends_then_replaces() {
        let mut ds = sample();
        ds.set_column("key", vec![Value::Int(100), Value::Int(200)]).unwrap();
        assert_eq!(ds.columns(), ["id", "name", "val", "key"]);
        ds.set_column("key", vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(ds.columns().len(), 4);
        assert_eq!(ds.get(1, "key"), Some(&Value::Int(2)));
    }

    #[test]
    fn rename_drops_clashing_target() {
        let mut ds = sample();
        assert!(ds.rename_column("val", "name"));
        assert_eq!(ds.columns(), ["id", "name"]);
        assert_eq!(ds.get(0, "name"), Some(&Value::Int(10)));
        assert!(!ds.rename_column("missing", "x"));
    }

    #[test]
    fn retain_keeps_schema_order() {
        let mut ds = sample();
        ds.retain_columns(|c| c != "name");
        assert_eq!(ds.columns(), ["id", "val"]);
        assert_eq!(ds.rows()[1], vec![Value::Int(2), Value::Int(20)]);
    }
}
