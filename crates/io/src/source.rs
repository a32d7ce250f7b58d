// Data collectors behind the core's TabularSource seam

use std::collections::HashSet;
use std::path::PathBuf;

use dbrecon_config::{Backend, ResolvedSource};
use dbrecon_recon::{Dataset, TabularSource, Value};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::error::SourceError;

/// Runs one query against a SQLite file. The connection opens read-only on
/// first fetch and is dropped on close.
pub struct SqliteSource {
    name: String,
    path: PathBuf,
    query: String,
    conn: Option<Connection>,
}

impl SqliteSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: query.into(),
            conn: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

impl TabularSource for SqliteSource {
    type Error = SourceError;

    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self) -> Result<Dataset, SourceError> {
        let path = &self.path;
        let sqlite_err = |source| SourceError::Sqlite {
            path: path.clone(),
            source,
        };
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                debug!(path = %path.display(), "opening sqlite read-only");
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(sqlite_err)?
            }
        };
        let conn = self.conn.insert(conn);

        let mut stmt = conn.prepare(&self.query).map_err(sqlite_err)?;
        let columns = unique_column_names(stmt.column_names());
        let width = columns.len();
        let mut dataset = Dataset::new(columns)?;

        let mut rows = stmt.query([]).map_err(sqlite_err)?;
        while let Some(row) = rows.next().map_err(sqlite_err)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(sqlite_value(row.get_ref(i).map_err(sqlite_err)?));
            }
            dataset.push_row(values)?;
        }
        Ok(dataset)
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!(path = %self.path.display(), "closed sqlite connection");
        }
    }
}

/// Repeated result names (a `SELECT a.*, b.*` join) get `.1`, `.2`, ... suffixes.
fn unique_column_names(names: Vec<&str>) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().map(|n| n.to_string()).collect();
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            if seen.insert(name) {
                return name.to_string();
            }
            let renamed = (1..)
                .map(|n| format!("{name}.{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            warn!(column = name, renamed = %renamed, "duplicate column in query result");
            taken.insert(renamed.clone());
            renamed
        })
        .collect()
}

fn sqlite_value(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Value::text(String::from_utf8_lossy(bytes)),
    }
}

/// Reads a delimited file. The delimiter is sniffed when not given.
pub struct CsvSource {
    name: String,
    path: PathBuf,
    delimiter: Option<u8>,
}

impl CsvSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, delimiter: Option<u8>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            delimiter,
        }
    }
}

impl TabularSource for CsvSource {
    type Error = SourceError;

    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self) -> Result<Dataset, SourceError> {
        crate::csv::read_dataset(&self.path, self.delimiter)
    }
}

/// Closed set of collectors, built from a resolved config source.
pub enum DataSource {
    Sqlite(SqliteSource),
    Csv(CsvSource),
}

impl DataSource {
    pub fn from_resolved(source: &ResolvedSource) -> Self {
        match &source.backend {
            Backend::Sqlite { path, query } => {
                Self::Sqlite(SqliteSource::new(&source.name, path, query))
            }
            Backend::Csv { path, delimiter } => {
                Self::Csv(CsvSource::new(&source.name, path, *delimiter))
            }
        }
    }
}

impl TabularSource for DataSource {
    type Error = SourceError;

    fn name(&self) -> &str {
        match self {
            Self::Sqlite(s) => s.name(),
            Self::Csv(s) => s.name(),
        }
    }

    fn fetch(&mut self) -> Result<Dataset, SourceError> {
        match self {
            Self::Sqlite(s) => s.fetch(),
            Self::Csv(s) => s.fetch(),
        }
    }

    fn close(&mut self) {
        match self {
            Self::Sqlite(s) => s.close(),
            Self::Csv(s) => s.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn seed(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE orders (id INTEGER, amount REAL, note TEXT, raw BLOB);
             INSERT INTO orders VALUES (1, 10.5, 'ok', NULL);
             INSERT INTO orders VALUES (2, NULL, NULL, x'6869');",
        )
        .unwrap();
    }

    #[test]
    fn sqlite_fetch_maps_storage_classes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.db");
        seed(&path);

        let mut src = SqliteSource::new("legacy", &path, "SELECT * FROM orders ORDER BY id");
        let ds = src.fetch().unwrap();
        assert!(src.is_open());
        assert_eq!(ds.columns(), ["id", "amount", "note", "raw"]);
        assert_eq!(ds.get(0, "amount"), Some(&Value::Float(10.5)));
        assert_eq!(ds.get(1, "amount"), Some(&Value::Null));
        assert_eq!(ds.get(1, "raw"), Some(&Value::text("hi")));

        src.close();
        assert!(!src.is_open());
    }

    #[test]
    fn sqlite_join_with_repeated_columns_is_renamed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.db");
        seed(&path);

        let mut src = SqliteSource::new(
            "legacy",
            &path,
            "SELECT a.id, b.id, a.amount, b.id AS \"id.1\" FROM orders a JOIN orders b ON a.id = b.id ORDER BY a.id",
        );
        let ds = src.fetch().unwrap();
        assert_eq!(ds.columns(), ["id", "id.2", "amount", "id.1"]);
        assert_eq!(ds.get(1, "id.2"), Some(&Value::Int(2)));
    }

    #[test]
    fn unique_names_leave_distinct_columns_alone() {
        assert_eq!(unique_column_names(vec!["id", "amount"]), ["id", "amount"]);
        assert_eq!(unique_column_names(vec!["x", "x", "x"]), ["x", "x.1", "x.2"]);
    }

    #[test]
    fn sqlite_bad_query_is_sqlite_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.db");
        seed(&path);

        let mut src = SqliteSource::new("legacy", &path, "SELECT * FROM missing_table");
        assert!(matches!(src.fetch().unwrap_err(), SourceError::Sqlite { .. }));
    }

    #[test]
    fn sqlite_missing_file_fails_read_only_open() {
        let dir = tempdir().unwrap();
        let mut src = SqliteSource::new("x", dir.path().join("absent.db"), "SELECT 1");
        assert!(matches!(src.fetch().unwrap_err(), SourceError::Sqlite { .. }));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn data_source_dispatches_on_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "id,val\n1,2\n").unwrap();

        let resolved = ResolvedSource {
            name: "export".into(),
            backend: Backend::Csv { path, delimiter: None },
        };
        let mut src = DataSource::from_resolved(&resolved);
        assert_eq!(src.name(), "export");
        assert_eq!(src.fetch().unwrap().len(), 1);
    }
}
