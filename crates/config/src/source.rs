use std::path::{Path, PathBuf};

use dbrecon_recon::Side;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed set of collector backends, chosen at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sqlite,
    Csv,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Reusable collector settings under `[connections.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub kind: Option<SourceKind>,
    pub path: Option<PathBuf>,
    pub delimiter: Option<char>,
}

/// One side of a job. Inline fields override the referenced connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: Option<String>,
    pub connection: Option<String>,
    pub kind: Option<SourceKind>,
    pub path: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub query: Option<String>,
}

/// Fully resolved backend settings, ready to build a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { path: PathBuf, query: String },
    Csv { path: PathBuf, delimiter: Option<u8> },
}

impl Backend {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Sqlite { .. } => SourceKind::Sqlite,
            Self::Csv { .. } => SourceKind::Csv,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Sqlite { path, .. } | Self::Csv { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub name: String,
    pub backend: Backend,
}

impl SourceConfig {
    /// Merge with the named connection and produce a complete backend.
    /// Relative paths resolve against `base_dir`.
    pub fn resolve(
        &self,
        job: &str,
        side: Side,
        connection: Option<&ConnectionConfig>,
        base_dir: &Path,
    ) -> Result<ResolvedSource, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            job: job.to_string(),
            side,
            field,
        };

        let kind = self
            .kind
            .or_else(|| connection.and_then(|c| c.kind))
            .ok_or_else(|| missing("kind"))?;
        let path = self
            .path
            .clone()
            .or_else(|| connection.and_then(|c| c.path.clone()))
            .ok_or_else(|| missing("path"))?;
        let path = if path.is_relative() { base_dir.join(path) } else { path };

        let backend = match kind {
            SourceKind::Sqlite => Backend::Sqlite {
                path,
                query: self.query.clone().ok_or_else(|| missing("query"))?,
            },
            SourceKind::Csv => {
                let delimiter = match self.delimiter.or_else(|| connection.and_then(|c| c.delimiter)) {
                    Some(c) if c.is_ascii() => Some(c as u8),
                    Some(c) => {
                        return Err(ConfigError::InvalidDelimiter {
                            job: job.to_string(),
                            side,
                            delimiter: c,
                        })
                    }
                    None => None,
                };
                Backend::Csv { path, delimiter }
            }
        };

        Ok(ResolvedSource {
            name: self.name.clone().unwrap_or_else(|| side.to_string()),
            backend,
        })
    }
}
