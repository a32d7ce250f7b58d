use std::path::PathBuf;

use dbrecon_recon::{ReconError, Side};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("config defines no jobs")]
    NoJobs,

    #[error("job '{0}' not found")]
    UnknownJob(String),

    #[error("job '{job}': at least one join key is required")]
    NoJoinKeys { job: String },

    #[error("job '{job}': {side} references unknown connection '{connection}'")]
    UnknownConnection {
        job: String,
        side: Side,
        connection: String,
    },

    #[error("job '{job}': {side} is missing '{field}'")]
    MissingField {
        job: String,
        side: Side,
        field: &'static str,
    },

    #[error("job '{job}': {side} delimiter '{delimiter}' must be a single ASCII character")]
    InvalidDelimiter {
        job: String,
        side: Side,
        delimiter: char,
    },

    #[error("job '{job}': {source}")]
    Recon {
        job: String,
        #[source]
        source: ReconError,
    },
}
