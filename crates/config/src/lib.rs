//! `dbrecon-config`: typed TOML job configuration.
//!
//! A job file declares reusable connections and one or more comparison jobs.
//! Everything is validated on load: unknown transforms, bad tolerances and
//! incomplete sources fail before any data is fetched.

pub mod error;
pub mod job;
pub mod source;

pub use error::ConfigError;
pub use job::{Job, JobConfig, JobFile, JoinKeyEntry, JoinKeyTable, ReportConfig};
pub use source::{Backend, ConnectionConfig, ResolvedSource, SourceConfig, SourceKind};
