//! `dbrecon-io`: the I/O edges around the comparison core.
//!
//! Collectors ([`SqliteSource`], [`CsvSource`]) implement the core's
//! `TabularSource` seam; report sinks under [`report`] render a finished
//! comparison as CSV, plain text and XLSX.

pub mod csv;
pub mod error;
pub mod report;
pub mod source;

pub use error::{ReportError, SourceError};
pub use report::{write_reports, ReportContext, ReportKind, WrittenReport};
pub use source::{CsvSource, DataSource, SqliteSource};
