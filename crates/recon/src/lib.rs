//! `dbrecon-recon`: keyed reconciliation of two tabular datasets.
//!
//! Pure engine crate: receives fetched datasets, returns the merged, compared
//! record set and its summary. Collectors and report sinks live in `dbrecon-io`.

pub mod compare;
pub mod dataset;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod keys;
pub mod matcher;
pub mod model;
pub mod summary;
pub mod transform;
pub mod value;

pub use compare::ToleranceMap;
pub use dataset::Dataset;
pub use engine::{compare, fetch_and_compare, CompareOptions, Comparison, TabularSource};
pub use error::ReconError;
pub use keys::{JoinKeySpec, KeyTransformPipeline, OriginalKeyColumns};
pub use model::{
    ColumnOrigin, ComparisonSummary, DuplicateCheck, DuplicateKey, DuplicateReport, MergedColumn,
    MergedDataset, MergedRecord, Presence, RunMetrics, Side,
};
pub use transform::Transform;
pub use value::Value;
