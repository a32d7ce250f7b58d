use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// A join key or field names a transform absent from the registry.
    #[error("unknown transform '{name}' (available: {})", crate::transform::Transform::NAMES.join(", "))]
    UnknownTransform { name: String },

    /// A canonical join key is absent after the transform step.
    #[error("join column '{column}' not found in {side}")]
    MissingKeyColumn { side: Side, column: String },

    /// A tolerance is declared for a field holding a non-numeric value.
    #[error("tolerance declared for field '{field}' but value {value} is not numeric")]
    ToleranceTypeError { field: String, value: String },

    /// Tolerances must be finite and non-negative.
    #[error("tolerance for field '{field}' must be a non-negative number, got {value}")]
    InvalidTolerance { field: String, value: f64 },

    /// Record width does not match the dataset schema.
    #[error("record has {found} value(s) but the schema has {expected} column(s)")]
    RowWidth { expected: usize, found: usize },

    /// Two columns of one dataset share a name.
    #[error("duplicate column '{column}' in schema")]
    DuplicateColumn { column: String },
}
