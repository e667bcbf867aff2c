//! Validation Error Types

use thiserror::Error;

/// Fatal input-shape errors. Nothing can be validated when one of these occurs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Input had no header row
    #[error("Input table is empty: expected a header row")]
    EmptyInput,

    /// Header is missing one or more required columns
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Errors raised inside a pipeline stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Stage needs a column the dataset does not carry
    #[error("Dataset has no column named {0}")]
    MissingColumn(&'static str),

    /// Data row shorter than the header
    #[error("Row {row} has {found} cells but column {column} is at position {position}")]
    RaggedRow {
        row: usize,
        column: &'static str,
        position: usize,
        found: usize,
    },

    /// Record width does not match the dataset schema
    #[error("Record {sequence} has {found} values, schema has {expected} columns")]
    WidthMismatch {
        sequence: usize,
        expected: usize,
        found: usize,
    },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Date range with `from` after `to`
    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: String, to: String },
}
