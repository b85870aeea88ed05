//! Error types for the IFC estimator.
//!
//! Only input-level failures are errors. Per-element outcomes such as an
//! unavailable quantity or a missing catalogue match are values
//! ([`crate::quantity::Unavailable`], [`crate::assign::AssignmentSummary`]).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors that can occur when reading a price catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// Failed to read the catalogue file from disk.
    #[error("failed to read catalogue '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The CSV content could not be decoded.
    #[error("CSV read failed: {source}")]
    CsvRead {
        #[from]
        source: csv::Error,
    },

    /// A required column is absent from the header row.
    #[error("catalogue is missing column '{column}'")]
    MissingColumn { column: String },

    /// A unit price that does not parse as a number.
    #[error("line {line}: malformed unit price '{value}'")]
    MalformedPrice { line: usize, value: String },

    /// Unsupported text encoding name.
    #[error("unsupported encoding '{name}' (expected utf-8 or cp1252)")]
    UnknownEncoding { name: String },
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
