//! Price catalogue ingestion and fuzzy matching.

pub mod matcher;
pub mod reader;
pub mod row;

pub use matcher::{best_match, similarity_ratio, CatalogueIndex, Match};
pub use reader::{read_catalogue, read_catalogue_bytes, Record};
pub use row::{parse_decimal_eu, rows_from_records, CatalogueRow, ClassFilter};

use crate::config::{CatalogueColumns, CsvFormat};
use crate::error::CatalogueError;
use std::path::Path;

/// Reads a catalogue file and converts it to rows in one step.
pub fn load_catalogue<P: AsRef<Path>>(
    path: P,
    columns: &CatalogueColumns,
    format: &CsvFormat,
) -> Result<Vec<CatalogueRow>, CatalogueError> {
    let records = read_catalogue(&path, format)?;
    let rows = rows_from_records(&records, columns)?;
    tracing::info!(
        path = %path.as_ref().display(),
        rows = rows.len(),
        "Loaded price catalogue"
    );
    Ok(rows)
}
