//! Estimator configuration: catalogue layout, CSV format and report options.

use crate::error::CatalogueError;
use crate::report::UnavailablePolicy;
use std::path::PathBuf;
use std::str::FromStr;

/// Column names of the price catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueColumns {
    pub code: String,
    pub description: String,
    pub unit: String,
    pub unit_price: String,
    pub class_filter: String,
}

/// Alternative headers tried when the configured one is absent.
pub(crate) const CODE_ALIASES: &[&str] = &["Identification"];
pub(crate) const UNIT_ALIASES: &[&str] = &["Unit"];

impl Default for CatalogueColumns {
    fn default() -> Self {
        Self {
            code: "Identification Code".to_string(),
            description: "Name".to_string(),
            unit: "Measurement Unit".to_string(),
            unit_price: "IfcCostValue".to_string(),
            class_filter: "Ifc Match".to_string(),
        }
    }
}

/// Text encoding of the catalogue file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Utf8,
    /// Windows code page 1252, a superset of ISO 8859-1.
    #[default]
    Windows1252,
}

impl FromStr for Encoding {
    type Err = CatalogueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "cp1252" | "windows-1252" | "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Windows1252),
            _ => Err(CatalogueError::UnknownEncoding {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub encoding: Encoding,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: Encoding::Windows1252,
        }
    }
}

/// Options for one estimation run.
#[derive(Debug, Clone)]
pub struct EstimateConfig {
    pub columns: CatalogueColumns,
    pub csv: CsvFormat,
    /// Name of the cost schedule cost entries are created in.
    pub schedule_name: String,
    pub currency: String,
    pub group_by_level: bool,
    pub unavailable: UnavailablePolicy,
    pub output_dir: PathBuf,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            columns: CatalogueColumns::default(),
            csv: CsvFormat::default(),
            schedule_name: "Price List".to_string(),
            currency: "DKK".to_string(),
            group_by_level: true,
            unavailable: UnavailablePolicy::CountAsOne,
            output_dir: PathBuf::from("output"),
        }
    }
}
