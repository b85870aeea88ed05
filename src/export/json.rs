use crate::error::ExportError;
use crate::report::BillOfQuantities;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Totals-only bill of quantities as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoqDocument {
    pub document: DocumentInfo,
    pub items: Vec<BoqItem>,
    pub summary: BoqSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub title: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqItem {
    pub item_code: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoqSummary {
    pub total: f64,
    pub currency: String,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Builds the document from a bill; level buckets are merged. Quantities
/// are rounded to 4 decimals and money to 2.
#[must_use]
pub fn boq_document(bill: &BillOfQuantities, currency: &str, date: NaiveDate) -> BoqDocument {
    let totals = bill.totals();
    BoqDocument {
        document: DocumentInfo {
            title: "BILL OF QUANTITIES (BOQ) - TOTALS ONLY".to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            source: "IFC Model Analysis".to_string(),
        },
        items: totals
            .lines
            .iter()
            .map(|line| BoqItem {
                item_code: line.code.clone(),
                description: line.description.clone(),
                unit: line.unit.clone(),
                quantity: round_to(line.quantity, 4),
                unit_cost: round_to(line.unit_price, 2),
                total_amount: round_to(line.line_total, 2),
            })
            .collect(),
        summary: BoqSummary {
            total: round_to(totals.grand_total, 2),
            currency: currency.to_string(),
        },
    }
}

pub fn export_json<P: AsRef<Path>>(document: &BoqDocument, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(document)?;

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(json.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}
