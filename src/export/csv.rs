use super::format_number_eu;
use crate::error::ExportError;
use crate::report::BillOfQuantities;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the bill as semicolon separated values with European numbers,
/// one record per line. The `Level` column is empty for totals-only bills.
pub fn export_csv<P: AsRef<Path>>(bill: &BillOfQuantities, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    write_csv(bill, file)
}

pub fn write_csv<W: Write>(bill: &BillOfQuantities, out: W) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);

    writer.write_record([
        "Identification",
        "Name",
        "Unit",
        "Level",
        "Qty",
        "Unit Cost",
        "Line Total",
        "#Elems",
    ])?;

    for line in &bill.lines {
        let quantity = format_number_eu(line.quantity, 2);
        let unit_price = format_number_eu(line.unit_price, 2);
        let line_total = format_number_eu(line.line_total, 2);
        let element_count = line.element_count.to_string();
        writer.write_record([
            line.code.as_str(),
            line.description.as_str(),
            line.unit.as_str(),
            line.level.as_deref().unwrap_or_default(),
            quantity.as_str(),
            unit_price.as_str(),
            line_total.as_str(),
            element_count.as_str(),
        ])?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AggregatedLine;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_semicolon_eu_numbers() {
        let bill = BillOfQuantities {
            lines: vec![AggregatedLine {
                code: "B.01".to_string(),
                description: "Beam; precast".to_string(),
                unit: "m3".to_string(),
                level: None,
                quantity: 2.5,
                unit_price: 1234.5,
                line_total: 3086.25,
                element_count: 2,
                unavailable_count: 0,
            }],
            grand_total: 3086.25,
            unavailable: 0,
        };

        let mut out = Vec::new();
        write_csv(&bill, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Identification;Name;Unit;Level;Qty;Unit Cost;Line Total;#Elems\n\
             B.01;\"Beam; precast\";m3;;2,50;1.234,50;3.086,25;2\n"
        );
    }
}
