use super::format_number_eu;
use crate::error::ExportError;
use crate::model::{GeometrySource, ProfileShape};
use crate::report::{BillOfQuantities, ProfileGroup, QuantityTakeOff};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const MAX_COLUMN_WIDTH: usize = 48;

/// Lays out rows as an aligned table: header, `─┼─` separator, rows.
///
/// Column widths follow the widest cell, capped at 48 characters; longer
/// cells are not cut, they only stop widening the column. Trailing padding
/// is trimmed.
#[must_use]
pub fn fmt_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_cells(headers.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in rows {
        lines.push(join_cells(row.iter().map(String::as_str), &widths));
    }
    lines
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    line.trim_end().to_string()
}

fn document(
    title: &str,
    date: NaiveDate,
    preamble: &[String],
    table: Vec<String>,
    footer: &[String],
) -> String {
    let mut lines = vec![title.to_string(), format!("Date: {}", date.format("%Y-%m-%d"))];
    lines.extend_from_slice(preamble);
    lines.push(String::new());
    lines.extend(table);
    lines.push(String::new());
    lines.extend_from_slice(footer);
    lines.join("\n")
}

/// QTO by type and level, with a subtotal per type.
#[must_use]
pub fn render_qto(qto: &QuantityTakeOff, date: NaiveDate) -> String {
    let mut rows = Vec::new();

    for (index, group) in qto.typed().enumerate() {
        let name = group.type_name.as_deref().unwrap_or_default();
        for (level, count) in &group.levels {
            rows.push(vec![
                (index + 1).to_string(),
                group.type_class.to_string(),
                name.to_string(),
                level.clone(),
                count.to_string(),
            ]);
        }
        rows.push(vec![
            String::new(),
            String::new(),
            "Subtotal".to_string(),
            format!("{}/{}", group.type_class, name),
            group.total.to_string(),
        ]);
    }

    for group in qto.untyped() {
        for (level, count) in &group.levels {
            rows.push(vec![
                String::new(),
                group.type_class.to_string(),
                "(untyped)".to_string(),
                level.clone(),
                count.to_string(),
            ]);
        }
        rows.push(vec![
            String::new(),
            String::new(),
            "Subtotal".to_string(),
            group.type_class.to_string(),
            group.total.to_string(),
        ]);
    }

    let headers = ["#", "IfcTypeClass", "Type Name", "Level", "Count"];
    document(
        "Quantity Take Off (QTO)",
        date,
        &[format!("Total Elements: {}", qto.total)],
        fmt_table(&headers, &rows),
        &[format!("TOTAL COUNT = {}", qto.total)],
    )
}

/// QTO with one line per type and no level split.
#[must_use]
pub fn render_qto_totals(qto: &QuantityTakeOff, date: NaiveDate) -> String {
    let mut rows: Vec<Vec<String>> = qto
        .typed()
        .enumerate()
        .map(|(index, group)| {
            vec![
                (index + 1).to_string(),
                group.type_class.to_string(),
                group.type_name.clone().unwrap_or_default(),
                group.total.to_string(),
            ]
        })
        .collect();
    rows.extend(qto.untyped().map(|group| {
        vec![
            String::new(),
            group.type_class.to_string(),
            "(untyped)".to_string(),
            group.total.to_string(),
        ]
    }));

    let headers = ["#", "IfcTypeClass", "Type Name", "Count"];
    document(
        "QUANTITY TAKE OFF (QTO) - TOTALS ONLY",
        date,
        &[format!("Total Elements: {}", qto.total)],
        fmt_table(&headers, &rows),
        &[format!("TOTAL COUNT = {}", qto.total)],
    )
}

fn boq_footer(bill: &BillOfQuantities) -> Vec<String> {
    let mut footer = vec![format!("TOTAL: {}", format_number_eu(bill.grand_total, 2))];
    if bill.unavailable > 0 {
        footer.push(format!("Elements without resolvable quantity: {}", bill.unavailable));
    }
    footer
}

/// BOQ split by cost entry and level, with a subtotal per entry.
#[must_use]
pub fn render_boq(bill: &BillOfQuantities, date: NaiveDate) -> String {
    let subtotals = bill.entry_subtotals();
    let mut subtotal_iter = subtotals.iter();
    let mut rows = Vec::new();

    for (i, line) in bill.lines.iter().enumerate() {
        rows.push(vec![
            line.code.clone(),
            line.description.clone(),
            line.unit.clone(),
            line.level.clone().unwrap_or_default(),
            format_number_eu(line.quantity, 4),
            format_number_eu(line.unit_price, 2),
            format_number_eu(line.line_total, 2),
        ]);

        let entry_ends = !matches!(bill.lines.get(i + 1), Some(next) if next.code == line.code);
        if entry_ends {
            if let Some((_, subtotal)) = subtotal_iter.next() {
                let mut subtotal_row = vec![String::new(); 6];
                subtotal_row[1] = "Item Subtotal".to_string();
                subtotal_row.push(format_number_eu(*subtotal, 2));
                rows.push(subtotal_row);
            }
        }
    }

    let headers = ["Item", "Description", "Unit", "Level", "Quantity", "Unit Cost", "Total Amount"];
    document(
        "BILL OF QUANTITIES (BOQ)",
        date,
        &[],
        fmt_table(&headers, &rows),
        &boq_footer(bill),
    )
}

/// BOQ with one line per cost entry.
#[must_use]
pub fn render_boq_totals(bill: &BillOfQuantities, date: NaiveDate) -> String {
    let totals = bill.totals();
    let rows: Vec<Vec<String>> = totals
        .lines
        .iter()
        .map(|line| {
            vec![
                line.code.clone(),
                line.description.clone(),
                line.unit.clone(),
                format_number_eu(line.quantity, 4),
                format_number_eu(line.unit_price, 2),
                format_number_eu(line.line_total, 2),
            ]
        })
        .collect();

    let headers = ["Item", "Description", "Unit", "Quantity", "Unit Cost", "Total Amount"];
    document(
        "BILL OF QUANTITIES (BOQ) - TOTALS ONLY",
        date,
        &[],
        fmt_table(&headers, &rows),
        &boq_footer(&totals),
    )
}

/// Profile schedule: one block per profile name listing its elements.
#[must_use]
pub fn render_profiles(groups: &[ProfileGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "Profile Name: {}", group.name);
        for profile_use in &group.uses {
            let mapped = match profile_use.source {
                GeometrySource::Direct => "",
                GeometrySource::Mapped => " (type geometry)",
            };
            let _ = writeln!(out, "  {} {}{mapped}", profile_use.class, profile_use.global_id);
            match &profile_use.shape {
                ProfileShape::Rectangle { x_dim, y_dim } => {
                    let _ = writeln!(out, "    XDim: {x_dim}");
                    let _ = writeln!(out, "    YDim: {y_dim}");
                }
                ProfileShape::Circle { radius } => {
                    let _ = writeln!(out, "    Radius: {radius}");
                }
                ProfileShape::Other { entity_type } => {
                    let _ = writeln!(out, "    Profile: {entity_type}");
                }
            }
        }
        let _ = writeln!(out, "{}", "-".repeat(40));
    }
    out
}

/// Writes a rendered report, replacing any existing file.
pub fn write_report<P: AsRef<Path>>(path: P, content: &str) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CostLedger, Element, ElementClass, Extrusion, Profile};
    use crate::quantity::QuantityResolver;
    use crate::report::{aggregate, profile_schedule, quantity_take_off, UnavailablePolicy};
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn bill() -> BillOfQuantities {
        let elements = vec![
            Element::new(1, "a", ElementClass::Beam).with_level("Level 1"),
            Element::new(2, "b", ElementClass::Beam).with_level("Level 2"),
        ];
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let entry = ledger.ensure_entry(schedule, "B.01", "Beam", "pcs");
        ledger.attach_price(entry, 1500.0);
        ledger.associate(1, entry);
        ledger.associate(2, entry);
        aggregate(
            &ledger,
            &elements,
            &QuantityResolver::default(),
            true,
            UnavailablePolicy::CountAsOne,
        )
    }

    #[test]
    fn test_fmt_table_layout() {
        let rows = vec![vec!["1".to_string(), "Beam".to_string()]];
        let lines = fmt_table(&["#", "Name"], &rows);
        assert_eq!(lines, vec!["# | Name", "──┼─────", "1 | Beam"]);
    }

    #[test]
    fn test_fmt_table_caps_width() {
        let long = "x".repeat(60);
        let lines = fmt_table(&["A"], &[vec![long.clone()]]);
        assert_eq!(lines[1].chars().count(), MAX_COLUMN_WIDTH);
        assert_eq!(lines[2], long);
    }

    #[test]
    fn test_boq_by_level() {
        let text = render_boq(&bill(), date());
        let expected = "\
BILL OF QUANTITIES (BOQ)
Date: 2024-05-01

Item | Description   | Unit | Level   | Quantity | Unit Cost | Total Amount
─────┼───────────────┼──────┼─────────┼──────────┼───────────┼─────────────
B.01 | Beam          | pcs  | Level 1 | 1,0000   | 1.500,00  | 1.500,00
B.01 | Beam          | pcs  | Level 2 | 1,0000   | 1.500,00  | 1.500,00
     | Item Subtotal |      |         |          |           | 3.000,00

TOTAL: 3.000,00";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_boq_totals() {
        let text = render_boq_totals(&bill(), date());
        assert!(text.starts_with("BILL OF QUANTITIES (BOQ) - TOTALS ONLY\nDate: 2024-05-01\n"));
        assert!(text.contains("B.01 | Beam        | pcs  | 2,0000   | 1.500,00  | 3.000,00"));
        assert!(text.ends_with("TOTAL: 3.000,00"));
    }

    #[test]
    fn test_qto_rows() {
        let mut typed = Element::new(1, "a", ElementClass::Column).with_level("Level 1");
        typed.type_name = Some("C300".to_string());
        let untyped = Element::new(2, "b", ElementClass::Slab);
        let qto = quantity_take_off(&[typed, untyped]);

        let text = render_qto(&qto, date());
        assert!(text.contains("Total Elements: 2"));
        assert!(text.contains("1 | IfcColumnType | C300"));
        assert!(text.contains("Subtotal  | IfcColumnType/C300"));
        assert!(text.contains("  | IfcSlab       | (untyped) | (no level)"));
        assert!(text.ends_with("TOTAL COUNT = 2"));

        let totals = render_qto_totals(&qto, date());
        assert!(totals.contains("QUANTITY TAKE OFF (QTO) - TOTALS ONLY"));
        assert!(!totals.contains("Level"));
    }

    #[test]
    fn test_profiles_listing() {
        let elements = vec![Element::new(7, "col-1", ElementClass::Column).with_extrusion(
            Extrusion::new(3000.0, Profile::rectangle(300.0, 400.0).named("C300x400")),
        )];
        let text = render_profiles(&profile_schedule(&elements, None));
        assert_eq!(
            text,
            format!(
                "Profile Name: C300x400\n  IfcColumn col-1\n    XDim: 300\n    YDim: 400\n{}\n",
                "-".repeat(40)
            )
        );
    }
}
