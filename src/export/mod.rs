pub mod csv;
pub mod ifc;
pub mod json;
pub mod text;

pub use crate::error::ExportError;
pub use csv::export_csv;
pub use ifc::{annotated_step, cost_output_path, export_ifc, new_global_id};
pub use json::{boq_document, export_json, BoqDocument};
pub use text::{
    fmt_table, render_boq, render_boq_totals, render_profiles, render_qto, render_qto_totals,
    write_report,
};

/// Formats a number European style: `.` groups thousands, `,` marks decimals.
///
/// ```
/// use ifc_estimator::export::format_number_eu;
///
/// assert_eq!(format_number_eu(1234567.891, 2), "1.234.567,89");
/// assert_eq!(format_number_eu(-0.5, 4), "-0,5000");
/// ```
#[must_use]
pub fn format_number_eu(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, ""));

    let mut grouped = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if !frac_part.is_empty() {
        grouped.push(',');
        grouped.push_str(frac_part);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        grouped.insert(0, '-');
    }
    grouped
}
