use super::Record;
use crate::config::{CatalogueColumns, CODE_ALIASES, UNIT_ALIASES};
use crate::error::CatalogueError;
use crate::model::ElementClass;
use crate::units::{normalize, CanonicalUnit};
use serde::Serialize;

/// Which element class a catalogue row applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClassFilter {
    /// Empty filter or `IfcElement`: usable for any class.
    Any,
    Class(ElementClass),
    /// A class outside the structural set; never matches.
    Unsupported(String),
}

impl ClassFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("IfcElement") {
            return Self::Any;
        }
        ElementClass::from_ifc_name(raw).map_or_else(|| Self::Unsupported(raw.to_string()), Self::Class)
    }
}

/// One priced line of the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogueRow {
    /// 1-based data line, for diagnostics.
    pub line: usize,
    pub code: String,
    pub description: String,
    pub unit: String,
    pub raw_price: String,
    pub unit_price: Option<f64>,
    pub class_filter: ClassFilter,
}

impl CatalogueRow {
    #[must_use]
    pub fn from_record(line: usize, record: &Record, columns: &CatalogueColumns) -> Self {
        let raw_price = field(record, &columns.unit_price, &[]).to_string();
        Self {
            line,
            code: field(record, &columns.code, CODE_ALIASES).to_string(),
            description: field(record, &columns.description, &[]).to_string(),
            unit: field(record, &columns.unit, UNIT_ALIASES).to_string(),
            unit_price: parse_decimal_eu(&raw_price),
            raw_price,
            class_filter: ClassFilter::parse(field(record, &columns.class_filter, &[])),
        }
    }

    /// The unit price, or an error naming the line when it does not parse.
    pub fn price(&self) -> Result<f64, CatalogueError> {
        self.unit_price.ok_or_else(|| CatalogueError::MalformedPrice {
            line: self.line,
            value: self.raw_price.clone(),
        })
    }

    #[must_use]
    pub fn canonical_unit(&self) -> CanonicalUnit {
        normalize(&self.unit)
    }
}

fn field<'a>(record: &'a Record, column: &str, aliases: &[&str]) -> &'a str {
    std::iter::once(column)
        .chain(aliases.iter().copied())
        .find_map(|key| record.get(key))
        .map_or("", |value| value.trim())
}

/// Converts records to rows. Fails when the code or description column is
/// missing from a non-empty catalogue.
pub fn rows_from_records(
    records: &[Record],
    columns: &CatalogueColumns,
) -> Result<Vec<CatalogueRow>, CatalogueError> {
    if let Some(first) = records.first() {
        let has = |column: &str, aliases: &[&str]| {
            std::iter::once(column)
                .chain(aliases.iter().copied())
                .any(|key| first.contains_key(key))
        };
        if !has(&columns.code, CODE_ALIASES) {
            return Err(CatalogueError::MissingColumn {
                column: columns.code.clone(),
            });
        }
        if !has(&columns.description, &[]) {
            return Err(CatalogueError::MissingColumn {
                column: columns.description.clone(),
            });
        }
    }

    Ok(records
        .iter()
        .enumerate()
        .map(|(index, record)| CatalogueRow::from_record(index + 1, record, columns))
        .collect())
}

/// Parses a price written in European style (`1.234,56`).
///
/// With a comma present, dots are thousands separators and the comma is the
/// decimal mark. Without a comma a single dot is read as the decimal mark and
/// several dots as thousands separators. Returns `None` for anything that is
/// not a finite number.
///
/// ```
/// use ifc_estimator::catalogue::parse_decimal_eu;
///
/// assert_eq!(parse_decimal_eu("1.234,56"), Some(1234.56));
/// assert_eq!(parse_decimal_eu("abc"), None);
/// ```
#[must_use]
pub fn parse_decimal_eu(value: &str) -> Option<f64> {
    let s: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}')
        .collect();
    if s.is_empty() {
        return None;
    }

    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if s.matches('.').count() > 1 {
        s.replace('.', "")
    } else {
        s
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_decimal_eu() {
        assert_eq!(parse_decimal_eu("1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal_eu("980,5"), Some(980.5));
        assert_eq!(parse_decimal_eu("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_decimal_eu("12.5"), Some(12.5));
        assert_eq!(parse_decimal_eu(" 45 "), Some(45.0));
        assert_eq!(parse_decimal_eu("1 200,00"), Some(1200.0));
        assert_eq!(parse_decimal_eu(""), None);
        assert_eq!(parse_decimal_eu("n/a"), None);
        assert_eq!(parse_decimal_eu("NaN"), None);
    }

    #[test]
    fn test_class_filter() {
        assert_eq!(ClassFilter::parse(""), ClassFilter::Any);
        assert_eq!(ClassFilter::parse("IfcElement"), ClassFilter::Any);
        assert_eq!(ClassFilter::parse("IfcBeam"), ClassFilter::Class(ElementClass::Beam));
        assert_eq!(
            ClassFilter::parse("IfcDoor"),
            ClassFilter::Unsupported("IfcDoor".to_string())
        );
    }

    #[test]
    fn test_row_from_record_with_aliases() {
        let rec = record(&[
            ("Identification", "B.01"),
            ("Name", "Beam"),
            ("Unit", "ml"),
            ("IfcCostValue", "12,50"),
            ("Ifc Match", "IfcBeam"),
        ]);
        let row = CatalogueRow::from_record(3, &rec, &CatalogueColumns::default());
        assert_eq!(row.code, "B.01");
        assert_eq!(row.canonical_unit(), CanonicalUnit::Length);
        assert_eq!(row.price().unwrap(), 12.5);
    }

    #[test]
    fn test_malformed_price_names_line() {
        let rec = record(&[("Identification Code", "B.01"), ("Name", "Beam"), ("IfcCostValue", "tbd")]);
        let row = CatalogueRow::from_record(7, &rec, &CatalogueColumns::default());
        let err = row.price().unwrap_err();
        assert_eq!(err.to_string(), "line 7: malformed unit price 'tbd'");
    }

    #[test]
    fn test_missing_code_column() {
        let records = vec![record(&[("Code", "B.01"), ("Name", "Beam")])];
        let err = rows_from_records(&records, &CatalogueColumns::default()).unwrap_err();
        assert!(matches!(err, CatalogueError::MissingColumn { .. }));
    }
}
