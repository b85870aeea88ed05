use crate::config::{CsvFormat, Encoding};
use crate::error::CatalogueError;
use std::collections::HashMap;
use std::path::Path;

/// One catalogue row keyed by column header.
pub type Record = HashMap<String, String>;

/// Reads a delimited price list into header-keyed records.
///
/// The file is decoded with the configured encoding before CSV parsing;
/// keys and values are trimmed and short rows simply lack the missing keys.
///
/// # Example
///
/// ```no_run
/// use ifc_estimator::catalogue::read_catalogue;
/// use ifc_estimator::config::CsvFormat;
///
/// let records = read_catalogue("price_list.csv", &CsvFormat::default())?;
/// println!("{} rows", records.len());
/// # Ok::<(), ifc_estimator::error::CatalogueError>(())
/// ```
pub fn read_catalogue<P: AsRef<Path>>(
    path: P,
    format: &CsvFormat,
) -> Result<Vec<Record>, CatalogueError> {
    let bytes = std::fs::read(&path).map_err(|source| CatalogueError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    read_catalogue_bytes(&bytes, format)
}

pub fn read_catalogue_bytes(bytes: &[u8], format: &CsvFormat) -> Result<Vec<Record>, CatalogueError> {
    let text = decode(bytes, format.encoding);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: Record = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        records.push(row);
    }

    tracing::debug!(rows = records.len(), columns = headers.len(), "Read catalogue");
    Ok(records)
}

fn decode(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        }
        Encoding::Windows1252 => bytes.iter().map(|&b| decode_cp1252(b)).collect(),
    }
}

// 0x80..=0x9F differ from ISO 8859-1; unassigned slots map to C1 controls.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn decode_cp1252(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_semicolon_records() {
        let data = b"Identification Code;Name;Measurement Unit;IfcCostValue;Ifc Match\n\
                     B.01; Concrete beam C30 ;m3;1.250,00;IfcBeam\n\
                     ;;;;\n\
                     C.01;Column;m3;980,5;IfcColumn\n";
        let records = read_catalogue_bytes(data, &CsvFormat::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Name"], "Concrete beam C30");
        assert_eq!(records[1]["IfcCostValue"], "980,5");
    }

    #[test]
    fn test_cp1252_decoding() {
        let data = b"Code;Name\nX;Tr\xE6 \x80 \x96 b\xE9ton\n";
        let records = read_catalogue_bytes(data, &CsvFormat::default()).unwrap();
        assert_eq!(records[0]["Name"], "Træ € – béton");
    }

    #[test]
    fn test_utf8_with_bom_and_comma() {
        let data = "\u{FEFF}Code,Name\nX,Bjælke\n".as_bytes();
        let format = CsvFormat {
            delimiter: b',',
            encoding: Encoding::Utf8,
        };
        let records = read_catalogue_bytes(data, &format).unwrap();
        assert_eq!(records[0]["Code"], "X");
        assert_eq!(records[0]["Name"], "Bjælke");
    }

    #[test]
    fn test_short_rows_lack_keys() {
        let data = b"Code;Name;Unit\nX;Beam\n";
        let records = read_catalogue_bytes(data, &CsvFormat::default()).unwrap();
        assert!(!records[0].contains_key("Unit"));
    }
}
