use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// Typed select value such as `IFCLABEL('x')` or `IFCMONETARYMEASURE(12.5)`.
    Typed(String, Box<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    /// Typed wrappers are looked through by all accessors.
    #[must_use]
    pub fn untyped(&self) -> &StepValue {
        match self {
            StepValue::Typed(_, inner) => inner.untyped(),
            other => other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.untyped() {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.untyped() {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self.untyped() {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&str> {
        match self.untyped() {
            StepValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// References contained in a list value; empty for anything else.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self.untyped() {
            StepValue::List(list) => list.iter().filter_map(StepValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }

    fn write_step(&self, out: &mut String) {
        match self {
            StepValue::String(s) => {
                out.push('\'');
                out.push_str(&encode_step_string(s));
                out.push('\'');
            }
            StepValue::Real(f) => out.push_str(&format_real(*f)),
            StepValue::Integer(i) => {
                let _ = write!(out, "{i}");
            }
            StepValue::Boolean(b) => out.push_str(if *b { ".T." } else { ".F." }),
            StepValue::Enum(e) => {
                let _ = write!(out, ".{e}.");
            }
            StepValue::Reference(id) => {
                let _ = write!(out, "#{id}");
            }
            StepValue::List(list) => {
                out.push('(');
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_step(out);
                }
                out.push(')');
            }
            StepValue::Typed(name, inner) => {
                out.push_str(name);
                out.push('(');
                inner.write_step(out);
                out.push(')');
            }
            StepValue::Null => out.push('$'),
            StepValue::Derived => out.push('*'),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
    /// Source statement text; `None` once the entity is created or edited.
    raw: Option<String>,
}

impl StepEntity {
    #[must_use]
    pub fn new(id: u64, entity_type: impl Into<String>, values: Vec<StepValue>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            values,
            raw: None,
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(StepValue::as_f64)
    }

    #[must_use]
    pub fn get_reference(&self, index: usize) -> Option<u64> {
        self.get(index).and_then(StepValue::as_reference)
    }

    #[must_use]
    pub fn get_references(&self, index: usize) -> Vec<u64> {
        self.get(index).map(StepValue::references).unwrap_or_default()
    }

    /// Mutable access to the attributes; the entity is re-serialized on write.
    pub fn values_mut(&mut self) -> &mut Vec<StepValue> {
        self.raw = None;
        &mut self.values
    }

    /// `#id=TYPE(values);` without a trailing newline.
    #[must_use]
    pub fn to_step(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = format!("#{}={}", self.id, self.entity_type);
        StepValue::List(self.values.clone()).write_step(&mut out);
        out.push(';');
        out
    }
}

#[derive(Debug, Default)]
pub struct StepFile {
    pub entities: BTreeMap<u64, StepEntity>,
    pub schema: String,
    /// Everything up to and including the `DATA;` line.
    header: String,
    /// Everything from the closing `ENDSEC;` of the data section on.
    trailer: String,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut entities = BTreeMap::new();
        let mut schema = String::new();
        let mut data_start = None;
        let mut data_end = None;

        for (start, end) in split_statements(content) {
            let statement = content[start..end].trim();

            if statement.starts_with("FILE_SCHEMA") {
                if let Some(open) = statement.find("('") {
                    if let Some(close) = statement[open + 2..].find('\'') {
                        schema = statement[open + 2..open + 2 + close].to_string();
                    }
                }
                continue;
            }

            if statement == "DATA" {
                data_start = Some(end + 1);
                continue;
            }
            if statement == "ENDSEC" && data_start.is_some() && data_end.is_none() {
                data_end = Some(start);
                continue;
            }

            if data_start.is_some() && data_end.is_none() && statement.starts_with('#') {
                match Self::parse_entity_statement(statement) {
                    Some(entity) => {
                        entities.insert(entity.id, entity);
                    }
                    None => tracing::debug!(statement = %statement, "Skipping unparseable statement"),
                }
            }
        }

        let (Some(data_start), Some(data_end)) = (data_start, data_end) else {
            return Err(ParseError::InvalidStep {
                message: "missing DATA section".to_string(),
            });
        };

        let header = content[..data_start].to_string();
        let trailer = content[data_end..].trim_start().to_string();

        Ok(StepFile {
            entities,
            schema,
            header,
            trailer,
        })
    }

    fn parse_entity_statement(statement: &str) -> Option<StepEntity> {
        // Format: #123=IFCWALL('guid',#ref,'name',...)
        let eq_pos = statement.find('=')?;
        let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

        let rest = statement[eq_pos + 1..].trim();
        let paren_pos = rest.find('(')?;
        let entity_type = rest[..paren_pos].trim().to_uppercase();

        if !rest.ends_with(')') {
            return None;
        }
        let values_str = &rest[paren_pos + 1..rest.len() - 1];
        let values = Self::parse_values(values_str);

        Some(StepEntity {
            id,
            entity_type,
            values,
            raw: Some(format!("{statement};")),
        })
    }

    fn parse_values(s: &str) -> Vec<StepValue> {
        let mut values = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut paren_depth = 0;

        for ch in s.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    current.push(ch);
                }
                '(' if !in_string => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' if !in_string => {
                    paren_depth -= 1;
                    current.push(ch);
                }
                ',' if !in_string && paren_depth == 0 => {
                    values.push(Self::parse_single_value(current.trim()));
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() {
            values.push(Self::parse_single_value(current.trim()));
        }

        values
    }

    fn parse_single_value(s: &str) -> StepValue {
        let s = s.trim();

        if s == "$" {
            return StepValue::Null;
        }
        if s == "*" {
            return StepValue::Derived;
        }
        if let Some(stripped) = s.strip_prefix('#') {
            if let Ok(id) = stripped.parse::<u64>() {
                return StepValue::Reference(id);
            }
        }
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            let raw = &s[1..s.len() - 1];
            return StepValue::String(decode_step_string(raw));
        }
        if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
            let inner = &s[1..s.len() - 1];
            if inner == "T" {
                return StepValue::Boolean(true);
            }
            if inner == "F" {
                return StepValue::Boolean(false);
            }
            return StepValue::Enum(inner.to_string());
        }
        if s.starts_with('(') && s.ends_with(')') {
            let inner = &s[1..s.len() - 1];
            return StepValue::List(Self::parse_values(inner));
        }
        if let Ok(i) = s.parse::<i64>() {
            return StepValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return StepValue::Real(f);
        }
        // Typed value like IFCBOOLEAN(.T.)
        if let Some(paren_pos) = s.find('(') {
            if s.ends_with(')') {
                let name = s[..paren_pos].trim().to_uppercase();
                let inner = &s[paren_pos + 1..s.len() - 1];
                return StepValue::Typed(name, Box::new(Self::parse_single_value(inner)));
            }
        }

        StepValue::String(s.to_string())
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    pub fn get_entity_mut(&mut self, id: u64) -> Option<&mut StepEntity> {
        self.entities.get_mut(&id)
    }

    /// Entities of one type in id order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.entities
            .values()
            .filter(|e| e.entity_type.eq_ignore_ascii_case(entity_type))
            .collect()
    }

    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.entities.last_key_value().map_or(1, |(id, _)| id + 1)
    }

    /// Appends a new entity under the next free id and returns that id.
    pub fn push_entity(&mut self, entity_type: &str, values: Vec<StepValue>) -> u64 {
        let id = self.next_id();
        self.entities
            .insert(id, StepEntity::new(id, entity_type, values));
        id
    }

    /// Serializes the file. Unmodified entities keep their source text.
    #[must_use]
    pub fn to_step_string(&self) -> String {
        let mut out = String::with_capacity(self.header.len() + self.entities.len() * 96);
        if self.header.is_empty() {
            out.push_str("ISO-10303-21;\nHEADER;\n");
            let _ = writeln!(out, "FILE_SCHEMA(('{}'));", self.schema);
            out.push_str("ENDSEC;\nDATA;");
        } else {
            out.push_str(&self.header);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        for entity in self.entities.values() {
            out.push_str(&entity.to_step());
            out.push('\n');
        }
        if self.trailer.is_empty() {
            out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        } else {
            out.push_str(&self.trailer);
        }
        out
    }
}

/// Byte ranges of `;`-terminated statements, ignoring `;` inside strings
/// and `/* */` comments. Ranges exclude the terminator.
fn split_statements(content: &str) -> Vec<(usize, usize)> {
    let mut statements = Vec::new();
    let bytes = content.as_bytes();
    let mut start = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                let close = content[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                if content[start..i].trim().is_empty() {
                    start = close;
                }
                i = close;
                continue;
            }
            b';' if !in_string => {
                statements.push((start, i));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    statements
}

/// Formats a REAL with the mandatory decimal point (`4000.`, `1.5E-09`).
fn format_real(value: f64) -> String {
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{mantissa}.")
            };
            format!("{mantissa}E{exponent}")
        }
        None => text,
    }
}

/// Encode a string for a STEP literal: apostrophes and backslashes are
/// doubled, non-ASCII characters use `\X2\XXXX\X0\`.
fn encode_step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut wide: Vec<u16> = Vec::new();

    let flush = |wide: &mut Vec<u16>, out: &mut String| {
        if wide.is_empty() {
            return;
        }
        out.push_str("\\X2\\");
        for unit in wide.drain(..) {
            let _ = write!(out, "{unit:04X}");
        }
        out.push_str("\\X0\\");
    };

    for ch in s.chars() {
        if ch.is_ascii() {
            flush(&mut wide, &mut out);
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        } else {
            let mut buf = [0u16; 2];
            wide.extend_from_slice(ch.encode_utf16(&mut buf));
        }
    }
    flush(&mut wide, &mut out);
    out
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - 2-byte Unicode (BMP), can have multiple 4-char hex codes
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\S\X` - single char shift into the upper half of ISO 8859-1
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next();
                    match chars.peek() {
                        Some('2') => {
                            chars.next(); // '2'
                            chars.next(); // '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // Skip \X0\
                            if chars.peek() == Some(&'\\') {
                                for _ in 0..4 {
                                    chars.next();
                                }
                            }
                            let units: Vec<u16> = hex
                                .as_bytes()
                                .chunks(4)
                                .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                                .filter_map(|h| u16::from_str_radix(h, 16).ok())
                                .collect();
                            result.extend(char::decode_utf16(units).filter_map(Result::ok));
                        }
                        Some('\\') => {
                            chars.next();
                            let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => {
                            result.push('\\');
                            result.push('X');
                        }
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Ok(byte) = u8::try_from(u32::from(c)) {
                            result.push(char::from(byte.wrapping_add(128)));
                        }
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            result.push('\'');
        } else {
            result.push(ch);
        }
    }

    result
}
