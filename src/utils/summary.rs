// src/utils/summary.rs: Per-sample summary files and their field records
use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use csv::{ReaderBuilder, StringRecord};
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::config::defs::MISSING_VALUE;
use crate::utils::file::read_text;

pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// A single measured value. Numbers keep their integer/float typing through to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(Number),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Coerces raw cell text: integers and finite floats become numbers, blanks become
    /// `Missing`, anything else is kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return FieldValue::Missing;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return FieldValue::Number(i.into());
        }
        if let Ok(u) = raw.parse::<u64>() {
            return FieldValue::Number(u.into());
        }
        match raw.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => FieldValue::Number(n),
            None => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Text form used by flat outputs, with `missing` standing in for absent values.
    pub fn render(&self, missing: &str) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Missing => missing.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(MISSING_VALUE))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v.into())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}


/// Ordered field -> value mapping for one sample from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryRecord {
    fields: FxIndexMap<String, FieldValue>,
}

impl SummaryRecord {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut fields = FxIndexMap::default();
        for (k, v) in pairs {
            fields.entry(k.into()).or_insert(v.into());
        }
        SummaryRecord { fields }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Restricts the record to `wanted`, in that order. Fields the record lacks are
    /// present in the result as `FieldValue::Missing` so every sample has the same shape.
    pub fn select<S: AsRef<str>>(&self, wanted: &[S]) -> SummaryRecord {
        let mut fields = FxIndexMap::default();
        for name in wanted {
            let name = name.as_ref();
            if fields.contains_key(name) {
                continue;
            }
            let value = self.fields.get(name).cloned().unwrap_or(FieldValue::Missing);
            fields.insert(name.to_string(), value);
        }
        SummaryRecord { fields }
    }

    // first value wins for repeated names
    fn insert_new(&mut self, field: &str, value: FieldValue) -> bool {
        if self.fields.contains_key(field) {
            return false;
        }
        self.fields.insert(field.to_string(), value);
        true
    }
}


/// Native table shape of a stage's summary files.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum SummaryLayout {
    /// Key/value when most rows are `field<TAB>value` pairs, otherwise a header + values table.
    #[default]
    Auto,
    /// One `field<TAB>value` row per field.
    KeyValue,
    /// Header row of field names followed by one row of values.
    Wide,
}


/// A parsed file plus whatever was skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedSummary {
    pub record: SummaryRecord,
    pub warnings: Vec<String>,
}

impl ParsedSummary {
    fn warn(&mut self, msg: String) {
        self.warnings.push(msg);
    }
}


/// Parses tab-delimited summary text.
///
/// # Arguments
///
/// * `text` - Full file contents.
/// * `layout` - Expected table shape.
///
/// # Returns
/// ParsedSummary: the record built from every usable row and one warning per skipped row.
pub fn parse_summary_text(text: &str, layout: SummaryLayout) -> ParsedSummary {
    let mut parsed = ParsedSummary::default();

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut rows: Vec<(u64, StringRecord)> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(row) => {
                if row.iter().all(|cell| cell.trim().is_empty()) {
                    continue;
                }
                let line = row.position().map(|p| p.line()).unwrap_or(idx as u64 + 1);
                rows.push((line, row));
            }
            Err(e) => parsed.warn(format!("unreadable row {}: {}", idx + 1, e)),
        }
    }

    if rows.is_empty() {
        parsed.warn("no data rows".to_string());
        return parsed;
    }

    let layout = match layout {
        SummaryLayout::Auto => detect_layout(&rows),
        other => other,
    };

    match layout {
        SummaryLayout::KeyValue | SummaryLayout::Auto => parse_key_value(&rows, &mut parsed),
        SummaryLayout::Wide => parse_wide(&rows, &mut parsed),
    }
    parsed
}

/// Key/value when at least half the rows have exactly two cells, so a stray title line or
/// a malformed row does not flip the whole file to a header table. Two rows of two cells
/// are a header over values only when the first row holds no numbers and the second only
/// numbers.
fn detect_layout(rows: &[(u64, StringRecord)]) -> SummaryLayout {
    let pairs = rows.iter().filter(|(_, row)| row.len() == 2).count();
    if pairs * 2 < rows.len() {
        return SummaryLayout::Wide;
    }
    match rows {
        [(_, header), (_, values)]
            if header.len() == 2
                && values.len() == 2
                && !header.iter().any(is_number)
                && values.iter().all(is_number) =>
        {
            SummaryLayout::Wide
        }
        _ => SummaryLayout::KeyValue,
    }
}

fn is_number(cell: &str) -> bool {
    matches!(FieldValue::parse(cell), FieldValue::Number(_))
}

fn parse_key_value(rows: &[(u64, StringRecord)], parsed: &mut ParsedSummary) {
    for (line, row) in rows {
        if row.len() != 2 {
            parsed.warn(format!("line {}: expected 2 columns, found {}", line, row.len()));
            continue;
        }
        let field = row[0].trim();
        if field.is_empty() {
            parsed.warn(format!("line {}: empty field name", line));
            continue;
        }
        if !parsed.record.insert_new(field, FieldValue::parse(&row[1])) {
            parsed.warn(format!("line {}: repeated field '{}' ignored", line, field));
        }
    }
}

fn parse_wide(rows: &[(u64, StringRecord)], parsed: &mut ParsedSummary) {
    let (header_line, header) = &rows[0];
    let mut data = rows[1..].iter();

    let values = loop {
        match data.next() {
            Some((line, row)) if row.len() == header.len() => break Some((line, row)),
            Some((line, row)) => parsed.warn(format!(
                "line {}: expected {} columns, found {}",
                line,
                header.len(),
                row.len()
            )),
            None => break None,
        }
    };
    let Some((_, values)) = values else {
        parsed.warn(format!("line {}: header has no matching value row", header_line));
        return;
    };

    for (field, value) in header.iter().zip(values.iter()) {
        let field = field.trim();
        if field.is_empty() {
            parsed.warn(format!("line {}: empty field name", header_line));
            continue;
        }
        if !parsed.record.insert_new(field, FieldValue::parse(value)) {
            parsed.warn(format!("line {}: repeated field '{}' ignored", header_line, field));
        }
    }

    let extra = data.count();
    if extra > 0 {
        parsed.warn(format!("{} extra value row(s) ignored", extra));
    }
}


/// Reads and parses one summary file. Read failures are not fatal: they come back as an
/// empty record carrying a warning. All warnings are logged against the file.
pub async fn parse_summary_file(path: &Path, layout: SummaryLayout) -> ParsedSummary {
    let parsed = match read_text(path).await {
        Ok(text) => parse_summary_text(&text, layout),
        Err(e) => ParsedSummary {
            record: SummaryRecord::default(),
            warnings: vec![e.to_string()],
        },
    };
    for w in &parsed.warnings {
        warn!("{}: {}", path.display(), w);
    }
    parsed
}
