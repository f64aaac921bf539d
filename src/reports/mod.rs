pub mod json;
pub mod tsv;
pub mod fastqc;

use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use log::info;

use crate::config::defs::{ReportError, SAMPLE_ID_COLUMN};
use crate::utils::aggregate::{AggregateReport, FieldName, SampleId};
use crate::utils::file::write_atomic;
use crate::utils::summary::{FieldValue, SummaryRecord};

use self::fastqc::FastqcPhaseReport;

static MISSING: FieldValue = FieldValue::Missing;

/// One row per sample, one column per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<FieldName>,
    pub rows: Vec<(SampleId, SummaryRecord)>,
}

impl FlatTable {
    /// Columns are the union of every row's fields, in the order they were first seen.
    /// A field named like the key column is left out; the key column already carries it.
    pub fn from_rows(rows: Vec<(SampleId, SummaryRecord)>) -> Self {
        let mut columns: Vec<FieldName> = Vec::new();
        for (_, record) in &rows {
            for name in record.field_names() {
                if name != SAMPLE_ID_COLUMN && !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        FlatTable { columns, rows }
    }

    /// Table with a fixed column set; fields outside it are dropped.
    pub fn with_columns<S: AsRef<str>>(columns: &[S], rows: Vec<(SampleId, SummaryRecord)>) -> Self {
        FlatTable {
            columns: columns
                .iter()
                .map(AsRef::<str>::as_ref)
                .filter(|c| *c != SAMPLE_ID_COLUMN)
                .map(str::to_string)
                .collect(),
            rows,
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> &FieldValue {
        self.rows
            .get(row)
            .and_then(|(_, record)| record.get(column))
            .unwrap_or(&MISSING)
    }
}


/// The output shapes. Each variant carries the intermediate data it serializes and
/// nothing else.
#[derive(Debug, Clone)]
pub enum Report {
    /// Merged sample -> source -> field JSON.
    Json { aggregate: AggregateReport, alphabetize: bool },
    /// Flat tab-separated table.
    Tsv { table: FlatTable, missing: String },
    /// One trim phase of FastQC results over the fixed metric columns.
    Fastqc { phase: FastqcPhaseReport, missing: String },
}

impl Report {
    pub fn render(&self) -> Result<Vec<u8>, ReportError> {
        match self {
            Report::Json { aggregate, alphabetize } => {
                let json = if *alphabetize {
                    aggregate.alphabetized().to_json_pretty()?
                } else {
                    aggregate.to_json_pretty()?
                };
                Ok(json.into_bytes())
            }
            Report::Tsv { table, missing } => render_tsv(table, missing),
            Report::Fastqc { phase, missing } => render_tsv(&phase.to_table(), missing),
        }
    }

    /// Renders fully in memory, then replaces `path` atomically.
    pub async fn write(&self, path: &Path) -> Result<(), ReportError> {
        let bytes = self.render()?;
        write_atomic(path, bytes).await?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Unwraps an option the chosen module cannot run without.
pub(crate) fn required_arg<'a>(value: &'a Option<String>, flag: &str, module: &str) -> Result<&'a str, ReportError> {
    value
        .as_deref()
        .ok_or_else(|| ReportError::InvalidConfig(format!("{} is required for {}", flag, module)))
}

fn render_tsv(table: &FlatTable, missing: &str) -> Result<Vec<u8>, ReportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(SAMPLE_ID_COLUMN.to_string());
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for (sample, record) in &table.rows {
        let mut row = Vec::with_capacity(header.len());
        row.push(sample.clone());
        for column in &table.columns {
            let value = record.get(column).unwrap_or(&MISSING);
            row.push(value.render(missing));
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::InvalidConfig(format!("TSV buffer flush failed: {}", e)))
}
