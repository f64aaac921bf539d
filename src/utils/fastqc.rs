// src/utils/fastqc.rs: Reading FastQC result folders
use std::path::Path;

use log::warn;

use crate::config::defs::{
    FASTQC_BASIC_STATS, FASTQC_DATA_FILE, FASTQC_DEDUP_METRIC, FASTQC_MEAN_QUALITY_METRIC, FASTQC_METRICS,
    FASTQC_SUMMARY_FILE,
};
use crate::utils::file::read_text;
use crate::utils::summary::{FieldValue, FxIndexMap, ParsedSummary, SummaryRecord};

const MODULE_START: &str = ">>";
const MODULE_END: &str = ">>END_MODULE";
const BASIC_STATS_MODULE: &str = "Basic Statistics";
const PER_BASE_QUALITY_MODULE: &str = "Per base sequence quality";
const DUPLICATION_MODULE: &str = "Sequence Duplication Levels";

/// Contents of one fastqc_data.txt that the report uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FastqcData {
    /// Module name -> PASS/WARN/FAIL, as written in the `>>Module<TAB>status` lines.
    pub statuses: FxIndexMap<String, String>,
    pub basic_stats: FxIndexMap<String, FieldValue>,
    pub dedup_percentage: Option<FieldValue>,
    pub mean_base_quality: Option<f64>,
}


/// Parses summary.txt: `STATUS<TAB>Module<TAB>file` per line.
pub fn parse_fastqc_summary(text: &str) -> FxIndexMap<String, String> {
    let mut statuses = FxIndexMap::default();
    for line in text.lines() {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 2 || cols[0].trim().is_empty() {
            continue;
        }
        statuses
            .entry(cols[1].trim().to_string())
            .or_insert_with(|| cols[0].trim().to_uppercase());
    }
    statuses
}


/// Parses the module blocks of fastqc_data.txt.
///
/// # Arguments
///
/// * `text` - Full contents of fastqc_data.txt.
///
/// # Returns
/// FastqcData with module statuses, basic statistics, the total deduplicated percentage
/// and the mean over positions of the per-base mean quality.
pub fn parse_fastqc_data(text: &str) -> FastqcData {
    let mut data = FastqcData::default();
    let mut module: Option<String> = None;
    let mut quality_sum = 0.0;
    let mut quality_rows = 0usize;

    for line in text.lines() {
        if line.starts_with(MODULE_END) {
            module = None;
            continue;
        }
        if let Some(header) = line.strip_prefix(MODULE_START) {
            let mut cols = header.split('\t');
            let name = cols.next().unwrap_or_default().trim().to_string();
            if let Some(status) = cols.next() {
                data.statuses.insert(name.clone(), status.trim().to_uppercase());
            }
            module = Some(name);
            continue;
        }

        let Some(current) = module.as_deref() else {
            continue;
        };
        let cols: Vec<&str> = line.split('\t').collect();
        match current {
            BASIC_STATS_MODULE if !line.starts_with('#') && cols.len() >= 2 => {
                data.basic_stats
                    .insert(cols[0].trim().to_string(), FieldValue::parse(cols[1]));
            }
            DUPLICATION_MODULE if cols.len() >= 2 => {
                if cols[0].trim_start_matches('#').trim() == FASTQC_DEDUP_METRIC {
                    data.dedup_percentage = Some(FieldValue::parse(cols[1]));
                }
            }
            PER_BASE_QUALITY_MODULE if !line.starts_with('#') && cols.len() >= 2 => {
                if let Ok(mean) = cols[1].trim().parse::<f64>() {
                    quality_sum += mean;
                    quality_rows += 1;
                }
            }
            _ => {}
        }
    }

    if quality_rows > 0 {
        data.mean_base_quality = Some(quality_sum / quality_rows as f64);
    }
    data
}


/// Builds the fixed FastQC metric record for one `<sample>_fastqc` folder.
/// Absent files or measurements become `Missing` and are reported as warnings.
pub async fn read_fastqc_result(dir: &Path) -> ParsedSummary {
    let mut warnings = Vec::new();

    let summary = match read_text(&dir.join(FASTQC_SUMMARY_FILE)).await {
        Ok(text) => parse_fastqc_summary(&text),
        Err(e) => {
            warnings.push(e.to_string());
            FxIndexMap::default()
        }
    };
    let data = match read_text(&dir.join(FASTQC_DATA_FILE)).await {
        Ok(text) => parse_fastqc_data(&text),
        Err(e) => {
            warnings.push(e.to_string());
            FastqcData::default()
        }
    };

    let mut pairs: Vec<(String, FieldValue)> = Vec::new();
    for stat in FASTQC_BASIC_STATS {
        if let Some(v) = data.basic_stats.get(*stat) {
            pairs.push((stat.to_string(), v.clone()));
        }
    }
    if let Some(dedup) = &data.dedup_percentage {
        pairs.push((FASTQC_DEDUP_METRIC.to_string(), dedup.clone()));
    }
    if let Some(mean) = data.mean_base_quality {
        // two decimals
        let rounded = (mean * 100.0).round() / 100.0;
        pairs.push((FASTQC_MEAN_QUALITY_METRIC.to_string(), FieldValue::parse(&rounded.to_string())));
    }
    // summary.txt wins; fall back to the status in the data file header
    for (module, status) in data.statuses.iter() {
        let status = summary.get(module).unwrap_or(status);
        pairs.push((module.clone(), FieldValue::Text(status.clone())));
    }
    for (module, status) in summary.iter() {
        if !data.statuses.contains_key(module) {
            pairs.push((module.clone(), FieldValue::Text(status.clone())));
        }
    }

    let record = SummaryRecord::from_pairs(pairs).select(FASTQC_METRICS.as_slice());
    let absent: Vec<&str> = record
        .iter()
        .filter(|(_, v)| v.is_missing())
        .map(|(k, _)| k)
        .collect();
    if !absent.is_empty() && absent.len() < record.len() {
        warnings.push(format!("no value for {}", absent.join(", ")));
    }

    for w in &warnings {
        warn!("{}: {}", dir.display(), w);
    }
    ParsedSummary { record, warnings }
}
