use std::io;
use std::path::PathBuf;

use lazy_static::lazy_static;
use log::LevelFilter;
use thiserror::Error;

use crate::cli::Arguments;

// Report modules
pub const PREPROCESS_TAG: &str = "preprocess_report";
pub const KO_ASSIGNMENT_TAG: &str = "ko_assignment_report";
pub const JSON_TAG: &str = "json_report";
pub const TSV_TAG: &str = "tsv_report";
pub const FASTQC_TAG: &str = "fastqc_report";

// Stage file naming
pub const ILLQC_PREFIX: &str = "summary-illqc_";
pub const DECONTAM_PREFIX: &str = "summary-decontam_";
pub const PATHWAY_PREFIX: &str = "summary-pathway_";
pub const GZIP_EXT: &str = "gz";

// FastQC layout
pub const FASTQC_DIR_SUFFIX: &str = "_fastqc";
pub const FASTQC_SUMMARY_FILE: &str = "summary.txt";
pub const FASTQC_DATA_FILE: &str = "fastqc_data.txt";
pub const BEFORE_TRIM_DIR: &str = "before_trim";
pub const AFTER_TRIM_DIR: &str = "after_trim";
pub const FASTQC_OUTPUT_BASE: &str = "fastqc";
pub const BEFORE_TRIM_LABEL: &str = "before";
pub const AFTER_TRIM_LABEL: &str = "after";

// Output
pub const SAMPLE_ID_COLUMN: &str = "SampleID";
pub const MISSING_VALUE: &str = "";
pub const TSV_EXT: &str = "tsv";

pub const ILLQC_FIELDS: &[&str] = &["input", "both kept", "rev only", "dropped", "fwd only"];
pub const DECONTAM_FIELDS: &[&str] = &["true", "false"];
pub const KO_DECONTAM_FIELDS: &[&str] = &["true"];
pub const PATHWAY_FIELDS: &[&str] = &[
    "ko_hits",
    "mapped_sequences",
    "unique_prot_hits",
    "unique_ko_hits",
    "mapped_sequences_evalue",
];

/// FastQC modules reported by status, in report column order.
pub const FASTQC_MODULES: &[&str] = &[
    "Basic Statistics",
    "Per base sequence quality",
    "Per tile sequence quality",
    "Per sequence quality scores",
    "Per base sequence content",
    "Per sequence GC content",
    "Per base N content",
    "Sequence Length Distribution",
    "Sequence Duplication Levels",
    "Overrepresented sequences",
    "Adapter Content",
];

/// Basic statistics pulled out of fastqc_data.txt, in report column order.
pub const FASTQC_BASIC_STATS: &[&str] = &[
    "Total Sequences",
    "Sequences flagged as poor quality",
    "Sequence length",
    "%GC",
];
pub const FASTQC_DEDUP_METRIC: &str = "Total Deduplicated Percentage";
pub const FASTQC_MEAN_QUALITY_METRIC: &str = "Mean per-base quality";

lazy_static! {
    /// Full FastQC column set: basic stats, the two derived metrics, then module statuses.
    pub static ref FASTQC_METRICS: Vec<&'static str> = {
        let mut v: Vec<&'static str> = Vec::new();
        v.extend_from_slice(FASTQC_BASIC_STATS);
        v.push(FASTQC_DEDUP_METRIC);
        v.push(FASTQC_MEAN_QUALITY_METRIC);
        v.extend_from_slice(FASTQC_MODULES);
        v
    };
}


pub struct RunConfig {
    pub cwd: PathBuf,
    pub args: Arguments,
    pub log_level: LevelFilter,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("input directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("output location is not writable: {}", .0.display())]
    OutputNotWritable(PathBuf),
    #[error("sample '{sample}' matched twice in {}: {} and {}", .dir.display(), .first.display(), .second.display())]
    DuplicateSample {
        sample: String,
        dir: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("conflicting '{label}' entries for sample '{sample}'")]
    ConflictingEntry { sample: String, label: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{} phase(s) failed: {}", .0.len(), .0.join("; "))]
    PhaseFailures(Vec<String>),
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReportError::Io { path: path.into(), source }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastqc_metric_order() {
        assert_eq!(FASTQC_METRICS.len(), FASTQC_BASIC_STATS.len() + 2 + FASTQC_MODULES.len());
        assert_eq!(&FASTQC_METRICS[..4], FASTQC_BASIC_STATS);
        assert_eq!(FASTQC_METRICS[4], FASTQC_DEDUP_METRIC);
        assert_eq!(FASTQC_METRICS[5], FASTQC_MEAN_QUALITY_METRIC);
        assert_eq!(&FASTQC_METRICS[6..], FASTQC_MODULES);
    }
}
