/// Before/after-trim FastQC summaries
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use log::{error, info};

use crate::config::defs::{
    ReportError, RunConfig, AFTER_TRIM_LABEL, BEFORE_TRIM_LABEL, FASTQC_DIR_SUFFIX, FASTQC_METRICS, FASTQC_MODULES,
    FASTQC_TAG, TSV_EXT,
};
use crate::reports::{required_arg, FlatTable, Report};
use crate::utils::aggregate::SampleId;
use crate::utils::discovery::{discover_entries, EntryKind, NameMatch};
use crate::utils::fastqc::read_fastqc_result;
use crate::utils::file::resolve_path;
use crate::utils::summary::{FieldValue, SummaryRecord};

/// A trim phase: where its FastQC folders live and how its report is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqcPhase {
    pub label: String,
    pub subfolder: String,
}

impl FastqcPhase {
    pub fn before(subfolder: &str) -> Self {
        FastqcPhase { label: BEFORE_TRIM_LABEL.to_string(), subfolder: subfolder.to_string() }
    }

    pub fn after(subfolder: &str) -> Self {
        FastqcPhase { label: AFTER_TRIM_LABEL.to_string(), subfolder: subfolder.to_string() }
    }

    /// `<output_dir>/<base>-<label>.tsv`
    pub fn output_path(&self, output_dir: &Path, base: &str) -> PathBuf {
        output_dir.join(format!("{}-{}.{}", base, self.label, TSV_EXT))
    }
}

/// One measurement for one sample in one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct FastqcMetric {
    pub sample_id: SampleId,
    pub phase: String,
    pub name: String,
    pub value: FieldValue,
}

/// All samples of one phase, each with the fixed metric record.
#[derive(Debug, Clone, PartialEq)]
pub struct FastqcPhaseReport {
    pub phase: FastqcPhase,
    pub samples: Vec<(SampleId, SummaryRecord)>,
}

impl FastqcPhaseReport {
    pub fn to_table(&self) -> FlatTable {
        FlatTable::with_columns(FASTQC_METRICS.as_slice(), self.samples.clone())
    }

    pub fn metrics(&self) -> impl Iterator<Item = FastqcMetric> + '_ {
        self.samples.iter().flat_map(move |(sample, record)| {
            record.iter().map(move |(name, value)| FastqcMetric {
                sample_id: sample.clone(),
                phase: self.phase.label.clone(),
                name: name.to_string(),
                value: value.clone(),
            })
        })
    }

    /// Number of module calls with the given status (PASS/WARN/FAIL) across samples.
    pub fn status_count(&self, status: &str) -> usize {
        self.metrics()
            .filter(|m| FASTQC_MODULES.contains(&m.name.as_str()))
            .filter(|m| matches!(&m.value, FieldValue::Text(s) if s == status))
            .count()
    }
}


/// Reads every `<sample>_fastqc` folder under `<input_dir>/<phase subfolder>`.
pub async fn collect_phase(input_dir: &Path, phase: &FastqcPhase) -> Result<FastqcPhaseReport, ReportError> {
    let phase_dir = input_dir.join(&phase.subfolder);
    let name_match = NameMatch::Suffix(FASTQC_DIR_SUFFIX.to_string());
    let folders = discover_entries(&phase_dir, &name_match, EntryKind::Dir).await?;

    let parsed = join_all(folders.iter().map(|f| read_fastqc_result(&f.path))).await;
    let samples = folders
        .into_iter()
        .zip(parsed)
        .map(|(folder, result)| (folder.sample_id, result.record))
        .collect();
    Ok(FastqcPhaseReport { phase: phase.clone(), samples })
}


async fn write_phase(
    input_dir: &Path,
    phase: &FastqcPhase,
    output_dir: &Path,
    base: &str,
    missing: &str,
) -> Result<PathBuf, ReportError> {
    let report = collect_phase(input_dir, phase).await?;
    info!(
        "FastQC {}: {} sample(s), {} FAIL / {} WARN module calls",
        phase.label,
        report.samples.len(),
        report.status_count("FAIL"),
        report.status_count("WARN")
    );
    let output = phase.output_path(output_dir, base);
    Report::Fastqc { phase: report, missing: missing.to_string() }.write(&output).await?;
    Ok(output)
}


/// Writes one report per phase. The output directory is created first; a phase that
/// fails does not stop the others, and all failures are returned together afterwards.
///
/// # Arguments
///
/// * `input_dir` - Root holding one subfolder per phase.
/// * `phases` - Phases to report, in order.
/// * `output_dir` - Destination directory.
/// * `base` - Base name for the report files.
/// * `missing` - Text for absent metrics.
///
/// # Returns
/// Paths of the reports written.
pub async fn write_fastqc_reports(
    input_dir: &Path,
    phases: &[FastqcPhase],
    output_dir: &Path,
    base: &str,
    missing: &str,
) -> Result<Vec<PathBuf>, ReportError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ReportError::io(output_dir, e))?;

    let mut written = Vec::new();
    let mut failures = Vec::new();
    for phase in phases {
        match write_phase(input_dir, phase, output_dir, base, missing).await {
            Ok(path) => written.push(path),
            Err(e) => {
                error!("FastQC {} report failed: {}", phase.label, e);
                failures.push(format!("{}: {}", phase.label, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(ReportError::PhaseFailures(failures))
    }
}


pub async fn run(run_config: Arc<RunConfig>) -> Result<(), ReportError> {
    println!("\n-------------\n FastQC Report\n-------------\n");
    let args = &run_config.args;
    let input_dir = resolve_path(required_arg(&args.input_dir, "--input-dir", FASTQC_TAG)?, &run_config.cwd);
    let output_dir = resolve_path(required_arg(&args.output_dir, "--output-dir", FASTQC_TAG)?, &run_config.cwd);

    let phases = [
        FastqcPhase::before(&args.before_trim_subfolder_dir),
        FastqcPhase::after(&args.after_trim_subfolder_dir),
    ];
    write_fastqc_reports(&input_dir, &phases, &output_dir, &args.output_base, &args.missing_value).await?;
    Ok(())
}
