// src/utils/aggregate.rs: Merging per-stage summaries into one report keyed by sample
use std::path::PathBuf;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::defs::ReportError;
use crate::utils::discovery::{discover_samples, NameMatch};
use crate::utils::file::require_dir;
use crate::utils::summary::{parse_summary_file, FxIndexMap, SummaryLayout, SummaryRecord};

pub type SampleId = String;
pub type SourceLabel = String;
pub type FieldName = String;


/// One stage's contribution to a merged report.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub dir: PathBuf,
    pub name_match: NameMatch,
    pub fields: Vec<FieldName>,
    pub label: SourceLabel,
    pub layout: SummaryLayout,
}

impl SourceSpec {
    /// Source whose files are named `<prefix><sample>.<ext>`. The label is taken from the
    /// prefix (`summary-illqc_` gives `illqc`).
    pub fn with_prefix<S: AsRef<str>>(dir: impl Into<PathBuf>, prefix: &str, fields: &[S]) -> Self {
        SourceSpec {
            dir: dir.into(),
            name_match: NameMatch::Prefix(prefix.to_string()),
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            label: label_from_prefix(prefix),
            layout: SummaryLayout::default(),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn layout(mut self, layout: SummaryLayout) -> Self {
        self.layout = layout;
        self
    }
}


/// Stage name embedded in a file prefix: surrounding punctuation is dropped and only
/// the part after the last '-' is kept.
pub fn label_from_prefix(prefix: &str) -> SourceLabel {
    let trimmed = prefix.trim_matches(|c: char| !c.is_alphanumeric());
    let stage = trimmed.rsplit('-').next().unwrap_or(trimmed);
    if stage.is_empty() {
        prefix.to_string()
    } else {
        stage.to_string()
    }
}


/// Sample -> source label -> selected fields. Samples iterate in the order they were
/// first merged in; labels in the order their sources were merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateReport {
    samples: FxIndexMap<SampleId, FxIndexMap<SourceLabel, SummaryRecord>>,
}

impl AggregateReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one (sample, source) entry. Re-inserting an identical entry is a no-op;
    /// a different record under an existing (sample, label) is a conflict.
    pub fn insert(&mut self, sample: &str, label: &str, record: SummaryRecord) -> Result<(), ReportError> {
        let sources = self.samples.entry(sample.to_string()).or_default();
        match sources.get(label) {
            Some(existing) if *existing == record => {
                debug!("Entry {}/{} already present", sample, label);
                Ok(())
            }
            Some(_) => Err(ReportError::ConflictingEntry {
                sample: sample.to_string(),
                label: label.to_string(),
            }),
            None => {
                sources.insert(label.to_string(), record);
                Ok(())
            }
        }
    }

    pub fn get(&self, sample: &str, label: &str) -> Option<&SummaryRecord> {
        self.samples.get(sample).and_then(|sources| sources.get(label))
    }

    pub fn sources(&self, sample: &str) -> Option<impl Iterator<Item = (&str, &SummaryRecord)>> {
        self.samples
            .get(sample)
            .map(|sources| sources.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn sample_ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy with samples in alphabetical order; source order within a sample is kept.
    pub fn alphabetized(&self) -> AggregateReport {
        let mut samples = self.samples.clone();
        samples.sort_keys();
        AggregateReport { samples }
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Discovers, parses and selects one source's files, then folds them in.
    ///
    /// # Arguments
    ///
    /// * `source` - Directory, naming convention and fields for the stage.
    ///
    /// # Returns
    /// Number of samples the source contributed.
    pub async fn merge_source(&mut self, source: &SourceSpec) -> Result<usize, ReportError> {
        let files = discover_samples(&source.dir, &source.name_match).await?;

        // parse concurrently, fold in discovery order
        let parsed = join_all(files.iter().map(|f| parse_summary_file(&f.path, source.layout))).await;

        let mut contributed = 0;
        for (file, summary) in files.iter().zip(parsed) {
            if summary.record.is_empty() {
                warn!(
                    "No usable fields in {}; sample {} gets no '{}' entry",
                    file.path.display(),
                    file.sample_id,
                    source.label
                );
                continue;
            }
            let selected = summary.record.select(&source.fields);
            self.insert(&file.sample_id, &source.label, selected)?;
            contributed += 1;
        }
        info!("Merged {} sample(s) from source '{}'", contributed, source.label);
        Ok(contributed)
    }
}


/// Builds the merged report from sources in the given order. Every source directory is
/// checked before any file is read.
pub async fn merge_sources(sources: &[SourceSpec]) -> Result<AggregateReport, ReportError> {
    for source in sources {
        require_dir(&source.dir).await?;
    }

    let mut report = AggregateReport::new();
    for source in sources {
        report.merge_source(source).await?;
    }
    info!("Merged report holds {} sample(s)", report.len());
    Ok(report)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::summary::FieldValue;

    #[test]
    fn test_label_from_prefix() {
        assert_eq!(label_from_prefix("summary-illqc_"), "illqc");
        assert_eq!(label_from_prefix("summary-decontam_"), "decontam");
        assert_eq!(label_from_prefix("pathway_"), "pathway");
        assert_eq!(label_from_prefix("__"), "__");
    }

    #[test]
    fn test_insert_union_and_order() -> anyhow::Result<()> {
        let mut report = AggregateReport::new();
        report.insert("S2", "illqc", SummaryRecord::from_pairs([("input", FieldValue::from(1_i64))]))?;
        report.insert("S1", "illqc", SummaryRecord::from_pairs([("input", FieldValue::from(2_i64))]))?;
        report.insert("S2", "decontam", SummaryRecord::from_pairs([("true", FieldValue::from(3_i64))]))?;

        assert_eq!(report.sample_ids().collect::<Vec<_>>(), vec!["S2", "S1"]);
        let labels: Vec<&str> = report.sources("S2").into_iter().flatten().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["illqc", "decontam"]);
        assert_eq!(report.alphabetized().sample_ids().collect::<Vec<_>>(), vec!["S1", "S2"]);
        Ok(())
    }

    #[test]
    fn test_insert_identical_is_noop_and_conflict_errors() -> anyhow::Result<()> {
        let mut report = AggregateReport::new();
        let rec = SummaryRecord::from_pairs([("input", FieldValue::from(1_i64))]);
        report.insert("S1", "illqc", rec.clone())?;
        report.insert("S1", "illqc", rec)?;
        assert_eq!(report.len(), 1);

        let other = SummaryRecord::from_pairs([("input", FieldValue::from(9_i64))]);
        assert!(matches!(
            report.insert("S1", "illqc", other),
            Err(ReportError::ConflictingEntry { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_json_shape() -> anyhow::Result<()> {
        let mut report = AggregateReport::new();
        report.insert(
            "S1",
            "illqc",
            SummaryRecord::from_pairs([("input", FieldValue::from(100_i64)), ("rev only", FieldValue::Missing)]),
        )?;
        let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty()?)?;
        assert_eq!(value, serde_json::json!({"S1": {"illqc": {"input": 100, "rev only": null}}}));
        Ok(())
    }
}
