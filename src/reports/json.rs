/// Merged JSON reports: preprocessing, KO assignment and caller-defined source lists
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::cli::Arguments;
use crate::config::defs::{
    ReportError, RunConfig, DECONTAM_FIELDS, ILLQC_FIELDS, JSON_TAG, KO_ASSIGNMENT_TAG, KO_DECONTAM_FIELDS,
    PATHWAY_FIELDS, PREPROCESS_TAG,
};
use crate::reports::{required_arg, Report};
use crate::utils::aggregate::{merge_sources, SourceSpec};
use crate::utils::file::{check_output_path, resolve_path};


/// Merges `sources` and writes the JSON report to `output`.
///
/// # Arguments
///
/// * `sources` - Stage sources in merge order.
/// * `output` - Report file; replaced if it exists.
/// * `alphabetize` - Sort samples by name instead of first-seen order.
pub async fn write_json_report(sources: &[SourceSpec], output: &Path, alphabetize: bool) -> Result<(), ReportError> {
    check_output_path(output).await?;
    let aggregate = merge_sources(sources).await?;
    Report::Json { aggregate, alphabetize }.write(output).await
}


/// illqc read counts next to decontamination counts.
pub fn preprocess_sources(args: &Arguments, cwd: &Path) -> Result<Vec<SourceSpec>, ReportError> {
    let illqc_dir = required_arg(&args.illqc_dir, "--illqc-dir", PREPROCESS_TAG)?;
    let decontam_dir = required_arg(&args.decontam_dir, "--decontam-dir", PREPROCESS_TAG)?;
    Ok(vec![
        SourceSpec::with_prefix(resolve_path(illqc_dir, cwd), &args.illqc_prefix, ILLQC_FIELDS).layout(args.layout),
        SourceSpec::with_prefix(resolve_path(decontam_dir, cwd), &args.decontam_prefix, DECONTAM_FIELDS)
            .layout(args.layout),
    ])
}


/// Host-depleted read counts next to pathway/KO assignment counts.
pub fn ko_assignment_sources(args: &Arguments, cwd: &Path) -> Result<Vec<SourceSpec>, ReportError> {
    let decontam_dir = required_arg(&args.decontam_dir, "--decontam-dir", KO_ASSIGNMENT_TAG)?;
    let pathway_dir = required_arg(&args.pathway_dir, "--pathway-dir", KO_ASSIGNMENT_TAG)?;
    Ok(vec![
        SourceSpec::with_prefix(resolve_path(decontam_dir, cwd), &args.decontam_prefix, KO_DECONTAM_FIELDS)
            .layout(args.layout),
        SourceSpec::with_prefix(resolve_path(pathway_dir, cwd), &args.pathway_prefix, PATHWAY_FIELDS)
            .layout(args.layout),
    ])
}


/// Sources given as repeated `--source DIR PREFIX FIELDS` triples.
pub fn custom_sources(args: &Arguments, cwd: &Path) -> Result<Vec<SourceSpec>, ReportError> {
    if args.source.is_empty() || args.source.len() % 3 != 0 {
        return Err(ReportError::InvalidConfig(format!(
            "{} needs one or more --source DIR PREFIX FIELDS triples",
            JSON_TAG
        )));
    }

    args.source
        .chunks_exact(3)
        .map(|triple| {
            let fields: Vec<&str> = triple[2]
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            if fields.is_empty() {
                return Err(ReportError::InvalidConfig(format!(
                    "no fields given for source {} {}",
                    triple[0], triple[1]
                )));
            }
            Ok(SourceSpec::with_prefix(resolve_path(&triple[0], cwd), &triple[1], &fields).layout(args.layout))
        })
        .collect()
}


async fn run_with(run_config: Arc<RunConfig>, sources: Vec<SourceSpec>) -> Result<(), ReportError> {
    let args = &run_config.args;
    let output = resolve_path(required_arg(&args.output_fp, "--output-fp", &args.module)?, &run_config.cwd);
    for s in &sources {
        info!("Source '{}': {} ({}), fields {:?}", s.label, s.dir.display(), s.name_match, s.fields);
    }
    write_json_report(&sources, &output, args.sort_samples).await
}

pub async fn run_preprocess(run_config: Arc<RunConfig>) -> Result<(), ReportError> {
    println!("\n-------------\n Preprocess Report\n-------------\n");
    let sources = preprocess_sources(&run_config.args, &run_config.cwd)?;
    run_with(run_config, sources).await
}

pub async fn run_ko_assignment(run_config: Arc<RunConfig>) -> Result<(), ReportError> {
    println!("\n-------------\n KO Assignment Report\n-------------\n");
    let sources = ko_assignment_sources(&run_config.args, &run_config.cwd)?;
    run_with(run_config, sources).await
}

pub async fn run_custom(run_config: Arc<RunConfig>) -> Result<(), ReportError> {
    println!("\n-------------\n JSON Report\n-------------\n");
    let sources = custom_sources(&run_config.args, &run_config.cwd)?;
    run_with(run_config, sources).await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::summary::SummaryLayout;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_preprocess_sources_defaults() -> anyhow::Result<()> {
        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "preprocess_report",
            "--illqc-dir", "qc", "--decontam-dir", "/abs/decontam", "-o", "out.json",
        ])?;
        let sources = preprocess_sources(&args, Path::new("/run"))?;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].label, "illqc");
        assert_eq!(sources[0].dir, PathBuf::from("/run/qc"));
        assert_eq!(sources[0].fields, ILLQC_FIELDS);
        assert_eq!(sources[1].label, "decontam");
        assert_eq!(sources[1].dir, PathBuf::from("/abs/decontam"));
        Ok(())
    }

    #[test]
    fn test_ko_sources_order() -> anyhow::Result<()> {
        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "ko_assignment_report",
            "--pathway-dir", "p", "--decontam-dir", "d", "-o", "out.json",
        ])?;
        let sources = ko_assignment_sources(&args, Path::new("/run"))?;
        let labels: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["decontam", "pathway"]);
        assert_eq!(sources[0].fields, KO_DECONTAM_FIELDS);
        Ok(())
    }

    #[test]
    fn test_missing_dir_argument() -> anyhow::Result<()> {
        let args = Arguments::try_parse_from(["seqtoid-reports", "-m", "preprocess_report", "--illqc-dir", "qc"])?;
        assert!(matches!(preprocess_sources(&args, Path::new("/run")), Err(ReportError::InvalidConfig(_))));
        Ok(())
    }

    #[test]
    fn test_layout_reaches_sources() -> anyhow::Result<()> {
        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "preprocess_report",
            "--illqc-dir", "qc", "--decontam-dir", "d", "--layout", "key-value",
        ])?;
        let sources = preprocess_sources(&args, Path::new("/run"))?;
        assert!(sources.iter().all(|s| s.layout == SummaryLayout::KeyValue));

        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "ko_assignment_report",
            "--pathway-dir", "p", "--decontam-dir", "d", "--layout", "wide",
        ])?;
        let sources = ko_assignment_sources(&args, Path::new("/run"))?;
        assert!(sources.iter().all(|s| s.layout == SummaryLayout::Wide));

        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "json_report", "--source", "a", "p_", "x", "--layout", "wide",
        ])?;
        assert_eq!(custom_sources(&args, Path::new("/run"))?[0].layout, SummaryLayout::Wide);

        let args = Arguments::try_parse_from(["seqtoid-reports", "-m", "json_report", "--source", "a", "p_", "x"])?;
        assert_eq!(custom_sources(&args, Path::new("/run"))?[0].layout, SummaryLayout::Auto);
        Ok(())
    }

    #[test]
    fn test_custom_sources() -> anyhow::Result<()> {
        let args = Arguments::try_parse_from([
            "seqtoid-reports", "-m", "json_report",
            "--source", "a", "summary-illqc_", "input, dropped",
            "--source", "b", "summary-decontam_", "true",
        ])?;
        let sources = custom_sources(&args, Path::new("/run"))?;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].fields, vec!["input", "dropped"]);
        assert_eq!(sources[1].label, "decontam");

        let args = Arguments::try_parse_from(["seqtoid-reports", "-m", "json_report", "--source", "a", "p_", ","])?;
        assert!(custom_sources(&args, Path::new("/run")).is_err());
        Ok(())
    }
}
