/// Flat TSV report over one directory/suffix convention
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use log::info;

use crate::config::defs::{ReportError, RunConfig, TSV_TAG};
use crate::reports::{required_arg, FlatTable, Report};
use crate::utils::discovery::{discover_samples, NameMatch};
use crate::utils::file::{check_output_path, resolve_path};
use crate::utils::summary::{parse_summary_file, SummaryLayout};


/// Parses every `<sample><suffix>` file in `dir` into one table row.
///
/// # Arguments
///
/// * `dir` - Directory holding the per-sample files.
/// * `suffix` - Literal file name suffix; what precedes it is the SampleID.
/// * `layout` - Table shape of the files.
///
/// # Returns
/// FlatTable with rows in discovery order and the first-seen union of fields as columns.
/// Files that cannot be parsed still get a row, with every cell missing.
pub async fn build_tsv_table(dir: &Path, suffix: &str, layout: SummaryLayout) -> Result<FlatTable, ReportError> {
    let files = discover_samples(dir, &NameMatch::Suffix(suffix.to_string())).await?;
    let parsed = join_all(files.iter().map(|f| parse_summary_file(&f.path, layout))).await;

    let rows = files
        .into_iter()
        .zip(parsed)
        .map(|(file, summary)| (file.sample_id, summary.record))
        .collect();
    let table = FlatTable::from_rows(rows);
    info!("TSV table: {} sample(s), {} column(s)", table.rows.len(), table.columns.len());
    Ok(table)
}


pub async fn write_tsv_report(
    dir: &Path,
    suffix: &str,
    layout: SummaryLayout,
    output: &Path,
    missing: &str,
) -> Result<(), ReportError> {
    check_output_path(output).await?;
    let table = build_tsv_table(dir, suffix, layout).await?;
    Report::Tsv { table, missing: missing.to_string() }.write(output).await
}


pub async fn run(run_config: Arc<RunConfig>) -> Result<(), ReportError> {
    println!("\n-------------\n TSV Report\n-------------\n");
    let args = &run_config.args;
    let input_dir = resolve_path(required_arg(&args.input_dir, "--input-dir", TSV_TAG)?, &run_config.cwd);
    let suffix = required_arg(&args.input_suffix, "--input-suffix", TSV_TAG)?;
    let output = resolve_path(required_arg(&args.output_fp, "--output-fp", TSV_TAG)?, &run_config.cwd);

    write_tsv_report(&input_dir, suffix, args.layout, &output, &args.missing_value).await
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_build_tsv_table() -> anyhow::Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("S2_stats.tsv"), "reads\tbases\tnote\n10\t1500\tok\n")?;
        std::fs::write(dir.path().join("S1_stats.tsv"), "reads\tgc\n20\t0.41\n")?;
        std::fs::write(dir.path().join("S3_stats.tsv"), "")?;
        std::fs::write(dir.path().join("ignored.txt"), "reads\t1\n")?;

        let table = build_tsv_table(dir.path(), "_stats.tsv", SummaryLayout::Auto).await?;
        let samples: Vec<&str> = table.rows.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(samples, vec!["S1", "S2", "S3"]);
        assert_eq!(table.columns, vec!["reads", "gc", "bases", "note"]);
        assert!(table.cell(2, "reads").is_missing());
        Ok(())
    }
}
