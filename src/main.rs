use std::env;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{error, info, LevelFilter};

use seqtoid_reports::cli::parse;
use seqtoid_reports::config::defs::{
    ReportError, RunConfig, FASTQC_TAG, JSON_TAG, KO_ASSIGNMENT_TAG, PREPROCESS_TAG, TSV_TAG,
};
use seqtoid_reports::reports::{fastqc, json, tsv};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n SeqToID Reports\n-------------\n");

    let cwd = env::current_dir()?;
    info!("The current directory is {:?}", cwd);

    let module = args.module.clone();
    let run_config = Arc::new(RunConfig {
        cwd,
        args,
        log_level,
    });

    if let Err(e) = match module.as_str() {
        PREPROCESS_TAG => json::run_preprocess(run_config).await,
        KO_ASSIGNMENT_TAG => json::run_ko_assignment(run_config).await,
        JSON_TAG => json::run_custom(run_config).await,
        TSV_TAG => tsv::run(run_config).await,
        FASTQC_TAG => fastqc::run(run_config).await,
        _ => Err(ReportError::InvalidConfig(format!("Invalid module: {}", module))),
    } {
        error!("Report failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}
