use clap::Parser;

use crate::config::defs::{
    AFTER_TRIM_DIR, BEFORE_TRIM_DIR, DECONTAM_PREFIX, FASTQC_OUTPUT_BASE, ILLQC_PREFIX, PATHWAY_PREFIX,
};
use crate::utils::summary::SummaryLayout;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "seqtoid-reports", version, about = "Cross-sample reports from per-sample pipeline summaries")]
pub struct Arguments {

    #[arg(short, long, help = "Report to build: preprocess_report, ko_assignment_report, json_report, tsv_report or fastqc_report")]
    pub module: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    // Merged JSON reports
    #[arg(long, help = "Directory for illqc summary files")]
    pub illqc_dir: Option<String>,

    #[arg(long, help = "Directory for decontamination summary files")]
    pub decontam_dir: Option<String>,

    #[arg(long, help = "Directory for pathfinder summary files")]
    pub pathway_dir: Option<String>,

    #[arg(long, default_value = ILLQC_PREFIX, help = "Prefix of the illqc summary files")]
    pub illqc_prefix: String,

    #[arg(long, default_value = DECONTAM_PREFIX, help = "Prefix of the decontam summary files")]
    pub decontam_prefix: String,

    #[arg(long, default_value = PATHWAY_PREFIX, help = "Prefix of the pathfinder summary files")]
    pub pathway_prefix: String,

    #[clap(
        long,
        num_args = 3,
        value_names = ["DIR", "PREFIX", "FIELDS"],
        action = clap::ArgAction::Append,
        help = "Generic json_report source; FIELDS is comma-separated. Repeat for more sources"
    )]
    pub source: Vec<String>,

    #[arg(long, action, help = "Write JSON samples in alphabetical order instead of first-seen order")]
    pub sort_samples: bool,

    // Flat and FastQC reports
    #[arg(short = 'i', long, help = "Directory where the sample results are located")]
    pub input_dir: Option<String>,

    #[arg(long, help = "Input file suffix for tsv_report")]
    pub input_suffix: Option<String>,

    #[arg(long, default_value = BEFORE_TRIM_DIR, help = "Subdirectory for before trim fastqc results")]
    pub before_trim_subfolder_dir: String,

    #[arg(long, default_value = AFTER_TRIM_DIR, help = "Subdirectory for after trim fastqc results")]
    pub after_trim_subfolder_dir: String,

    #[arg(long, default_value = "", help = "Text written for absent values in flat reports")]
    pub missing_value: String,

    #[arg(long, default_value = "auto", value_enum)]
    pub layout: SummaryLayout,

    // Output
    #[arg(short = 'o', long = "output-fp", help = "Output report file")]
    pub output_fp: Option<String>,

    #[arg(long, help = "Output directory where the fastqc reports will be saved")]
    pub output_dir: Option<String>,

    #[arg(long, default_value = FASTQC_OUTPUT_BASE, help = "Base name for the fastqc reports")]
    pub output_base: String,
}
