// src/lib.rs
pub mod config;
pub mod utils;
pub mod reports;
pub mod cli;
pub use cli::Arguments;
pub use config::defs::ReportError;
