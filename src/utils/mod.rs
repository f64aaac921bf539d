pub mod aggregate;
pub mod discovery;
pub mod fastqc;
pub mod file;
pub mod summary;
