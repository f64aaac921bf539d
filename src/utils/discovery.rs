// src/utils/discovery.rs: Finding per-sample files by naming convention
use std::fmt;
use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use log::{debug, info, warn};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

use crate::config::defs::{ReportError, GZIP_EXT};
use crate::utils::file::require_dir;

/// How a file name is tested against the stage convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// `<prefix><sample>.<ext>`
    Prefix(String),
    /// `<sample><suffix>`
    Suffix(String),
}

impl NameMatch {
    /// Returns the SampleID for a matching file name, or None if the name does not match.
    pub fn sample_id(&self, file_name: &str) -> Option<String> {
        match self {
            NameMatch::Prefix(prefix) => {
                let rest = file_name.strip_prefix(prefix.as_str())?;
                Some(strip_extension(rest).to_string())
            }
            NameMatch::Suffix(suffix) => {
                file_name.strip_suffix(suffix.as_str()).map(str::to_string)
            }
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            NameMatch::Prefix(s) | NameMatch::Suffix(s) => s,
        }
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Prefix(p) => write!(f, "{}*", p),
            NameMatch::Suffix(s) => write!(f, "*{}", s),
        }
    }
}

/// Drops a trailing `.gz` and then one more extension, if present.
fn strip_extension(name: &str) -> &str {
    let gz = format!(".{}", GZIP_EXT);
    let name = name.strip_suffix(gz.as_str()).unwrap_or(name);
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// One discovered per-sample file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub sample_id: String,
    pub path: PathBuf,
}

/// Which kind of directory entry a discovery pass wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}


/// Lists `dir` and returns every regular file whose name matches `name_match`, paired
/// with its SampleID.
///
/// # Arguments
///
/// * `dir` - Stage output directory.
/// * `name_match` - Literal prefix or suffix convention for the stage.
///
/// # Returns
/// Matches sorted by file name. An empty vector is a valid result; a missing directory
/// or a SampleID claimed by two files is a `ReportError`.
pub async fn discover_samples(dir: &Path, name_match: &NameMatch) -> Result<Vec<SampleFile>, ReportError> {
    discover_entries(dir, name_match, EntryKind::File).await
}


/// Same as `discover_samples` but selecting entries of the given kind, which lets FastQC
/// result folders go through the same convention handling.
pub async fn discover_entries(
    dir: &Path,
    name_match: &NameMatch,
    kind: EntryKind,
) -> Result<Vec<SampleFile>, ReportError> {
    require_dir(dir).await?;

    let read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ReportError::io(dir, e))?;
    let mut entries = ReadDirStream::new(read_dir);

    let mut found: Vec<(String, SampleFile)> = Vec::new();
    while let Some(entry) = entries.next().await {
        let entry = entry.map_err(|e| ReportError::io(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type().await.map_err(|e| ReportError::io(entry.path(), e))?;
        // follow symlinks so linked stage outputs still count
        let is_wanted = if file_type.is_symlink() {
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) => match kind {
                    EntryKind::File => meta.is_file(),
                    EntryKind::Dir => meta.is_dir(),
                },
                Err(_) => false,
            }
        } else {
            match kind {
                EntryKind::File => file_type.is_file(),
                EntryKind::Dir => file_type.is_dir(),
            }
        };
        if !is_wanted {
            continue;
        }

        let Some(sample_id) = name_match.sample_id(&file_name) else {
            continue;
        };
        if sample_id.is_empty() {
            warn!("Skipping {}: no sample id left after removing '{}'", file_name, name_match.pattern());
            continue;
        }
        found.push((file_name, SampleFile { sample_id, path: entry.path() }));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    let samples: Vec<SampleFile> = found.into_iter().map(|(_, s)| s).collect();
    check_unique(dir, &samples)?;

    info!("Found {} file(s) matching {} in {}", samples.len(), name_match, dir.display());
    for s in &samples {
        debug!("  {} -> {}", s.sample_id, s.path.display());
    }
    Ok(samples)
}


/// One file per sample per source. IDs that differ only by case are treated as a clash
/// too, since they usually come from renamed copies of the same sample.
fn check_unique(dir: &Path, samples: &[SampleFile]) -> Result<(), ReportError> {
    let mut seen: FxHashMap<String, &SampleFile> = FxHashMap::default();
    for sample in samples {
        let key = sample.sample_id.to_lowercase();
        if let Some(first) = seen.get(&key) {
            return Err(ReportError::DuplicateSample {
                sample: sample.sample_id.clone(),
                dir: dir.to_path_buf(),
                first: first.path.clone(),
                second: sample.path.clone(),
            });
        }
        seen.insert(key, sample);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_id_prefix() {
        let m = NameMatch::Prefix("summary-illqc_".to_string());
        assert_eq!(m.sample_id("summary-illqc_S1.txt"), Some("S1".to_string()));
        assert_eq!(m.sample_id("summary-illqc_S1.json.gz"), Some("S1".to_string()));
        assert_eq!(m.sample_id("summary-illqc_S1"), Some("S1".to_string()));
        assert_eq!(m.sample_id("summary-illqc_A.B.txt"), Some("A.B".to_string()));
        assert_eq!(m.sample_id("summary-decontam_S1.txt"), None);
    }

    #[test]
    fn test_sample_id_suffix() {
        let m = NameMatch::Suffix("_stats.tsv".to_string());
        assert_eq!(m.sample_id("S7_stats.tsv"), Some("S7".to_string()));
        assert_eq!(m.sample_id("S7_stats.txt"), None);
    }

    #[tokio::test]
    async fn test_discover_sorted_and_filtered() -> anyhow::Result<()> {
        let dir = tempdir()?;
        for name in ["summary-illqc_S2.txt", "summary-illqc_S1.txt", "other_S3.txt", ".summary-illqc_S4.txt"] {
            std::fs::write(dir.path().join(name), "input\t1\n")?;
        }
        std::fs::create_dir(dir.path().join("summary-illqc_S5.txt"))?;

        let found = discover_samples(dir.path(), &NameMatch::Prefix("summary-illqc_".into())).await?;
        let ids: Vec<&str> = found.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_discover_empty_is_ok() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let found = discover_samples(dir.path(), &NameMatch::Suffix(".tsv".into())).await?;
        assert!(found.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_discover_missing_dir() {
        let res = discover_samples(Path::new("/definitely/not/here"), &NameMatch::Suffix(".tsv".into())).await;
        assert!(matches!(res, Err(ReportError::MissingDirectory(_))));
    }

    #[tokio::test]
    async fn test_discover_duplicate_sample() -> anyhow::Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("summary-illqc_S1.txt"), "input\t1\n")?;
        std::fs::write(dir.path().join("summary-illqc_S1.tsv"), "input\t2\n")?;
        let res = discover_samples(dir.path(), &NameMatch::Prefix("summary-illqc_".into())).await;
        assert!(matches!(res, Err(ReportError::DuplicateSample { .. })));

        let dir = tempdir()?;
        std::fs::write(dir.path().join("summary-illqc_s1.txt"), "input\t1\n")?;
        std::fs::write(dir.path().join("summary-illqc_S1.txt"), "input\t2\n")?;
        let res = discover_samples(dir.path(), &NameMatch::Prefix("summary-illqc_".into())).await;
        assert!(matches!(res, Err(ReportError::DuplicateSample { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_discover_dirs() -> anyhow::Result<()> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("S1_R1_fastqc"))?;
        std::fs::write(dir.path().join("S1_R1_fastqc.zip"), "zip")?;
        let found = discover_entries(dir.path(), &NameMatch::Suffix("_fastqc".into()), EntryKind::Dir).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sample_id, "S1_R1");
        Ok(())
    }
}
