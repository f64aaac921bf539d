use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use tempfile::NamedTempFile;
use tokio::task;

use crate::config::defs::ReportError;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

pub fn is_gzipped(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}


/// Resolves a user-supplied path against the working directory.
///
/// # Arguments
///
/// * `path` - Path as given on the command line.
/// * `cwd` - The current working directory.
///
/// # Returns
/// Absolute paths unchanged, relative ones joined onto `cwd`.
pub fn resolve_path(path: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}


/// Confirms a path names an existing directory.
pub async fn require_dir(dir: &Path) -> Result<(), ReportError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ReportError::NotADirectory(dir.to_path_buf())),
        Err(_) => Err(ReportError::MissingDirectory(dir.to_path_buf())),
    }
}


/// Checks, before any work is done, that the output file can be placed where asked.
/// The parent must exist, be a directory and not be read-only.
pub async fn check_output_path(output: &Path) -> Result<(), ReportError> {
    let parent = output_parent(output);
    match tokio::fs::metadata(&parent).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(()),
        _ => Err(ReportError::OutputNotWritable(output.to_path_buf())),
    }
}

fn output_parent(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}


/// Reads a whole text file, transparently inflating gzip content.
///
/// # Arguments
///
/// * `path` - File to read.
///
/// # Returns
/// The decoded text; invalid UTF-8 is replaced rather than rejected.
pub async fn read_text(path: &Path) -> Result<String, ReportError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReportError::io(path, e))?;

    if is_gzipped(&bytes) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| ReportError::io(path, e))?;
        return Ok(String::from_utf8_lossy(&decoded).into_owned());
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}


/// Writes `contents` to `path` through a temp file in the same directory, then renames
/// it over the destination. A failed write leaves any previous file untouched.
pub async fn write_atomic(path: &Path, contents: Vec<u8>) -> Result<(), ReportError> {
    let target = path.to_path_buf();
    task::spawn_blocking(move || write_atomic_blocking(&target, &contents))
        .await
        .map_err(|e| ReportError::io(path, std::io::Error::other(e)))?
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let parent = output_parent(path);
    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| ReportError::io(&parent, e))?;
    tmp.write_all(contents).map_err(|e| ReportError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| ReportError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ReportError::io(path, e.error))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path() {
        let cwd = PathBuf::from("/data/run");
        assert_eq!(resolve_path("out.json", &cwd), PathBuf::from("/data/run/out.json"));
        assert_eq!(resolve_path("/tmp/out.json", &cwd), PathBuf::from("/tmp/out.json"));
    }

    #[tokio::test]
    async fn test_read_text_plain_and_gzip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, "input\t100\n")?;
        assert_eq!(read_text(&plain).await?, "input\t100\n");

        let gz = dir.path().join("packed.txt.gz");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"dropped\t5\n")?;
        std::fs::write(&gz, enc.finish()?)?;
        assert_eq!(read_text(&gz).await?, "dropped\t5\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_require_dir() -> anyhow::Result<()> {
        let dir = tempdir()?;
        require_dir(dir.path()).await?;

        let missing = dir.path().join("nope");
        assert!(matches!(require_dir(&missing).await, Err(ReportError::MissingDirectory(_))));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x")?;
        assert!(matches!(require_dir(&file).await, Err(ReportError::NotADirectory(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_atomic_overwrites() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("report.tsv");
        std::fs::write(&out, "stale contents that are longer")?;
        write_atomic(&out, b"fresh\n".to_vec()).await?;
        assert_eq!(std::fs::read_to_string(&out)?, "fresh\n");
        // only the report itself, no leftover temp files
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_check_output_path_missing_parent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        check_output_path(&dir.path().join("ok.json")).await?;
        let bad = dir.path().join("missing").join("out.json");
        assert!(matches!(check_output_path(&bad).await, Err(ReportError::OutputNotWritable(_))));
        Ok(())
    }
}
