//! Utility functions for file handling and common operations

use crate::{SentieonError, SentieonResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Suffix appended to the first alignment's base name for default outputs
pub const VARIANTS_SUFFIX: &str = "-variants.vcf.gz";

const COMPRESSION_EXTENSIONS: &[&str] = &["gz", "bz2", "zip"];

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> SentieonResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(SentieonError::Io(e)),
    }
}

/// True when `path` is a regular file with content.
///
/// A zero-length file is treated as absent so that an interrupted run which
/// left an empty placeholder is recomputed.
pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// True when `output` exists and was modified no earlier than `input`
pub fn file_uptodate<P: AsRef<Path>, Q: AsRef<Path>>(output: P, input: Q) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(output.as_ref()), modified(input.as_ref())) {
        (Some(out), Some(inp)) => out >= inp,
        _ => false,
    }
}

/// Split a path into base and extension, keeping compression suffixes
/// together with the extension they compress (`a.vcf.gz` -> `a`, `.vcf.gz`).
pub fn splitext_plus<P: AsRef<Path>>(path: P) -> (PathBuf, String) {
    let path = path.as_ref();
    let mut base = path.to_path_buf();
    let mut ext = String::new();

    if let Some(e) = path.extension().and_then(|s| s.to_str()) {
        ext = format!(".{}", e);
        base = path.with_extension("");
        if COMPRESSION_EXTENSIONS.contains(&e) {
            if let Some(inner) = base.extension().and_then(|s| s.to_str()) {
                ext = format!(".{}{}", inner, ext);
                base = base.with_extension("");
            }
        }
    }

    (base, ext)
}

/// Append `suffix` to the extension-less form of `path`
pub fn replace_extension<P: AsRef<Path>>(path: P, suffix: &str) -> PathBuf {
    let (base, _) = splitext_plus(path);
    let mut name = base.into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Default variant output for a set of alignments: first BAM with its
/// extension swapped for `-variants.vcf.gz`
pub fn default_out_file(align_bams: &[PathBuf]) -> SentieonResult<PathBuf> {
    let first = align_bams.first().ok_or_else(|| {
        SentieonError::Precondition("At least one alignment file is required".to_string())
    })?;
    Ok(replace_extension(first, VARIANTS_SUFFIX))
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> SentieonResult<()> {
    if !path.as_ref().exists() {
        return Err(SentieonError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> SentieonResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| SentieonError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> SentieonResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "chr1\t0\t100").unwrap();
        assert!(!is_gzipped(temp_file.path()).unwrap());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert!(is_gzipped(temp_file.path()).unwrap());
    }

    #[test]
    fn test_file_exists_requires_content() {
        let mut temp_file = NamedTempFile::new().unwrap();
        assert!(!file_exists(temp_file.path()));

        writeln!(temp_file, "data").unwrap();
        temp_file.flush().unwrap();
        assert!(file_exists(temp_file.path()));

        assert!(!file_exists("/nonexistent/file.vcf.gz"));
        assert!(!file_exists(std::env::temp_dir()));
    }

    #[test]
    fn test_file_uptodate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("targets.bed");
        let output = dir.path().join("targets-merged.bed");
        std::fs::write(&input, "chr1\t0\t10\n").unwrap();
        assert!(!file_uptodate(&output, &input));

        std::fs::write(&output, "chr1\t0\t10\n").unwrap();
        assert!(file_uptodate(&output, &input));

        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&input)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert!(!file_uptodate(&output, &input));
        assert!(!file_uptodate(&output, dir.path().join("missing.bed")));
    }

    #[test]
    fn test_splitext_plus() {
        assert_eq!(
            splitext_plus("/data/tumor.bam"),
            (PathBuf::from("/data/tumor"), ".bam".to_string())
        );
        assert_eq!(
            splitext_plus("/data/calls.vcf.gz"),
            (PathBuf::from("/data/calls"), ".vcf.gz".to_string())
        );
        assert_eq!(
            splitext_plus("regions"),
            (PathBuf::from("regions"), String::new())
        );
    }

    #[test]
    fn test_default_out_file() {
        let bams = vec![
            PathBuf::from("/work/align/S1-ready.bam"),
            PathBuf::from("/work/align/S2-ready.bam"),
        ];
        assert_eq!(
            default_out_file(&bams).unwrap(),
            PathBuf::from("/work/align/S1-ready-variants.vcf.gz")
        );

        let dotted = vec![PathBuf::from("run.1/sample.sorted.bam")];
        assert_eq!(
            default_out_file(&dotted).unwrap(),
            PathBuf::from("run.1/sample.sorted-variants.vcf.gz")
        );

        assert!(matches!(
            default_out_file(&[]),
            Err(SentieonError::Precondition(_))
        ));
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());
        assert!(validate_file_readable(temp_file.path()).is_ok());

        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
