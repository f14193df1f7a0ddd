//! Provenance records: what software produced a batch, and from which inputs.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WavebookError};
use crate::render::OutputFormat;

/// Upper bound on collision suffixes tried for one timestamp.
const MAX_SUFFIX: usize = 1000;

/// One input file used by the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub index: usize,
    pub label: String,
    pub file: String,
    pub hash: String,
}

/// Snapshot of the environment used for a whole batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub created_at: DateTime<Utc>,
    pub tool: String,
    pub tool_version: String,
    pub os: String,
    pub arch: String,
    pub backend: String,
    pub backend_version: String,
    pub format: OutputFormat,
    pub template_hash: String,
    pub sources: Vec<SourceRecord>,
}

impl ProvenanceRecord {
    /// Capture the current environment.
    pub fn capture(
        backend: impl Into<String>,
        backend_version: impl Into<String>,
        format: OutputFormat,
        template_hash: impl Into<String>,
        sources: Vec<SourceRecord>,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            tool: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            backend: backend.into(),
            backend_version: backend_version.into(),
            format,
            template_hash: template_hash.into(),
            sources,
        }
    }

    /// Base file name: `provenance-<YYYY-MM-DDTHH-MM-SS>`.
    pub fn file_stem(&self) -> String {
        format!("provenance-{}", self.created_at.format("%Y-%m-%dT%H-%M-%S"))
    }

    /// Write the record into `dir` under a date-stamped name.
    ///
    /// An existing file is never overwritten; a numeric suffix is added
    /// instead. Returns the path written.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            WavebookError::Persistence(format!(
                "Failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let stem = self.file_stem();
        for attempt in 0..MAX_SUFFIX {
            let name = match attempt {
                0 => format!("{}.json", stem),
                n => format!("{}-{}.json", stem, n),
            };
            let path = dir.join(name);

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(WavebookError::Persistence(format!(
                        "Failed to create file '{}': {}",
                        path.display(),
                        e
                    )));
                }
            };

            self.write_to(file).map_err(|e| {
                WavebookError::Persistence(format!("Failed to write file '{}': {}", path.display(), e))
            })?;
            return Ok(path);
        }

        Err(WavebookError::Persistence(format!(
            "No free file name for '{}' in '{}'",
            stem,
            dir.display()
        )))
    }

    /// Write the record as pretty JSON, flushing before returning.
    fn write_to(&self, out: impl Write) -> Result<()> {
        let mut writer = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| {
            WavebookError::Persistence(format!("Failed to serialize provenance record: {}", e))
        })?;
        writer
            .flush()
            .map_err(|e| WavebookError::Persistence(format!("Failed to flush provenance record: {}", e)))
    }

    /// Load a record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            WavebookError::Persistence(format!(
                "Failed to open file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            WavebookError::Persistence(format!(
                "Failed to parse provenance record '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> ProvenanceRecord {
        ProvenanceRecord::capture(
            "markdown",
            "wavebook-markdown 0.1.0",
            OutputFormat::Markdown,
            "abc123",
            vec![SourceRecord {
                index: 1,
                label: "January 2016".to_string(),
                file: "Jan16 public.csv".to_string(),
                hash: "sha256:00".to_string(),
            }],
        )
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let record = record();
        let path = record.save_in(dir.path().join("prov")).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("provenance-"));
        assert!(name.ends_with(".json"));

        let loaded = ProvenanceRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    /// Accepts nothing; every write fails.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_write_failure_is_reported() {
        let err = record().write_to(FullDisk).unwrap_err();
        assert!(matches!(err, WavebookError::Persistence(ref m) if m.contains("no space left")));
    }

    #[test]
    fn test_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let record = record();
        let first = record.save_in(dir.path()).unwrap();
        let second = record.save_in(dir.path()).unwrap();
        let third = record.save_in(dir.path()).unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(second.to_string_lossy().ends_with("-1.json"));
        assert!(third.to_string_lossy().ends_with("-2.json"));
    }

    #[test]
    fn test_file_stem_format() {
        let mut record = record();
        record.created_at = DateTime::parse_from_rfc3339("2016-03-01T09:05:07Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(record.file_stem(), "provenance-2016-03-01T09-05-07");
    }
}
