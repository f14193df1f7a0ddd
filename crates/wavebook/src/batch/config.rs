//! Batch configuration.
//!
//! The run list is explicit and ordered. Discovery order is lexical and says
//! nothing about chronology, so each run names the discovered source it uses
//! by 1-based index.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WavebookError};
use crate::render::{CommandConfig, OutputFormat};

fn default_provenance_dir() -> PathBuf {
    PathBuf::from("provenance")
}

/// Parameters for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
    /// 1-based index into the discovered source list.
    pub source_index: usize,
    /// Label used in narrative text (e.g. "March 2016").
    pub label: String,
    /// Output file.
    pub output: PathBuf,
}

impl RunParameters {
    /// Create run parameters.
    pub fn new(source_index: usize, label: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            source_index,
            label: label.into(),
            output: output.into(),
        }
    }
}

/// A whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root for relative paths. Defaults to the directory holding the
    /// configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Directory searched for data files.
    pub data_root: PathBuf,
    /// Regex matched against data file names.
    pub pattern: String,
    /// Template file.
    pub template: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// External renderer for HTML, PDF and DOCX (pandoc when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<CommandConfig>,
    /// Stop attempting sources once this many have failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<usize>,
    #[serde(default = "default_provenance_dir")]
    pub provenance_dir: PathBuf,
    /// Documents to produce, in order.
    pub runs: Vec<RunParameters>,
}

impl BatchConfig {
    /// Load a batch configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| WavebookError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: BatchConfig = serde_json::from_str(&content)?;

        if config.working_dir.is_none() {
            let parent = path.parent().unwrap_or(Path::new("."));
            config.working_dir = Some(parent.to_path_buf());
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the run list before anything is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.runs.is_empty() {
            return Err(WavebookError::config("batch", "no runs configured"));
        }
        if self.max_failures == Some(0) {
            return Err(WavebookError::config("batch", "max_failures must be at least 1"));
        }
        for (i, run) in self.runs.iter().enumerate() {
            if run.source_index == 0 {
                return Err(WavebookError::config(
                    "batch",
                    format!("run '{}' has source_index 0; indices start at 1", run.label),
                ));
            }
            if self.runs[..i].iter().any(|r| r.output == run.output) {
                return Err(WavebookError::config(
                    "batch",
                    format!("output '{}' is used by more than one run", run.output.display()),
                ));
            }
        }
        Ok(())
    }

    /// Resolve a path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.working_dir {
            Some(ref root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Run parameters with output paths resolved.
    pub fn resolved_runs(&self) -> Vec<RunParameters> {
        self.runs
            .iter()
            .map(|r| RunParameters {
                output: self.resolve(&r.output),
                ..r.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "data_root": "data",
        "pattern": "public\\.csv$",
        "template": "report.json",
        "format": "pdf",
        "max_failures": 2,
        "runs": [
            {"source_index": 1, "label": "January 2016", "output": "out/jan16.pdf"},
            {"source_index": 2, "label": "March 2016", "output": "out/mar16.pdf"}
        ]
    }"#;

    #[test]
    fn test_load_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, CONFIG).unwrap();

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.format, OutputFormat::Pdf);
        assert_eq!(config.provenance_dir, PathBuf::from("provenance"));
        assert_eq!(config.resolve(&config.data_root), dir.path().join("data"));
        assert_eq!(
            config.resolved_runs()[1].output,
            dir.path().join("out/mar16.pdf")
        );
        assert_eq!(config.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_duplicate_outputs_rejected() {
        let mut config: BatchConfig = serde_json::from_str(CONFIG).unwrap();
        config.runs[1].output = config.runs[0].output.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_index_rejected() {
        let mut config: BatchConfig = serde_json::from_str(CONFIG).unwrap();
        config.runs[0].source_index = 0;
        assert!(matches!(config.validate(), Err(WavebookError::Config { .. })));
    }
}
