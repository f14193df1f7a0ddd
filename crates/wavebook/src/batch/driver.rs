//! The batch render driver.
//!
//! Sources are processed one at a time, in run-list order. A failure is
//! recorded against its run and the batch moves on; only configuration
//! problems found before the first source abort the whole run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::content::Template;
use crate::error::{ErrorKind, Result, WavebookError};
use crate::input::{discover, require_sources, DataSource};
use crate::render::{backend_for, RenderBackend};
use crate::wavebook::Wavebook;

use super::config::{BatchConfig, RunParameters};
use super::provenance::{ProvenanceRecord, SourceRecord};

/// What happened to one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    /// The document was written.
    Success { output: PathBuf },
    /// The run failed; later runs were still attempted.
    Failed { kind: ErrorKind, message: String },
    /// Not attempted because the failure limit was reached.
    Skipped { reason: String },
}

/// Result for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    pub source_index: usize,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub outcome: RenderOutcome,
}

impl RenderResult {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Success { .. })
    }

    /// Whether the run failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Failed { .. })
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// One result per run, in run-list order.
    pub results: Vec<RenderResult>,
    pub provenance: ProvenanceRecord,
    /// Where the provenance record was written, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance_path: Option<PathBuf>,
    /// Why the provenance record could not be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance_error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.len() - self.succeeded() - self.failed()
    }

    /// Whether any run did not succeed.
    pub fn has_failures(&self) -> bool {
        self.succeeded() != self.results.len()
    }

    /// Every run succeeded and the provenance record was written (when one
    /// was requested).
    pub fn is_complete(&self) -> bool {
        !self.has_failures() && self.provenance_error.is_none()
    }
}

/// Runs a template over a list of sources.
pub struct BatchDriver {
    wavebook: Wavebook,
    backend: Box<dyn RenderBackend>,
    max_failures: Option<usize>,
    provenance_dir: Option<PathBuf>,
}

impl BatchDriver {
    /// Create a driver. Rules are compiled here, before any source is read.
    pub fn new(template: Template, backend: Box<dyn RenderBackend>) -> Result<Self> {
        Ok(Self {
            wavebook: Wavebook::new(template)?,
            backend,
            max_failures: None,
            provenance_dir: None,
        })
    }

    /// Stop attempting sources after this many failures.
    pub fn with_max_failures(mut self, max_failures: usize) -> Self {
        self.max_failures = Some(max_failures);
        self
    }

    /// Persist the provenance record into this directory.
    pub fn with_provenance_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.provenance_dir = Some(dir.into());
        self
    }

    /// Process every run in order.
    ///
    /// Each run's `source_index` is a 1-based index into `sources`. All
    /// indices are checked before the first source is processed.
    pub fn run(&self, sources: &[DataSource], runs: &[RunParameters]) -> Result<BatchReport> {
        if runs.is_empty() {
            return Err(WavebookError::config("batch", "no runs configured"));
        }
        for run in runs {
            if run.source_index == 0 || run.source_index > sources.len() {
                return Err(WavebookError::config(
                    "batch",
                    format!(
                        "run '{}' uses source {} but {} source(s) were discovered",
                        run.label,
                        run.source_index,
                        sources.len()
                    ),
                ));
            }
        }

        let template_hash = self.wavebook.template().hash()?;

        info!(
            runs = runs.len(),
            sources = sources.len(),
            backend = self.backend.name(),
            "starting batch"
        );

        let mut results = Vec::with_capacity(runs.len());
        let mut records = Vec::new();
        let mut failures = 0;

        for params in runs {
            let source = &sources[params.source_index - 1];

            if let Some(max) = self.max_failures.filter(|max| failures >= *max) {
                warn!(source = %params.label, "skipped after {} failure(s)", max);
                results.push(RenderResult {
                    source_index: params.source_index,
                    label: params.label.clone(),
                    source: Some(source.path.clone()),
                    outcome: RenderOutcome::Skipped {
                        reason: format!("failure limit of {} reached", max),
                    },
                });
                continue;
            }

            let outcome = match self.run_one(source, params) {
                Ok(record) => {
                    info!(source = %params.label, output = %params.output.display(), "rendered");
                    records.push(record);
                    RenderOutcome::Success {
                        output: params.output.clone(),
                    }
                }
                Err(e) => {
                    failures += 1;
                    error!(source = %params.label, kind = e.kind().label(), "{}", e);
                    RenderOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };

            results.push(RenderResult {
                source_index: params.source_index,
                label: params.label.clone(),
                source: Some(source.path.clone()),
                outcome,
            });
        }

        let provenance = ProvenanceRecord::capture(
            self.backend.name(),
            self.backend.version(),
            self.backend.format(),
            template_hash,
            records,
        );

        // Documents are already on disk; a provenance failure must not hide
        // their results.
        let (provenance_path, provenance_error) = match self.provenance_dir {
            Some(ref dir) => match provenance.save_in(dir) {
                Ok(path) => (Some(path), None),
                Err(e) => {
                    error!(dir = %dir.display(), "{}", e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        let report = BatchReport {
            results,
            provenance,
            provenance_path,
            provenance_error,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "batch finished"
        );
        Ok(report)
    }

    fn run_one(&self, source: &DataSource, params: &RunParameters) -> Result<SourceRecord> {
        let processed = self.wavebook.process(&source.path, params)?;
        self.backend.render(&processed.document, &params.output)?;
        Ok(SourceRecord {
            index: source.index,
            label: params.label.clone(),
            file: processed.source.file,
            hash: processed.source.hash,
        })
    }
}

/// Run a batch described by a configuration file's contents.
///
/// Discovery and template loading happen first; an empty discovery or a
/// bad template aborts before any source is processed.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport> {
    config.validate()?;

    let template = Template::load(config.resolve(&config.template))?;
    let root = config.resolve(&config.data_root);
    let sources = require_sources(discover(&root, &config.pattern)?, &root, &config.pattern)?;

    let backend = backend_for(config.format, config.renderer.clone(), template.decimals);
    let mut driver = BatchDriver::new(template, backend)?
        .with_provenance_dir(config.resolve(&config.provenance_dir));
    if let Some(max) = config.max_failures {
        driver = driver.with_max_failures(max);
    }

    driver.run(&sources, &config.resolved_runs())
}
