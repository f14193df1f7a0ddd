//! External-program rendering (pandoc and friends).
//!
//! The document is first written as Markdown next to the output, then the
//! program is run once per document. A non-zero exit is reported with the
//! program's own stderr.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::Document;
use crate::error::{Result, WavebookError};

use super::markdown::MarkdownBackend;
use super::{OutputFormat, RenderBackend};

fn default_args() -> Vec<String> {
    vec!["{input}".to_string(), "-o".to_string(), "{output}".to_string()]
}

/// Program and argument template for an external renderer.
///
/// `{input}` and `{output}` in the arguments are replaced with the Markdown
/// intermediate and the output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl CommandConfig {
    /// pandoc with its default argument layout.
    pub fn pandoc() -> Self {
        Self {
            program: "pandoc".to_string(),
            args: default_args(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self::pandoc()
    }
}

/// Renders through an external program.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: CommandConfig,
    markdown: MarkdownBackend,
}

impl CommandBackend {
    /// Create a backend for a target format.
    pub fn new(config: CommandConfig, target: OutputFormat) -> Self {
        Self {
            config,
            markdown: MarkdownBackend::for_target(target),
        }
    }

    /// Decimal places for table cells.
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.markdown = self.markdown.with_decimals(decimals);
        self
    }

    /// Path of the Markdown intermediate for an output path.
    pub fn intermediate_path(output: &Path) -> PathBuf {
        let stem = output.file_stem().unwrap_or_default().to_string_lossy();
        output.with_file_name(format!("{}.render.md", stem))
    }

    fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    fn failure(&self, diagnostic: impl Into<String>) -> WavebookError {
        WavebookError::RenderBackend {
            backend: self.config.program.clone(),
            diagnostic: diagnostic.into(),
        }
    }
}

impl RenderBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn version(&self) -> String {
        Command::new(&self.config.program)
            .arg("--version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string())
            })
            .unwrap_or_else(|| format!("{} (version unknown)", self.config.program))
    }

    fn format(&self) -> OutputFormat {
        self.markdown.format()
    }

    fn render(&self, document: &Document, output: &Path) -> Result<()> {
        let input = Self::intermediate_path(output);
        self.markdown.render(document, &input)?;

        let args = self.args(&input, output);
        debug!(program = %self.config.program, ?args, "running renderer");

        let result = Command::new(&self.config.program)
            .args(&args)
            .output()
            .map_err(|e| self.failure(format!("failed to start: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(self.failure(if stderr.is_empty() {
                result.status.to_string()
            } else {
                stderr
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document {
            title: "t".to_string(),
            source_index: 1,
            source_label: "w1".to_string(),
            blocks: Vec::new(),
        }
    }

    #[test]
    fn test_args_substitution() {
        let backend = CommandBackend::new(CommandConfig::pandoc(), OutputFormat::Pdf);
        let args = backend.args(Path::new("in.md"), Path::new("out.pdf"));
        assert_eq!(args, vec!["in.md", "-o", "out.pdf"]);
        assert_eq!(
            CommandBackend::intermediate_path(Path::new("out/w1.pdf")),
            PathBuf::from("out/w1.render.md")
        );
    }

    #[test]
    fn test_missing_program_is_backend_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CommandConfig {
            program: "wavebook-no-such-renderer".to_string(),
            args: default_args(),
        };
        let backend = CommandBackend::new(config, OutputFormat::Html);
        let err = backend
            .render(&document(), &dir.path().join("w1.html"))
            .unwrap_err();
        assert!(matches!(err, WavebookError::RenderBackend { .. }));
        assert!(backend.version().contains("version unknown"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_stderr() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CommandConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 'no LaTeX engine' >&2; exit 3".to_string()],
        };
        let backend = CommandBackend::new(config, OutputFormat::Pdf);
        match backend.render(&document(), &dir.path().join("w1.pdf")) {
            Err(WavebookError::RenderBackend { backend, diagnostic }) => {
                assert_eq!(backend, "sh");
                assert_eq!(diagnostic, "no LaTeX engine");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_program() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CommandConfig {
            program: "cp".to_string(),
            args: default_args().into_iter().filter(|a| a != "-o").collect(),
        };
        let output = dir.path().join("w1.html");
        CommandBackend::new(config, OutputFormat::Html)
            .render(&document(), &output)
            .unwrap();
        assert!(std::fs::read_to_string(output).unwrap().starts_with("# t"));
    }
}
