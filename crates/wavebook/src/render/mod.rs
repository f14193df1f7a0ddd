//! Rendering backends.
//!
//! A backend turns an assembled [`Document`] into a file. The driver treats
//! it as opaque: it only sees success or a [`WavebookError::RenderBackend`]
//! carrying the backend's own diagnostic.

mod command;
mod format;
mod json;
mod markdown;

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::content::Document;
use crate::error::{Result, WavebookError};

pub use command::{CommandBackend, CommandConfig};
pub use format::OutputFormat;
pub use json::JsonBackend;
pub use markdown::MarkdownBackend;

/// Turns documents into output files.
pub trait RenderBackend: Send + Sync {
    /// Backend name, recorded in provenance.
    fn name(&self) -> &str;

    /// Tool-version identifier, recorded in provenance.
    fn version(&self) -> String;

    /// Output format produced.
    fn format(&self) -> OutputFormat;

    /// Render one document to `output`.
    fn render(&self, document: &Document, output: &Path) -> Result<()>;
}

/// The default backend for a format.
///
/// Markdown and JSON are written directly; other formats go through an
/// external program (`command`, or pandoc when unset).
pub fn backend_for(
    format: OutputFormat,
    command: Option<CommandConfig>,
    decimals: usize,
) -> Box<dyn RenderBackend> {
    if command.is_some() && !format.needs_external_renderer() {
        warn!(format = %format, "external renderer ignored; format is written directly");
    }
    match format {
        OutputFormat::Markdown => Box::new(MarkdownBackend::new().with_decimals(decimals)),
        OutputFormat::Json => Box::new(JsonBackend::new()),
        OutputFormat::Html | OutputFormat::Pdf | OutputFormat::Docx => Box::new(
            CommandBackend::new(command.unwrap_or_default(), format).with_decimals(decimals),
        ),
    }
}

/// Write bytes to a file, creating parent directories.
pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WavebookError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    fs::write(path, bytes).map_err(|e| WavebookError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
