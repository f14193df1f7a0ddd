//! JSON rendering: the content model itself, serialised.

use std::path::Path;

use crate::content::Document;
use crate::error::Result;

use super::{write_output, OutputFormat, RenderBackend};

/// Writes the assembled document as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonBackend;

impl JsonBackend {
    /// Create a JSON backend.
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for JsonBackend {
    fn name(&self) -> &str {
        "json"
    }

    fn version(&self) -> String {
        format!("wavebook-json {}", env!("CARGO_PKG_VERSION"))
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, document: &Document, output: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(document)?;
        write_output(output, &json)
    }
}
