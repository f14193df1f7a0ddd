//! Output formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WavebookError;

/// Target document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Pdf,
    Docx,
    Json,
}

impl OutputFormat {
    /// Whether the format has pages, so page-break hints take effect.
    pub fn is_paginated(&self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Docx)
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Json => "json",
        }
    }

    /// Whether rendering needs an external program.
    pub fn needs_external_renderer(&self) -> bool {
        matches!(
            self,
            OutputFormat::Html | OutputFormat::Pdf | OutputFormat::Docx
        )
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = WavebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" | "word" => Ok(OutputFormat::Docx),
            "json" => Ok(OutputFormat::Json),
            other => Err(WavebookError::config(
                "format",
                format!("unknown output format '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        assert!(OutputFormat::Pdf.is_paginated());
        assert!(OutputFormat::Docx.is_paginated());
        assert!(!OutputFormat::Html.is_paginated());
        assert!(!OutputFormat::Markdown.is_paginated());
    }

    #[test]
    fn test_parse() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("odt".parse::<OutputFormat>().is_err());
        let format: OutputFormat = serde_json::from_str("\"docx\"").unwrap();
        assert_eq!(format, OutputFormat::Docx);
    }
}
