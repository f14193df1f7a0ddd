//! Document templates.
//!
//! A template is written once and applied to every source in a batch. It
//! carries the loader settings, recoding rules, derived variables, computed
//! scalars, and an ordered list of sections.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, WavebookError};
use crate::input::LoaderConfig;
use crate::recode::{DerivedVariable, RecodingRule};
use crate::tabulate::{CrossTabSpec, ValueTransform};

fn default_source_index() -> usize {
    1
}

fn default_decimals() -> usize {
    0
}

/// The template's parameter contract and its documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameters {
    #[serde(default = "default_source_index")]
    pub source_index: usize,
    #[serde(default)]
    pub source_label: String,
}

impl Default for TemplateParameters {
    fn default() -> Self {
        Self {
            source_index: default_source_index(),
            source_label: String::new(),
        }
    }
}

/// A named value computed from the recoded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarDef {
    pub name: String,
    #[serde(flatten)]
    pub source: ScalarSource,
}

/// How a scalar is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalarSource {
    /// One cell of a tabulation, formatted.
    Cell {
        table: CrossTabSpec,
        row: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
    },
    /// The label with the largest weighted total.
    Modal {
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<String>,
    },
    /// Number of rows in the dataset.
    Respondents,
}

/// One template section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    /// Narrative text with `{{name}}` placeholders.
    Text { text: String },
    /// A computed scalar on its own line.
    Scalar {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// A single table.
    Table {
        table: CrossTabSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// A bar chart of a tabulation.
    Figure {
        table: CrossTabSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Every outer variable crossed with every inner variable. Each outer
    /// variable is followed by one page break.
    Crosstabs {
        outer: Vec<String>,
        inner: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<String>,
        #[serde(default)]
        transform: ValueTransform,
        #[serde(default)]
        figures: bool,
    },
    /// An explicit page break.
    PageBreak,
}

/// A complete document template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Title pattern; may use placeholders.
    pub title: String,
    #[serde(default)]
    pub parameters: TemplateParameters,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub rules: Vec<RecodingRule>,
    #[serde(default)]
    pub derived: Vec<DerivedVariable>,
    #[serde(default)]
    pub scalars: Vec<ScalarDef>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Decimal places for percentages and counts.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Template {
    /// Create an empty template with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parameters: TemplateParameters::default(),
            loader: LoaderConfig::default(),
            rules: Vec::new(),
            derived: Vec::new(),
            scalars: Vec::new(),
            sections: Vec::new(),
            decimals: default_decimals(),
        }
    }

    /// Load a template from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| WavebookError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let template: Template = serde_json::from_str(&content)?;
        template.validate()?;
        Ok(template)
    }

    /// Check things that do not need data: scalar names are unique and
    /// every scalar section names a defined scalar.
    pub fn validate(&self) -> Result<()> {
        for (i, scalar) in self.scalars.iter().enumerate() {
            if self.scalars[..i].iter().any(|s| s.name == scalar.name) {
                return Err(WavebookError::config(
                    &scalar.name,
                    "scalar is defined twice",
                ));
            }
            if RESERVED.contains(&scalar.name.as_str()) {
                return Err(WavebookError::config(
                    &scalar.name,
                    "scalar name is reserved for run parameters",
                ));
            }
        }
        for section in &self.sections {
            if let Section::Scalar { name, .. } = section {
                if !self.scalars.iter().any(|s| &s.name == name) {
                    return Err(WavebookError::config(
                        name,
                        "scalar section refers to an undefined scalar",
                    ));
                }
            }
        }
        Ok(())
    }

    /// SHA-256 of the template's canonical JSON form.
    pub fn hash(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&json)))
    }

    /// Add a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Add a scalar definition.
    pub fn with_scalar(mut self, name: impl Into<String>, source: ScalarSource) -> Self {
        self.scalars.push(ScalarDef {
            name: name.into(),
            source,
        });
        self
    }

    /// Add a recoding rule.
    pub fn with_rule(mut self, rule: RecodingRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the loader configuration.
    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }
}

/// Placeholder names supplied by the run parameters.
pub(crate) const RESERVED: [&str; 2] = ["source_index", "source_label"];
