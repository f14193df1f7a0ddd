//! Main Wavebook struct: one source through Load → Recode → Tabulate → Assemble.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::RunParameters;
use crate::content::{Assembler, Document, Template};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::input::{DatasetLoader, SourceMetadata};
use crate::recode::{RecodeReport, Recoder};

/// Everything produced for one source before rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSource {
    /// Metadata about the source file.
    pub source: SourceMetadata,
    /// What recoding changed.
    pub recode: RecodeReport,
    /// The assembled document.
    pub document: Document,
}

/// A template prepared for repeated use across sources.
///
/// Rules are compiled once, so a bad rule fails here rather than on the
/// first source.
pub struct Wavebook {
    template: Template,
    loader: DatasetLoader,
    recoder: Recoder,
}

impl Wavebook {
    /// Prepare a template.
    pub fn new(template: Template) -> Result<Self> {
        template.validate()?;
        let recoder = Recoder::compile(&template.rules, template.derived.clone())?;
        let loader = DatasetLoader::new(template.loader.clone());
        info!(
            title = %template.title,
            rules = recoder.rule_count(),
            sections = template.sections.len(),
            "prepared template"
        );
        Ok(Self {
            template,
            loader,
            recoder,
        })
    }

    /// Load and prepare a template file.
    pub fn from_template_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Template::load(path)?)
    }

    /// The template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Load and recode one source.
    pub fn prepare(&self, path: impl AsRef<Path>) -> Result<(Dataset, SourceMetadata, RecodeReport)> {
        let (dataset, metadata) = self.loader.load(path)?;
        let (dataset, report) = self.recoder.recode(dataset)?;
        Ok((dataset, metadata, report))
    }

    /// Run one source through the whole pipeline up to rendering.
    pub fn process(&self, path: impl AsRef<Path>, params: &RunParameters) -> Result<ProcessedSource> {
        let path = path.as_ref();
        info!(source = %params.label, path = %path.display(), "processing source");

        let (dataset, source, recode) = self.prepare(path)?;
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            changed = recode.columns_changed,
            added = recode.columns_added.len(),
            "recoded dataset"
        );

        let document = Assembler::new(&self.template).assemble(&dataset, params)?;

        Ok(ProcessedSource {
            source,
            recode,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Section;
    use crate::input::LoaderConfig;
    use crate::recode::RecodingRule;
    use crate::tabulate::CrossTabSpec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn data_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"approve,sex,weight\n\
              Approve,Male,1.5\n\
              Disapprove,Female,1.0\n\
              Refused (VOL.),Female,0.5\n\
              Approve,Female,1.0\n",
        )
        .unwrap();
        file
    }

    #[test]
    fn test_process_single_source() {
        let template = Template::new("Approval: {{source_label}}")
            .with_loader(LoaderConfig::new().with_weight("weight").with_required("approve"))
            .with_rule(
                RecodingRule::for_column("approve", "approve")
                    .with_collapse("refused", "Don't know"),
            )
            .with_section(Section::Table {
                table: CrossTabSpec::two_way("approve", "sex"),
                caption: None,
            });

        let wavebook = Wavebook::new(template).unwrap();
        let file = data_file();
        let params = RunParameters {
            source_index: 1,
            label: "Jan16".to_string(),
            output: "jan16.md".into(),
        };
        let processed = wavebook.process(file.path(), &params).unwrap();

        assert_eq!(processed.document.title, "Approval: Jan16");
        assert_eq!(processed.recode.columns_changed, 1);
        assert_eq!(processed.source.row_count, 4);
        assert_eq!(processed.document.count("table"), 1);
    }

    #[test]
    fn test_bad_rule_fails_at_construction() {
        let template = Template::new("t").with_rule(
            RecodingRule::for_column("r", "q").with_collapse("(", "x"),
        );
        assert!(Wavebook::new(template).is_err());
    }
}
