//! Input handling: discovery, parsing, and dataset loading.

mod discovery;
mod loader;
mod parser;
mod source;

pub use discovery::{discover, require_sources};
pub use loader::{labels_sidecar_path, DatasetLoader, LoaderConfig};
pub use parser::{Parser, ParserConfig};
pub use source::{DataSource, RawTable, SourceMetadata};
