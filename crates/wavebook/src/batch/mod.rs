//! Batch rendering: one document per configured run, plus one provenance
//! record per batch.

mod config;
mod driver;
mod provenance;

pub use config::{BatchConfig, RunParameters};
pub use driver::{run_batch, BatchDriver, BatchReport, RenderOutcome, RenderResult};
pub use provenance::{ProvenanceRecord, SourceRecord};
