//! Wavebook: batch reports from repeated survey waves.
//!
//! One template describes the analysis once: how to load a wave, how to
//! normalize its inconsistent category labels, which weighted tables to
//! compute, and how to lay them out between narrative text. A batch
//! configuration then lists, in the order they should appear, which
//! discovered file each document is built from.
//!
//! # Pipeline
//!
//! - **Discover** data files under a root ([`input::discover`])
//! - **Load** one file into a typed [`Dataset`]
//! - **Recode** categorical labels with ordered, idempotent rules
//! - **Tabulate** weighted frequencies and cross-tabs
//! - **Assemble** a [`Document`] of content blocks
//! - **Render** through a [`RenderBackend`] and record provenance
//!
//! # Example
//!
//! ```no_run
//! use wavebook::{BatchConfig, run_batch};
//!
//! let config = BatchConfig::load("batch.json").unwrap();
//! let report = run_batch(&config).unwrap();
//!
//! println!("Succeeded: {}", report.succeeded());
//! println!("Failed: {}", report.failed());
//! ```

pub mod batch;
pub mod content;
pub mod dataset;
pub mod error;
pub mod input;
pub mod recode;
pub mod render;
pub mod tabulate;

mod wavebook;

pub use crate::wavebook::{ProcessedSource, Wavebook};
pub use batch::{
    run_batch, BatchConfig, BatchDriver, BatchReport, ProvenanceRecord, RenderOutcome,
    RenderResult, RunParameters,
};
pub use content::{assemble, ContentBlock, Document, Template};
pub use dataset::{Dataset, LabelSet};
pub use error::{ErrorKind, Result, WavebookError};
pub use input::{discover, DataSource, DatasetLoader, LoaderConfig, SourceMetadata};
pub use recode::{DerivedVariable, RecodeReport, Recoder, RecodingRule};
pub use render::{backend_for, OutputFormat, RenderBackend};
pub use tabulate::{tabulate, CrossTabSpec, TabulationResult, ValueTransform};
