//! Document content: the block model, templates, and the assembler.

mod assembler;
mod block;
mod template;

pub use assembler::{assemble, substitute, Assembler};
pub use block::{ContentBlock, Document, Figure, Series};
pub use template::{ScalarDef, ScalarSource, Section, Template, TemplateParameters};
