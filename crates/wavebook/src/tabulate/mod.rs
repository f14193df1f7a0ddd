//! Weighted frequency tables and cross-tabulations.
//!
//! Cell values are kept at full precision; rounding happens only when a
//! result is formatted for display.

mod engine;
mod result;
mod spec;

pub use engine::tabulate;
pub use result::{format_value, TabulationResult};
pub use spec::{CrossTabSpec, ValueTransform};
