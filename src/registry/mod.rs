//! Tool Registry - the static catalogue of remote operations
//!
//! Consulted by the normalizer, the executor and the prompt builder; never
//! mutated after construction.

mod catalog;
mod definition;

pub use catalog::{ADDRESS_ALIASES, ToolRegistry};
pub use definition::{HttpMethod, ParamKind, ParamSpec, ResultShape, Route, ToolSpec};
