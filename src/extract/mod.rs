//! Invocation Extractor
//!
//! Finds candidate tool invocations in free-text model output. Three
//! surface syntaxes are accepted because models drift from the one they
//! are asked to use:
//!
//! - `EXECUTE: name(key="value", key=123)` (the primary directive)
//! - `tool_execution name(...)`, optionally inside a ``` fence
//! - `{"tool": "name", "parameters": {...}}` embedded in the text
//!
//! Extraction is a pure function of the text. Text without any well-formed
//! invocation yields an empty iterator.

mod parser;

pub use parser::{
    DIRECTIVE_MARKER, Invocations, RawArgument, RawInvocation, SurfaceForm, extract_invocations,
    strip_invocations,
};
