//! Prompt System - Phase templates and budgeted context assembly
//!
//! This module provides:
//! - `PromptRenderer`, a thin Handlebars wrapper
//! - Built-in system and user templates for every phase
//! - `render_record` for turning phase records into transcript context
//! - `PromptBuilder`, which fits memory and transcript into a token budget

mod budget;
mod builder;
mod render;
mod templates;
mod transcript;

pub use budget::{TRUNCATION_MARKER, fit_entries, truncate_to_tokens};
pub use builder::{DEFAULT_PROMPT_BUDGET, Prompt, PromptBuilder, PromptVars};
pub use render::PromptRenderer;
pub use templates::{SYSTEM_TEMPLATE_NAME, USER_TEMPLATE_NAME, instruction, offers_tools, task};
pub use transcript::{MAX_RESULT_CHARS, render_record};
