//! Tablechat agent - model calls, sheet access, and orchestration
//!
//! Connects the deterministic engine in `tablechat-core` to the outside:
//! - Reads and writes sheets through a `TableSource` (CSV workbook or memory)
//! - Asks a language model to describe the question (`llm`, `prompts`)
//! - Classifies, filters, and hands the surviving rows back to the model for
//!   a final answer (`runtime`)
//! - Seeds a sheet with sample employees (`setup`)
//!
//! # Flow
//!
//! 1. **Fetch** the configured range; an empty sheet ends the question
//! 2. **Describe** the question with the sheet's schema (temperature 0.0)
//! 3. **Classify and filter** with the core rules
//! 4. **Answer** from the filtered rows only (temperature 0.2)
//!
//! The model never chooses rows. It only phrases the description and the
//! answer around rows the core engine selected.

pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod setup;
pub mod source;

pub use runtime::{AgentRuntime, Answer, Classification};
