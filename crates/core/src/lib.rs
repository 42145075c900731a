//! Tablechat core - question classification and row filtering
//!
//! Maps a natural-language question (plus a model-written description of it)
//! onto a deterministic subset of sheet rows:
//!
//! 1. **Classification** (`intent`) - ordered keyword rules, first match wins
//! 2. **Filtering** (`filter`) - per-intent row predicate, header always kept
//! 3. **Rendering** (`render`) - tab-separated text for the answering model
//!
//! Everything here is synchronous and pure. Fetching the sheet and talking to
//! a model live in `tablechat-agent`.

pub mod config;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod intent;
pub mod profile;
pub mod render;
pub mod table;

pub use errors::{ApplicationError, InterfaceError};
pub use filter::{FilterOutcome, RowFilter};
pub use intent::{ClassifierConfig, Intent, IntentClassifier, IntentKind, IntentRule, Query};
pub use profile::TableProfile;
pub use render::render_tsv;
pub use table::{ColumnLayout, RangeSpec, Row, Table};
