//! Takebin: a catalog of production audio/visual assets stored as JSON Lines,
//! with referential-integrity checks, cascading deletes, a snapshot journal
//! and per-operation undo/redo.

pub mod catalog_store;
pub mod cli_style;
pub mod config;
pub mod console;
pub mod history;

// Re-export commonly used types for convenience
pub use catalog_store::{Catalog, CatalogError, CatalogResult, ProjectContext, Record};
pub use history::{Command, DispatchOutcome, HistoryController};
