mod cascade;
mod catalog;
mod codec;
mod error;
mod integrity;
mod models;
mod project;
mod record_store;
mod validation;

pub use cascade::{
    apply_cascade, resolve_cascade, restore_removed, ActorLink, CascadePlan, PlacedRecord,
    RemovedRecords, SceneLink,
};
pub use catalog::{load_catalog, Catalog};
pub use codec::{decode_lines, encode_line, encode_lines, Decoded};
pub use error::{CatalogError, CatalogResult};
pub use integrity::{audit, check_integrity, IntegrityProblem, IntegrityReport};
pub use models::*;
pub use project::{
    JournalSettings, ProjectContext, ProjectPaths, ACTORS_FILE, BINS_FILE, DEFAULT_MAX_SNAPSHOTS,
    HISTORY_FILE, MEDIA_FILE, SCENES_FILE, SNAPSHOTS_FILE, TAKES_FILE,
};
pub use record_store::{append, ensure_exists, read_all, replace_all, RecordStore};
pub use validation::{
    resolve_effective_block, validate_record, validate_references, Check, ReferenceReport,
    ValidationError,
};
