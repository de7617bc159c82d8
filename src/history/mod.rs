mod command;
mod controller;
mod describe;
mod entry;
mod journal;

pub use command::{execute, persist, Applied, Command, ExecMode, Touched};
pub use controller::{DispatchOutcome, HistoryController};
pub use describe::{
    calculate_field_diff, describe_create, describe_delete, describe_remove, describe_restore,
    describe_update, location,
};
pub use entry::{HistoryEntry, LogLevel};
pub use journal::{
    catalog_checksum, find_snapshot, list_snapshots, prune_snapshots, save_snapshot, SnapshotEntry,
};
