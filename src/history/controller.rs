//! Undo/redo controller.
//!
//! Every mutation goes through the same write section, held under the
//! project's write lock: load the catalog, execute the command (which
//! validates it), journal a snapshot of the previous state, write the changed
//! record files and append to the history feed. A command that fails
//! validation stops before anything is written.
//!
//! History entries are addressed by id, so any operation can be undone or
//! redone independently of the ones after it.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::command::{execute, persist, Command, ExecMode};
use super::entry::{HistoryEntry, LogLevel};
use super::journal::{find_snapshot, list_snapshots, prune_snapshots, save_snapshot, SnapshotEntry};
use crate::catalog_store::{
    append, check_integrity, load_catalog, now_timestamp, read_all, replace_all, CatalogError,
    CatalogResult, Catalog, EntityKind, IntegrityReport, ProjectContext, Record, Take, TakeDraft,
    TakeStatus,
};

/// Result of a dispatch, undo or redo.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub message: String,
    /// History entry written for this call: the operation, the undo/redo
    /// record, or the error log on failure.
    pub entry_id: String,
    pub inverse: Option<Command>,
}

pub struct HistoryController {
    ctx: ProjectContext,
}

impl HistoryController {
    /// Wraps an opened project. Unless built with `no_checks`, the catalog is
    /// audited once and problems are logged.
    pub fn open(ctx: ProjectContext) -> CatalogResult<Self> {
        let controller = HistoryController { ctx };
        #[cfg(not(feature = "no_checks"))]
        {
            let catalog = load_catalog(controller.ctx.paths())?;
            crate::catalog_store::audit(&catalog);
        }
        Ok(controller)
    }

    pub fn context(&self) -> &ProjectContext {
        &self.ctx
    }

    /// Fresh copy of the catalog.
    pub fn catalog(&self) -> CatalogResult<Catalog> {
        load_catalog(self.ctx.paths())
    }

    pub fn check(&self) -> CatalogResult<IntegrityReport> {
        Ok(check_integrity(&self.catalog()?))
    }

    /// Oldest first.
    pub fn history(&self) -> CatalogResult<Vec<HistoryEntry>> {
        read_all(&self.ctx.paths().history)
    }

    pub fn snapshots(&self) -> CatalogResult<Vec<SnapshotEntry>> {
        list_snapshots(self.ctx.paths())
    }

    pub fn dispatch(&self, command: Command) -> CatalogResult<DispatchOutcome> {
        self.commit(|_| Ok((command, ()))).map(|(outcome, _)| outcome)
    }

    /// Runs the write section with a command built from the freshly loaded
    /// catalog, so derived values (take numbers) are computed under the lock.
    fn commit<T, F>(&self, build: F) -> CatalogResult<(DispatchOutcome, T)>
    where
        F: FnOnce(&Catalog) -> CatalogResult<(Command, T)>,
    {
        let _guard = self.ctx.lock_writes()?;
        let paths = self.ctx.paths();

        let mut catalog = load_catalog(paths)?;
        let (command, extra) = build(&catalog)?;
        let before = catalog.clone();
        let applied = execute(&command, &mut catalog, ExecMode::Fresh)?;

        self.journal(&applied.message, &before)?;
        persist(&catalog, &applied.touched, paths)?;

        let entry = HistoryEntry::operation(applied.message.clone(), command, applied.inverse.clone());
        let entry_id = entry.id().to_string();
        append(&paths.history, &entry)?;
        info!("{}", applied.message);

        Ok((
            DispatchOutcome {
                success: true,
                message: applied.message,
                entry_id,
                inverse: Some(applied.inverse),
            },
            extra,
        ))
    }

    fn journal(&self, message: &str, before: &Catalog) -> CatalogResult<()> {
        let settings = self.ctx.journal_settings();
        if !settings.snapshots_enabled {
            return Ok(());
        }
        save_snapshot(self.ctx.paths(), message, before)?;
        prune_snapshots(self.ctx.paths(), settings.max_snapshots)?;
        Ok(())
    }

    /// Executes the inverse of operation `entry_id` and marks it undone.
    pub fn undo(&self, entry_id: &str) -> CatalogResult<DispatchOutcome> {
        let _guard = self.ctx.lock_writes()?;
        let paths = self.ctx.paths();
        let mut entries: Vec<HistoryEntry> = read_all(&paths.history)?;
        let index = find_entry(&entries, entry_id)?;

        let (message, command, inverse) = match &entries[index] {
            HistoryEntry::Operation {
                undone: false,
                message,
                command,
                inverse,
                ..
            } => (message.clone(), command.clone(), inverse.clone()),
            HistoryEntry::Operation { .. } => {
                return Err(invalid("undo", entry_id, "operation is already undone".to_string()))
            }
            other => {
                return Err(invalid(
                    "undo",
                    entry_id,
                    format!("{} entries cannot be undone", other.label()),
                ))
            }
        };

        let mut catalog = load_catalog(paths)?;
        let before = catalog.clone();
        let applied = match execute(&inverse, &mut catalog, ExecMode::Replay) {
            Ok(applied) => applied,
            Err(err) => return self.record_failure("Undo", entry_id, &message, err),
        };

        let text = format!("Undo: {}", message);
        self.journal(&text, &before)?;
        persist(&catalog, &applied.touched, paths)?;

        if let HistoryEntry::Operation { undone, .. } = &mut entries[index] {
            *undone = true;
        }
        let entry = HistoryEntry::undo(text.clone(), entry_id);
        let new_id = entry.id().to_string();
        entries.push(entry);
        replace_all(&paths.history, &entries)?;
        info!("{}", text);

        Ok(DispatchOutcome {
            success: true,
            message: text,
            entry_id: new_id,
            inverse: Some(command),
        })
    }

    /// Re-executes undone operation `entry_id`.
    pub fn redo(&self, entry_id: &str) -> CatalogResult<DispatchOutcome> {
        let _guard = self.ctx.lock_writes()?;
        let paths = self.ctx.paths();
        let mut entries: Vec<HistoryEntry> = read_all(&paths.history)?;
        let index = find_entry(&entries, entry_id)?;

        let (message, command) = match &entries[index] {
            HistoryEntry::Operation {
                undone: true,
                message,
                command,
                ..
            } => (message.clone(), command.clone()),
            HistoryEntry::Operation { .. } => {
                return Err(invalid("redo", entry_id, "operation is not undone".to_string()))
            }
            other => {
                return Err(invalid(
                    "redo",
                    entry_id,
                    format!("{} entries cannot be redone", other.label()),
                ))
            }
        };

        let mut catalog = load_catalog(paths)?;
        let before = catalog.clone();
        let applied = match execute(&command, &mut catalog, ExecMode::Replay) {
            Ok(applied) => applied,
            Err(err) => return self.record_failure("Redo", entry_id, &message, err),
        };

        let text = format!("Redo: {}", message);
        self.journal(&text, &before)?;
        persist(&catalog, &applied.touched, paths)?;

        if let HistoryEntry::Operation {
            undone, inverse, ..
        } = &mut entries[index]
        {
            *undone = false;
            *inverse = applied.inverse.clone();
        }
        let entry = HistoryEntry::redo(text.clone(), entry_id);
        let new_id = entry.id().to_string();
        entries.push(entry);
        replace_all(&paths.history, &entries)?;
        info!("{}", text);

        Ok(DispatchOutcome {
            success: true,
            message: text,
            entry_id: new_id,
            inverse: Some(applied.inverse),
        })
    }

    fn record_failure(
        &self,
        action: &str,
        entry_id: &str,
        message: &str,
        err: CatalogError,
    ) -> CatalogResult<DispatchOutcome> {
        let text = format!("{} failed for '{}': {}", action, message, err);
        warn!("{}", text);
        let details = json!({
            "entry_id": entry_id,
            "error": err.to_string(),
            "violations": err.validation_errors(),
        });
        let entry = HistoryEntry::log(LogLevel::Error, text.clone(), Some(details));
        let log_id = entry.id().to_string();
        append(&self.ctx.paths().history, &entry)?;
        Ok(DispatchOutcome {
            success: false,
            message: text,
            entry_id: log_id,
            inverse: None,
        })
    }

    /// Appends a non-undoable entry to the history feed. Returns its id.
    pub fn log(&self, level: LogLevel, message: &str, details: Option<Value>) -> CatalogResult<String> {
        let _guard = self.ctx.lock_writes()?;
        let entry = HistoryEntry::log(level, message.to_string(), details);
        append(&self.ctx.paths().history, &entry)?;
        Ok(entry.id().to_string())
    }

    pub fn create(&self, record: Record) -> CatalogResult<DispatchOutcome> {
        self.dispatch(Command::Create { record })
    }

    /// Cascading delete.
    pub fn delete(&self, kind: EntityKind, id: &str) -> CatalogResult<DispatchOutcome> {
        self.dispatch(Command::Delete {
            kind,
            id: id.to_string(),
        })
    }

    /// Numbers `draft` after the media's existing takes and records it.
    pub fn generate_take(&self, media_id: &str, draft: TakeDraft) -> CatalogResult<(DispatchOutcome, Take)> {
        self.commit(|catalog| {
            let number = catalog
                .next_take_number(media_id)
                .ok_or_else(|| CatalogError::not_found(EntityKind::Media, media_id))?;
            let take = draft.into_take(media_id, number);
            Ok((
                Command::Create {
                    record: Record::Take(take.clone()),
                },
                take,
            ))
        })
    }

    pub fn set_take_status(&self, take_id: &str, status: TakeStatus) -> CatalogResult<DispatchOutcome> {
        self.modify(EntityKind::Take, take_id, |record| {
            if let Record::Take(take) = record {
                take.status = status;
            }
            Ok(())
        })
    }

    pub fn rename(&self, kind: EntityKind, id: &str, name: &str) -> CatalogResult<DispatchOutcome> {
        self.modify(kind, id, |record| {
            match record {
                Record::Actor(r) => r.display_name = name.to_string(),
                Record::Scene(r) => r.name = name.to_string(),
                Record::Bin(r) => r.name = name.to_string(),
                Record::Media(r) => r.name = name.to_string(),
                Record::Take(_) => return Err(CatalogError::Conflict("takes have no name".to_string())),
            }
            Ok(())
        })
    }

    pub fn set_complete(&self, kind: EntityKind, id: &str, complete: bool) -> CatalogResult<DispatchOutcome> {
        self.modify(kind, id, |record| {
            match record {
                Record::Actor(r) => r.complete = complete,
                Record::Scene(r) => r.complete = complete,
                Record::Bin(r) => r.complete = complete,
                Record::Media(r) => r.complete = complete,
                Record::Take(_) => {
                    return Err(CatalogError::Conflict(
                        "takes have a status, not a completion flag".to_string(),
                    ))
                }
            }
            Ok(())
        })
    }

    fn modify<F>(&self, kind: EntityKind, id: &str, change: F) -> CatalogResult<DispatchOutcome>
    where
        F: FnOnce(&mut Record) -> CatalogResult<()>,
    {
        self.commit(|catalog| {
            let mut record = catalog
                .get(kind, id)
                .ok_or_else(|| CatalogError::not_found(kind, id))?;
            change(&mut record)?;
            record.set_updated_at(now_timestamp());
            Ok((Command::Update { record }, ()))
        })
        .map(|(outcome, _)| outcome)
    }

    /// Replaces every record file with the content of snapshot `snapshot_id`.
    ///
    /// The current state is journaled first. Earlier history entries are kept,
    /// but their inverses may no longer apply.
    pub fn restore_snapshot(&self, snapshot_id: &str) -> CatalogResult<String> {
        let _guard = self.ctx.lock_writes()?;
        let paths = self.ctx.paths();

        let mut snapshot = find_snapshot(paths, snapshot_id)?;
        snapshot.verify()?;

        let current = load_catalog(paths)?;
        self.journal(&format!("Before restoring snapshot {}", snapshot_id), &current)?;
        // Take numbers handed out since the snapshot stay used.
        snapshot.catalog.keep_take_numbers_from(&current);
        snapshot.catalog.write_all(paths)?;

        let message = format!("Restored snapshot {} ({})", snapshot_id, snapshot.message);
        let entry = HistoryEntry::log(
            LogLevel::Info,
            message.clone(),
            Some(json!({ "snapshot_id": snapshot_id })),
        );
        append(&paths.history, &entry)?;
        info!("{}", message);
        Ok(message)
    }
}

fn find_entry(entries: &[HistoryEntry], id: &str) -> CatalogResult<usize> {
    entries
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| CatalogError::HistoryEntryNotFound(id.to_string()))
}

fn invalid(action: &'static str, id: &str, reason: String) -> CatalogError {
    CatalogError::InvalidTransition {
        action,
        id: id.to_string(),
        reason,
    }
}
