//! Reversible catalog commands.
//!
//! Executing a command against an in-memory catalog yields the inverse command
//! that undoes it, computed from the state the command actually ran on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use super::describe;
use crate::catalog_store::{
    apply_cascade, append, resolve_cascade, restore_removed, validate_record, CascadePlan,
    CatalogError, CatalogResult, Catalog, Check, EntityKind, EntityRef, PlacedRecord,
    ProjectPaths, Record, RemovedRecords,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    /// Appends a new record.
    Create { record: Record },
    /// Replaces the record with the same id.
    Update { record: Record },
    /// Removes one record without cascading. Fails while anything references it.
    Remove { kind: EntityKind, id: String },
    /// Removes a record and everything that depends on it.
    Delete { kind: EntityKind, id: String },
    /// Puts back records taken out by `Remove` or `Delete`.
    Restore {
        target: EntityRef,
        removed: RemovedRecords,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Update { .. } => "update",
            Command::Remove { .. } => "remove",
            Command::Delete { .. } => "delete",
            Command::Restore { .. } => "restore",
        }
    }

    /// The entity the command is about.
    pub fn target(&self) -> EntityRef {
        match self {
            Command::Create { record } | Command::Update { record } => {
                EntityRef::new(record.kind(), record.id())
            }
            Command::Remove { kind, id } | Command::Delete { kind, id } => EntityRef::new(*kind, id),
            Command::Restore { target, .. } => target.clone(),
        }
    }
}

/// Whether a command is a user's first request or a replay by undo/redo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Fresh,
    Replay,
}

/// Which record files a command changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Touched {
    /// Records added at the end of a file that is not otherwise rewritten.
    pub appended: Vec<Record>,
    /// Kinds whose whole file must be rewritten.
    pub rewritten: BTreeSet<EntityKind>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub message: String,
    pub inverse: Command,
    pub touched: Touched,
}

fn validated(record: &Record, catalog: &Catalog, check: Check<'_>) -> CatalogResult<()> {
    let errors = validate_record(record, catalog, check);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(errors))
    }
}

/// Runs `command` against `catalog`. On error the catalog must be discarded.
pub fn execute(command: &Command, catalog: &mut Catalog, mode: ExecMode) -> CatalogResult<Applied> {
    debug!("Executing {} on {}", command.name(), command.target());
    match command {
        Command::Create { record } => create(record, catalog, mode),
        Command::Update { record } => update(record, catalog),
        Command::Remove { kind, id } => remove(*kind, id, catalog),
        Command::Delete { kind, id } => delete(*kind, id, catalog),
        Command::Restore { target, removed } => restore(target, removed, catalog),
    }
}

fn create(record: &Record, catalog: &mut Catalog, mode: ExecMode) -> CatalogResult<Applied> {
    validated(
        record,
        catalog,
        Check::Insert {
            fresh: mode == ExecMode::Fresh,
        },
    )?;
    let message = describe::describe_create(record, catalog);
    catalog.insert(record.clone(), None);

    let mut touched = Touched {
        appended: vec![record.clone()],
        ..Default::default()
    };
    if let Record::Take(take) = record {
        if let Some(media) = catalog.media.iter_mut().find(|m| m.id == take.media_id) {
            if media.next_take_number <= take.take_number {
                media.next_take_number = take.take_number + 1;
                touched.rewritten.insert(EntityKind::Media);
            }
        }
    }

    Ok(Applied {
        message,
        inverse: Command::Remove {
            kind: record.kind(),
            id: record.id().to_string(),
        },
        touched,
    })
}

fn update(record: &Record, catalog: &mut Catalog) -> CatalogResult<Applied> {
    let previous = catalog
        .get(record.kind(), record.id())
        .ok_or_else(|| CatalogError::not_found(record.kind(), record.id()))?;

    let mut record = record.clone();
    // The high-water mark only moves up, whatever version of the media is written.
    if let (Record::Media(new), Record::Media(old)) = (&mut record, &previous) {
        new.next_take_number = new.next_take_number.max(old.next_take_number);
    }

    validated(
        &record,
        catalog,
        Check::Update {
            previous: &previous,
        },
    )?;
    let message = describe::describe_update(&previous, &record, catalog);
    let kind = record.kind();
    catalog.replace(record);

    Ok(Applied {
        message,
        inverse: Command::Update { record: previous },
        touched: Touched {
            rewritten: BTreeSet::from([kind]),
            ..Default::default()
        },
    })
}

fn remove(kind: EntityKind, id: &str, catalog: &mut Catalog) -> CatalogResult<Applied> {
    let record = catalog
        .get(kind, id)
        .ok_or_else(|| CatalogError::not_found(kind, id))?;
    let dependents = catalog.dependents_of(kind, id);
    if !dependents.is_empty() {
        return Err(CatalogError::Conflict(format!(
            "{} '{}' is still referenced by {} records",
            kind,
            record.display_name(),
            dependents.len()
        )));
    }

    let message = describe::describe_remove(&record, catalog);
    let (position, record) = catalog
        .remove(kind, id)
        .ok_or_else(|| CatalogError::not_found(kind, id))?;

    Ok(Applied {
        message,
        inverse: Command::Restore {
            target: EntityRef::new(kind, id),
            removed: RemovedRecords {
                records: vec![PlacedRecord { position, record }],
                ..Default::default()
            },
        },
        touched: Touched {
            rewritten: BTreeSet::from([kind]),
            ..Default::default()
        },
    })
}

fn delete(kind: EntityKind, id: &str, catalog: &mut Catalog) -> CatalogResult<Applied> {
    let plan: CascadePlan = resolve_cascade(kind, id, catalog)?;
    let record = catalog
        .get(kind, id)
        .ok_or_else(|| CatalogError::not_found(kind, id))?;
    let message = describe::describe_delete(&record, &plan, catalog);
    let removed = apply_cascade(&plan, catalog);

    Ok(Applied {
        message,
        inverse: Command::Restore {
            target: EntityRef::new(kind, id),
            removed,
        },
        touched: Touched {
            rewritten: plan.touched_kinds(),
            ..Default::default()
        },
    })
}

fn restore(target: &EntityRef, removed: &RemovedRecords, catalog: &mut Catalog) -> CatalogResult<Applied> {
    restore_removed(removed, catalog)?;

    let mut errors = Vec::new();
    for placed in &removed.records {
        errors.extend(validate_record(&placed.record, catalog, Check::Existing));
    }
    if !errors.is_empty() {
        return Err(CatalogError::Validation(errors));
    }

    let record = catalog
        .get(target.kind, &target.id)
        .ok_or_else(|| CatalogError::not_found(target.kind, &target.id))?;
    let message = describe::describe_restore(&record, removed.records.len(), catalog);

    Ok(Applied {
        message,
        inverse: Command::Delete {
            kind: target.kind,
            id: target.id.clone(),
        },
        touched: Touched {
            rewritten: removed.touched_kinds(),
            ..Default::default()
        },
    })
}

fn append_record(paths: &ProjectPaths, record: &Record) -> CatalogResult<()> {
    let path = paths.for_kind(record.kind());
    match record {
        Record::Actor(r) => append(path, r),
        Record::Scene(r) => append(path, r),
        Record::Bin(r) => append(path, r),
        Record::Media(r) => append(path, r),
        Record::Take(r) => append(path, r),
    }
}

/// Writes what an executed command changed back to the record files.
///
/// Rewritten files are replaced whole; appended records go to the end of
/// files nothing else touched. A failure part-way leaves earlier files written.
pub fn persist(catalog: &Catalog, touched: &Touched, paths: &ProjectPaths) -> CatalogResult<()> {
    for kind in EntityKind::ALL.iter().rev() {
        if touched.rewritten.contains(kind) {
            catalog.write_kind(paths, *kind)?;
        }
    }
    for record in &touched.appended {
        if !touched.rewritten.contains(&record.kind()) {
            append_record(paths, record)?;
        }
    }
    Ok(())
}
