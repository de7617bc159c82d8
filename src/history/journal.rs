//! Snapshot journal: full copies of the catalog taken right before a mutation
//! is written, kept for recovery and audit.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::catalog_store::{
    append, new_id, now_timestamp, read_all, replace_all, CatalogError, CatalogResult, Catalog,
    EntityKind, ProjectPaths,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub created_at: String,
    /// Describes the change that was about to be applied.
    pub message: String,
    /// Hex SHA-256 of the serialized catalog.
    pub checksum: String,
    pub catalog: Catalog,
}

impl SnapshotEntry {
    pub fn verify(&self) -> CatalogResult<()> {
        if catalog_checksum(&self.catalog)? == self.checksum {
            Ok(())
        } else {
            Err(CatalogError::SnapshotCorrupted(self.id.clone()))
        }
    }

    /// Record counts in `EntityKind::ALL` order.
    pub fn counts(&self) -> [usize; 5] {
        EntityKind::ALL.map(|kind| self.catalog.count(kind))
    }
}

pub fn catalog_checksum(catalog: &Catalog) -> CatalogResult<String> {
    let serialized = serde_json::to_string(catalog)?;
    Ok(format!("{:x}", Sha256::digest(serialized.as_bytes())))
}

/// Appends a snapshot of `catalog` to the project's snapshot file.
pub fn save_snapshot(paths: &ProjectPaths, message: &str, catalog: &Catalog) -> CatalogResult<SnapshotEntry> {
    let entry = SnapshotEntry {
        id: new_id(),
        created_at: now_timestamp(),
        message: message.to_string(),
        checksum: catalog_checksum(catalog)?,
        catalog: catalog.clone(),
    };
    append(&paths.snapshots, &entry)?;
    Ok(entry)
}

/// Oldest first.
pub fn list_snapshots(paths: &ProjectPaths) -> CatalogResult<Vec<SnapshotEntry>> {
    read_all(&paths.snapshots)
}

pub fn find_snapshot(paths: &ProjectPaths, id: &str) -> CatalogResult<SnapshotEntry> {
    list_snapshots(paths)?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| CatalogError::SnapshotNotFound(id.to_string()))
}

/// Keeps only the newest `max` snapshots. `max == 0` keeps everything.
/// Returns how many were dropped.
pub fn prune_snapshots(paths: &ProjectPaths, max: usize) -> CatalogResult<usize> {
    if max == 0 {
        return Ok(0);
    }
    let snapshots = list_snapshots(paths)?;
    if snapshots.len() <= max {
        return Ok(0);
    }
    let dropped = snapshots.len() - max;
    replace_all(&paths.snapshots, &snapshots[dropped..])?;
    info!("Pruned {} old snapshots", dropped);
    Ok(dropped)
}
