//! Per-project file layout and the context object passed to every catalog call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::error::{CatalogError, CatalogResult};
use super::models::EntityKind;
use super::record_store::ensure_exists;

pub const ACTORS_FILE: &str = "actors.jsonl";
pub const SCENES_FILE: &str = "scenes.jsonl";
pub const BINS_FILE: &str = "bins.jsonl";
pub const MEDIA_FILE: &str = "media.jsonl";
pub const TAKES_FILE: &str = "takes.jsonl";
pub const SNAPSHOTS_FILE: &str = "snapshots.jsonl";
pub const HISTORY_FILE: &str = "history.jsonl";

pub const DEFAULT_MAX_SNAPSHOTS: usize = 50;

/// Paths of every file belonging to one project directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub actors: PathBuf,
    pub scenes: PathBuf,
    pub bins: PathBuf,
    pub media: PathBuf,
    pub takes: PathBuf,
    pub snapshots: PathBuf,
    pub history: PathBuf,
}

impl ProjectPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        ProjectPaths {
            actors: root.join(ACTORS_FILE),
            scenes: root.join(SCENES_FILE),
            bins: root.join(BINS_FILE),
            media: root.join(MEDIA_FILE),
            takes: root.join(TAKES_FILE),
            snapshots: root.join(SNAPSHOTS_FILE),
            history: root.join(HISTORY_FILE),
            root,
        }
    }

    /// Record file of an entity kind.
    pub fn for_kind(&self, kind: EntityKind) -> &Path {
        match kind {
            EntityKind::Actor => &self.actors,
            EntityKind::Scene => &self.scenes,
            EntityKind::Bin => &self.bins,
            EntityKind::Media => &self.media,
            EntityKind::Take => &self.takes,
        }
    }

    /// Record files root-to-leaf, then the snapshot journal and the history feed.
    pub fn all_files(&self) -> [&Path; 7] {
        [
            &self.actors,
            &self.scenes,
            &self.bins,
            &self.media,
            &self.takes,
            &self.snapshots,
            &self.history,
        ]
    }
}

/// Snapshot journal behaviour for one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalSettings {
    pub snapshots_enabled: bool,
    /// Oldest snapshots beyond this count are pruned. 0 keeps everything.
    pub max_snapshots: usize,
}

impl Default for JournalSettings {
    fn default() -> Self {
        JournalSettings {
            snapshots_enabled: true,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

/// Everything a catalog operation needs to know about the project it works on.
///
/// Cloning is cheap and clones share the same write lock, so every mutation of
/// one project made through this process is serialized.
#[derive(Clone, Debug)]
pub struct ProjectContext {
    paths: ProjectPaths,
    journal: JournalSettings,
    write_lock: Arc<Mutex<()>>,
}

impl ProjectContext {
    /// Opens (creating if needed) the project directory at `root`.
    pub fn open<P: AsRef<Path>>(root: P, journal: JournalSettings) -> CatalogResult<Self> {
        let paths = ProjectPaths::new(root);
        std::fs::create_dir_all(&paths.root).map_err(|e| CatalogError::io(&paths.root, e))?;
        for file in paths.all_files() {
            ensure_exists(file)?;
        }
        info!("Opened project at {}", paths.root.display());
        Ok(ProjectContext {
            paths,
            journal,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn journal_settings(&self) -> &JournalSettings {
        &self.journal
    }

    /// Held for the whole load → validate → snapshot → write sequence.
    pub fn lock_writes(&self) -> CatalogResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| CatalogError::Conflict("project write lock poisoned".to_string()))
    }
}
