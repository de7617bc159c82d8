//! In-memory aggregate of every record file of a project.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::CatalogResult;
use super::models::*;
use super::project::ProjectPaths;
use super::record_store::{read_all, replace_all};

/// All entities of a project, in file order.
///
/// A `Catalog` is loaded once per logical operation and thrown away afterwards;
/// it is never kept around as a cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub actors: Vec<Actor>,
    pub scenes: Vec<Scene>,
    pub bins: Vec<Bin>,
    pub media: Vec<Media>,
    pub takes: Vec<Take>,
}

pub fn load_catalog(paths: &ProjectPaths) -> CatalogResult<Catalog> {
    let catalog = Catalog {
        actors: read_all(&paths.actors)?,
        scenes: read_all(&paths.scenes)?,
        bins: read_all(&paths.bins)?,
        media: read_all(&paths.media)?,
        takes: read_all(&paths.takes)?,
    };
    debug!(
        "Loaded catalog from {}: {} actors, {} scenes, {} bins, {} media, {} takes",
        paths.root.display(),
        catalog.actors.len(),
        catalog.scenes.len(),
        catalog.bins.len(),
        catalog.media.len(),
        catalog.takes.len()
    );
    Ok(catalog)
}

trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! impl_keyed {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_keyed!(Actor, Scene, Bin, Media, Take);

fn position_in<T: Keyed>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == id)
}

fn insert_into<T>(items: &mut Vec<T>, item: T, position: Option<usize>) -> usize {
    let index = position.map_or(items.len(), |p| p.min(items.len()));
    items.insert(index, item);
    index
}

fn remove_from<T: Keyed>(items: &mut Vec<T>, id: &str) -> Option<(usize, T)> {
    let index = position_in(items, id)?;
    Some((index, items.remove(index)))
}

fn replace_in<T: Keyed>(items: &mut [T], item: T) -> Option<T> {
    let index = position_in(items, item.key())?;
    Some(std::mem::replace(&mut items[index], item))
}

impl Catalog {
    pub fn get_actor(&self, id: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn get_scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn get_bin(&self, id: &str) -> Option<&Bin> {
        self.bins.iter().find(|b| b.id == id)
    }

    pub fn get_media(&self, id: &str) -> Option<&Media> {
        self.media.iter().find(|m| m.id == id)
    }

    pub fn get_take(&self, id: &str) -> Option<&Take> {
        self.takes.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.position(kind, id).is_some()
    }

    /// Index of the record in its file.
    pub fn position(&self, kind: EntityKind, id: &str) -> Option<usize> {
        match kind {
            EntityKind::Actor => position_in(&self.actors, id),
            EntityKind::Scene => position_in(&self.scenes, id),
            EntityKind::Bin => position_in(&self.bins, id),
            EntityKind::Media => position_in(&self.media, id),
            EntityKind::Take => position_in(&self.takes, id),
        }
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        match kind {
            EntityKind::Actor => self.get_actor(id).cloned().map(Record::Actor),
            EntityKind::Scene => self.get_scene(id).cloned().map(Record::Scene),
            EntityKind::Bin => self.get_bin(id).cloned().map(Record::Bin),
            EntityKind::Media => self.get_media(id).cloned().map(Record::Media),
            EntityKind::Take => self.get_take(id).cloned().map(Record::Take),
        }
    }

    /// Every record of `kind`, in file order.
    pub fn records(&self, kind: EntityKind) -> Vec<Record> {
        match kind {
            EntityKind::Actor => self.actors.iter().cloned().map(Record::Actor).collect(),
            EntityKind::Scene => self.scenes.iter().cloned().map(Record::Scene).collect(),
            EntityKind::Bin => self.bins.iter().cloned().map(Record::Bin).collect(),
            EntityKind::Media => self.media.iter().cloned().map(Record::Media).collect(),
            EntityKind::Take => self.takes.iter().cloned().map(Record::Take).collect(),
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Actor => self.actors.len(),
            EntityKind::Scene => self.scenes.len(),
            EntityKind::Bin => self.bins.len(),
            EntityKind::Media => self.media.len(),
            EntityKind::Take => self.takes.len(),
        }
    }

    /// Inserts at `position` (clamped), or appends when `None`. Returns the index used.
    pub fn insert(&mut self, record: Record, position: Option<usize>) -> usize {
        match record {
            Record::Actor(r) => insert_into(&mut self.actors, r, position),
            Record::Scene(r) => insert_into(&mut self.scenes, r, position),
            Record::Bin(r) => insert_into(&mut self.bins, r, position),
            Record::Media(r) => insert_into(&mut self.media, r, position),
            Record::Take(r) => insert_into(&mut self.takes, r, position),
        }
    }

    /// Removes a single record, without any cascade.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> Option<(usize, Record)> {
        match kind {
            EntityKind::Actor => remove_from(&mut self.actors, id).map(|(i, r)| (i, Record::Actor(r))),
            EntityKind::Scene => remove_from(&mut self.scenes, id).map(|(i, r)| (i, Record::Scene(r))),
            EntityKind::Bin => remove_from(&mut self.bins, id).map(|(i, r)| (i, Record::Bin(r))),
            EntityKind::Media => remove_from(&mut self.media, id).map(|(i, r)| (i, Record::Media(r))),
            EntityKind::Take => remove_from(&mut self.takes, id).map(|(i, r)| (i, Record::Take(r))),
        }
    }

    /// Swaps in `record` for the one with the same id, returning the previous version.
    pub fn replace(&mut self, record: Record) -> Option<Record> {
        match record {
            Record::Actor(r) => replace_in(&mut self.actors, r).map(Record::Actor),
            Record::Scene(r) => replace_in(&mut self.scenes, r).map(Record::Scene),
            Record::Bin(r) => replace_in(&mut self.bins, r).map(Record::Bin),
            Record::Media(r) => replace_in(&mut self.media, r).map(Record::Media),
            Record::Take(r) => replace_in(&mut self.takes, r).map(Record::Take),
        }
    }

    /// Display name of the owner, `None` for the global scope or a dangling id.
    pub fn owner_name(&self, owner: &OwnerRef) -> Option<String> {
        let id = owner.owner_id.as_deref()?;
        match owner.owner_type {
            OwnerType::Actor => self.get_actor(id).map(|a| a.display_name.clone()),
            OwnerType::Scene => self.get_scene(id).map(|s| s.name.clone()),
            OwnerType::Global => None,
        }
    }

    /// Records that hold a reference to `kind`/`id` through any foreign key.
    pub fn dependents_of(&self, kind: EntityKind, id: &str) -> Vec<EntityRef> {
        let mut out = Vec::new();
        match kind {
            EntityKind::Actor | EntityKind::Scene => {
                for bin in &self.bins {
                    let linked = kind == EntityKind::Scene && bin.scene_id.as_deref() == Some(id);
                    if bin.owner().points_at(kind, id) || linked {
                        out.push(EntityRef::new(EntityKind::Bin, &bin.id));
                    }
                }
                for media in &self.media {
                    let linked = kind == EntityKind::Scene && media.scene_id.as_deref() == Some(id);
                    if media.owner().points_at(kind, id) || linked {
                        out.push(EntityRef::new(EntityKind::Media, &media.id));
                    }
                }
                if kind == EntityKind::Actor {
                    for scene in &self.scenes {
                        if scene.actor_ids.iter().any(|a| a == id) {
                            out.push(EntityRef::new(EntityKind::Scene, &scene.id));
                        }
                    }
                }
            }
            EntityKind::Bin => {
                for media in self.media.iter().filter(|m| m.bin_id == id) {
                    out.push(EntityRef::new(EntityKind::Media, &media.id));
                }
            }
            EntityKind::Media => {
                for take in self.takes.iter().filter(|t| t.media_id == id) {
                    out.push(EntityRef::new(EntityKind::Take, &take.id));
                }
            }
            EntityKind::Take => {}
        }
        out
    }

    /// Number the next take of `media_id` must receive: the media's high-water
    /// mark, or one past the highest existing take if that is larger.
    pub fn next_take_number(&self, media_id: &str) -> Option<u32> {
        let media = self.get_media(media_id)?;
        let highest = self
            .takes
            .iter()
            .filter(|t| t.media_id == media_id)
            .map(|t| t.take_number)
            .max()
            .unwrap_or(0);
        Some(media.next_take_number.max(highest + 1))
    }

    /// Raises each media's high-water mark to at least the number `newer`
    /// would hand out next for the same media id.
    pub fn keep_take_numbers_from(&mut self, newer: &Catalog) {
        for media in &mut self.media {
            if let Some(next) = newer.next_take_number(&media.id) {
                media.next_take_number = media.next_take_number.max(next);
            }
        }
    }

    /// Rewrites the record file of one kind.
    pub fn write_kind(&self, paths: &ProjectPaths, kind: EntityKind) -> CatalogResult<()> {
        let path = paths.for_kind(kind);
        match kind {
            EntityKind::Actor => replace_all(path, &self.actors),
            EntityKind::Scene => replace_all(path, &self.scenes),
            EntityKind::Bin => replace_all(path, &self.bins),
            EntityKind::Media => replace_all(path, &self.media),
            EntityKind::Take => replace_all(path, &self.takes),
        }
    }

    /// Rewrites every record file, leaf kinds first.
    pub fn write_all(&self, paths: &ProjectPaths) -> CatalogResult<()> {
        for kind in EntityKind::ALL.iter().rev() {
            self.write_kind(paths, *kind)?;
        }
        Ok(())
    }
}
