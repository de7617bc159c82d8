//! Cascade-delete resolution.
//!
//! `resolve_cascade` is pure: it computes which records go away and which
//! links get cut when one entity is deleted. `apply_cascade` then performs the
//! plan on an in-memory catalog and hands back everything needed to put it
//! back (original positions included).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::catalog::Catalog;
use super::error::{CatalogError, CatalogResult};
use super::models::*;

/// A scene's reference to an actor, cut when the actor is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorLink {
    pub scene_id: String,
    pub actor_id: String,
    /// Position inside `actor_ids`.
    pub index: usize,
}

/// A bin or media item whose `scene_id` was cleared because the scene went away.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLink {
    pub kind: EntityKind,
    pub id: String,
    pub scene_id: String,
}

/// A removed record and where it sat in its file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedRecord {
    pub position: usize,
    pub record: Record,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CascadePlan {
    pub target: Option<EntityRef>,
    pub removed: BTreeMap<EntityKind, BTreeSet<String>>,
    pub actor_links: Vec<ActorLink>,
    pub scene_links: Vec<SceneLink>,
}

impl CascadePlan {
    pub fn is_removed(&self, kind: EntityKind, id: &str) -> bool {
        self.removed.get(&kind).is_some_and(|ids| ids.contains(id))
    }

    pub fn removed_count(&self, kind: EntityKind) -> usize {
        self.removed.get(&kind).map_or(0, |ids| ids.len())
    }

    pub fn total_removed(&self) -> usize {
        self.removed.values().map(|ids| ids.len()).sum()
    }

    /// Kinds whose record file changes when the plan is applied.
    pub fn touched_kinds(&self) -> BTreeSet<EntityKind> {
        let mut kinds: BTreeSet<EntityKind> = self
            .removed
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(kind, _)| *kind)
            .collect();
        if !self.actor_links.is_empty() {
            kinds.insert(EntityKind::Scene);
        }
        for link in &self.scene_links {
            kinds.insert(link.kind);
        }
        kinds
    }

    fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        self.removed.entry(kind).or_default().insert(id.to_string())
    }
}

/// Computes everything that has to be removed or detached when `kind`/`id` is deleted.
pub fn resolve_cascade(kind: EntityKind, id: &str, catalog: &Catalog) -> CatalogResult<CascadePlan> {
    if !catalog.contains(kind, id) {
        return Err(CatalogError::not_found(kind, id));
    }

    let mut plan = CascadePlan {
        target: Some(EntityRef::new(kind, id)),
        ..Default::default()
    };
    plan.remove(kind, id);

    if matches!(kind, EntityKind::Actor | EntityKind::Scene) {
        for bin in catalog.bins.iter().filter(|b| b.owner().points_at(kind, id)) {
            plan.remove(EntityKind::Bin, &bin.id);
        }
        // Media can name an owner directly, independent of its bin.
        for media in catalog.media.iter().filter(|m| m.owner().points_at(kind, id)) {
            plan.remove(EntityKind::Media, &media.id);
        }
    }

    // bins -> media
    for media in &catalog.media {
        if plan.is_removed(EntityKind::Bin, &media.bin_id) {
            plan.remove(EntityKind::Media, &media.id);
        }
    }
    // media -> takes
    for take in &catalog.takes {
        if plan.is_removed(EntityKind::Media, &take.media_id) {
            plan.remove(EntityKind::Take, &take.id);
        }
    }

    match kind {
        EntityKind::Actor => {
            for scene in &catalog.scenes {
                for (index, actor_id) in scene.actor_ids.iter().enumerate() {
                    if actor_id == id {
                        plan.actor_links.push(ActorLink {
                            scene_id: scene.id.clone(),
                            actor_id: actor_id.clone(),
                            index,
                        });
                    }
                }
            }
        }
        EntityKind::Scene => {
            for bin in &catalog.bins {
                if bin.scene_id.as_deref() == Some(id) && !plan.is_removed(EntityKind::Bin, &bin.id) {
                    plan.scene_links.push(SceneLink {
                        kind: EntityKind::Bin,
                        id: bin.id.clone(),
                        scene_id: id.to_string(),
                    });
                }
            }
            for media in &catalog.media {
                if media.scene_id.as_deref() == Some(id)
                    && !plan.is_removed(EntityKind::Media, &media.id)
                {
                    plan.scene_links.push(SceneLink {
                        kind: EntityKind::Media,
                        id: media.id.clone(),
                        scene_id: id.to_string(),
                    });
                }
            }
        }
        _ => {}
    }

    Ok(plan)
}

/// What `apply_cascade` took out of the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovedRecords {
    /// Root-to-leaf by kind, ascending position within a kind.
    pub records: Vec<PlacedRecord>,
    pub actor_links: Vec<ActorLink>,
    pub scene_links: Vec<SceneLink>,
}

/// Performs `plan` on `catalog`.
pub fn apply_cascade(plan: &CascadePlan, catalog: &mut Catalog) -> RemovedRecords {
    let mut removed = RemovedRecords::default();

    for kind in EntityKind::ALL {
        let Some(ids) = plan.removed.get(&kind) else {
            continue;
        };
        let mut placed: Vec<PlacedRecord> = ids
            .iter()
            .filter_map(|id| {
                let position = catalog.position(kind, id)?;
                let record = catalog.get(kind, id)?;
                Some(PlacedRecord { position, record })
            })
            .collect();
        placed.sort_by_key(|p| p.position);
        for entry in &placed {
            catalog.remove(kind, entry.record.id());
        }
        removed.records.extend(placed);
    }

    // Highest index first so earlier indices stay valid.
    for link in plan.actor_links.iter().rev() {
        if let Some(scene) = catalog.scenes.iter_mut().find(|s| s.id == link.scene_id) {
            if scene.actor_ids.get(link.index) == Some(&link.actor_id) {
                scene.actor_ids.remove(link.index);
                removed.actor_links.push(link.clone());
            }
        }
    }
    removed.actor_links.reverse();

    for link in &plan.scene_links {
        let slot = match link.kind {
            EntityKind::Bin => catalog
                .bins
                .iter_mut()
                .find(|b| b.id == link.id)
                .map(|b| &mut b.scene_id),
            EntityKind::Media => catalog
                .media
                .iter_mut()
                .find(|m| m.id == link.id)
                .map(|m| &mut m.scene_id),
            _ => None,
        };
        if let Some(scene_id) = slot {
            *scene_id = None;
            removed.scene_links.push(link.clone());
        }
    }

    removed
}

/// Puts back what `apply_cascade` removed.
///
/// Fails with `Conflict` if any of the records exists again, leaving `catalog`
/// untouched.
pub fn restore_removed(removed: &RemovedRecords, catalog: &mut Catalog) -> CatalogResult<()> {
    for entry in &removed.records {
        if catalog.contains(entry.record.kind(), entry.record.id()) {
            return Err(CatalogError::Conflict(format!(
                "{} '{}' already exists",
                entry.record.kind(),
                entry.record.id()
            )));
        }
    }

    for entry in &removed.records {
        catalog.insert(entry.record.clone(), Some(entry.position));
    }

    for link in &removed.actor_links {
        if let Some(scene) = catalog.scenes.iter_mut().find(|s| s.id == link.scene_id) {
            let index = link.index.min(scene.actor_ids.len());
            scene.actor_ids.insert(index, link.actor_id.clone());
        }
    }

    for link in &removed.scene_links {
        match link.kind {
            EntityKind::Bin => {
                if let Some(bin) = catalog.bins.iter_mut().find(|b| b.id == link.id) {
                    bin.scene_id = Some(link.scene_id.clone());
                }
            }
            EntityKind::Media => {
                if let Some(media) = catalog.media.iter_mut().find(|m| m.id == link.id) {
                    media.scene_id = Some(link.scene_id.clone());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

impl RemovedRecords {
    /// Kinds whose record file changes when these records are restored.
    pub fn touched_kinds(&self) -> BTreeSet<EntityKind> {
        let mut kinds: BTreeSet<EntityKind> = self.records.iter().map(|r| r.record.kind()).collect();
        if !self.actor_links.is_empty() {
            kinds.insert(EntityKind::Scene);
        }
        for link in &self.scene_links {
            kinds.insert(link.kind);
        }
        kinds
    }
}
