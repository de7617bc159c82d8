//! Whole-catalog integrity audit.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::catalog::Catalog;
use super::models::*;
use super::validation::{validate_references, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntegrityProblem {
    pub entity: EntityRef,
    pub error: ValidationError,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub problems: Vec<IntegrityProblem>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

fn reference_problems(record: Record, catalog: &Catalog) -> Vec<IntegrityProblem> {
    let entity = EntityRef::new(record.kind(), record.id());
    let Ok(value) = record.to_value() else {
        return Vec::new();
    };
    validate_references(&value, catalog)
        .errors
        .into_iter()
        .map(|error| IntegrityProblem {
            entity: entity.clone(),
            error,
        })
        .collect()
}

/// Scans every record for dangling references, duplicate names and take
/// numbers that collide with each other or with the media high-water mark.
pub fn check_integrity(catalog: &Catalog) -> IntegrityReport {
    let records: Vec<Record> = EntityKind::ALL
        .into_iter()
        .flat_map(|kind| catalog.records(kind))
        .collect();
    let checked = records.len();

    let mut problems: Vec<IntegrityProblem> = records
        .into_par_iter()
        .flat_map_iter(|record| reference_problems(record, catalog))
        .collect();

    problems.extend(duplicate_ids(catalog));
    problems.extend(duplicate_names(catalog));
    problems.extend(take_number_problems(catalog));

    IntegrityReport { checked, problems }
}

/// Runs `check_integrity` and logs the outcome.
pub fn audit(catalog: &Catalog) -> IntegrityReport {
    let report = check_integrity(catalog);
    if report.is_clean() {
        info!("Integrity check passed ({} records)", report.checked);
    } else {
        for problem in &report.problems {
            warn!("Integrity problem on {}: {}", problem.entity, problem.error);
        }
        warn!(
            "Integrity check found {} problems in {} records",
            report.problems.len(),
            report.checked
        );
    }
    report
}

fn duplicate_ids(catalog: &Catalog) -> Vec<IntegrityProblem> {
    let mut problems = Vec::new();
    for kind in EntityKind::ALL {
        let ids: Vec<&str> = match kind {
            EntityKind::Actor => catalog.actors.iter().map(|r| r.id.as_str()).collect(),
            EntityKind::Scene => catalog.scenes.iter().map(|r| r.id.as_str()).collect(),
            EntityKind::Bin => catalog.bins.iter().map(|r| r.id.as_str()).collect(),
            EntityKind::Media => catalog.media.iter().map(|r| r.id.as_str()).collect(),
            EntityKind::Take => catalog.takes.iter().map(|r| r.id.as_str()).collect(),
        };
        let mut seen = HashMap::new();
        for id in ids {
            *seen.entry(id).or_insert(0usize) += 1;
        }
        let mut dups: Vec<&str> = seen.into_iter().filter(|(_, n)| *n > 1).map(|(id, _)| id).collect();
        dups.sort_unstable();
        for id in dups {
            problems.push(IntegrityProblem {
                entity: EntityRef::new(kind, id),
                error: ValidationError::DuplicateId {
                    kind,
                    id: id.to_string(),
                },
            });
        }
    }
    problems
}

fn duplicate_names(catalog: &Catalog) -> Vec<IntegrityProblem> {
    let mut problems = Vec::new();

    let mut bins: HashMap<(OwnerRef, MediaType, &str), &Bin> = HashMap::new();
    for bin in &catalog.bins {
        let key = (bin.owner(), bin.media_type, bin.name.as_str());
        if bins.insert(key, bin).is_some() {
            problems.push(IntegrityProblem {
                entity: EntityRef::new(EntityKind::Bin, &bin.id),
                error: ValidationError::DuplicateName {
                    kind: EntityKind::Bin,
                    name: bin.name.clone(),
                    scope: format!("{} {} bins", bin.owner(), bin.media_type.as_str()),
                },
            });
        }
    }

    let mut media: HashMap<(&str, String), &Media> = HashMap::new();
    for item in &catalog.media {
        let key = (item.bin_id.as_str(), item.name.to_lowercase());
        if media.insert(key, item).is_some() {
            problems.push(IntegrityProblem {
                entity: EntityRef::new(EntityKind::Media, &item.id),
                error: ValidationError::DuplicateName {
                    kind: EntityKind::Media,
                    name: item.name.clone(),
                    scope: format!("bin '{}'", item.bin_id),
                },
            });
        }
    }

    problems
}

fn take_number_problems(catalog: &Catalog) -> Vec<IntegrityProblem> {
    let mut problems = Vec::new();
    let mut seen: HashMap<(&str, u32), &Take> = HashMap::new();
    for take in &catalog.takes {
        if seen.insert((take.media_id.as_str(), take.take_number), take).is_some() {
            problems.push(IntegrityProblem {
                entity: EntityRef::new(EntityKind::Take, &take.id),
                error: ValidationError::DuplicateTakeNumber {
                    media_id: take.media_id.clone(),
                    take_number: take.take_number,
                },
            });
        }
        if let Some(media) = catalog.get_media(&take.media_id) {
            if take.take_number >= media.next_take_number {
                problems.push(IntegrityProblem {
                    entity: EntityRef::new(EntityKind::Take, &take.id),
                    error: ValidationError::TakeNumberReused {
                        media_id: media.id.clone(),
                        take_number: take.take_number,
                        next_take_number: media.next_take_number,
                    },
                });
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent_catalog() -> Catalog {
        let actor = Actor::new("Narrator", "narrator");
        let bin = Bin::new(OwnerRef::actor(&actor.id), MediaType::Dialogue, "Lines");
        let mut media = Media::new(&bin, "Greeting");
        media.next_take_number = 3;
        let takes = vec![
            TakeDraft::new("1.wav").into_take(&media.id, 1),
            TakeDraft::new("2.wav").into_take(&media.id, 2),
        ];
        Catalog {
            actors: vec![actor],
            bins: vec![bin],
            media: vec![media],
            takes,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_catalog() {
        let report = check_integrity(&consistent_catalog());
        assert!(report.is_clean(), "{:?}", report.problems);
        assert_eq!(report.checked, 5);
    }

    #[test]
    fn test_dangling_owner_reported() {
        let mut catalog = consistent_catalog();
        catalog.actors.clear();
        let report = check_integrity(&catalog);
        // Both the bin and the media name the missing actor.
        assert_eq!(report.problems.len(), 2);
        assert!(report
            .problems
            .iter()
            .all(|p| matches!(p.error, ValidationError::ForeignKeyViolation { .. })));
    }

    #[test]
    fn test_take_number_problems_reported() {
        let mut catalog = consistent_catalog();
        let media_id = catalog.media[0].id.clone();
        catalog.takes.push(TakeDraft::new("dup.wav").into_take(&media_id, 2));
        catalog.takes.push(TakeDraft::new("ahead.wav").into_take(&media_id, 3));

        let report = check_integrity(&catalog);
        assert_eq!(report.problems.len(), 2);
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p.error, ValidationError::DuplicateTakeNumber { take_number: 2, .. })));
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p.error, ValidationError::TakeNumberReused { take_number: 3, .. })));
    }

    #[test]
    fn test_duplicate_names_and_ids_reported() {
        let mut catalog = consistent_catalog();
        let mut twin = catalog.bins[0].clone();
        twin.id = new_id();
        catalog.bins.push(twin);
        catalog.actors.push(catalog.actors[0].clone());

        let report = check_integrity(&catalog);
        assert_eq!(report.problems.len(), 2);
    }

    #[test]
    fn test_global_bins_with_stray_owner_id_reported() {
        let mut catalog = consistent_catalog();
        catalog.bins.push(Bin::new(OwnerRef::global(), MediaType::Sfx, "Doors"));
        let mut stray = Bin::new(OwnerRef::global(), MediaType::Sfx, "Doors");
        stray.owner_id = Some("junk".to_string());
        catalog.bins.push(stray);

        let report = check_integrity(&catalog);
        assert_eq!(report.problems.len(), 1);
        assert!(matches!(
            report.problems[0].error,
            ValidationError::DuplicateName { kind: EntityKind::Bin, .. }
        ));
    }
}
