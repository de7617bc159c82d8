//! Validation for catalog entities.
//!
//! Two layers:
//! - `validate_references` is the opportunistic foreign-key scan over the
//!   well-known field names of any JSON object.
//! - `validate_record` runs the full rule set for one typed record against the
//!   catalog it is about to enter: required fields, references, uniqueness and
//!   the take-number rules.
//!
//! Every check reports all violations at once instead of stopping at the first.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::catalog::Catalog;
use super::models::*;

lazy_static! {
    static ref BASE_FILENAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("Invalid base filename pattern");
}

/// Single-id reference fields and the kind they must resolve to.
const REFERENCE_FIELDS: &[(&str, EntityKind)] = &[
    ("actor_id", EntityKind::Actor),
    ("scene_id", EntityKind::Scene),
    ("bin_id", EntityKind::Bin),
    ("media_id", EntityKind::Media),
    ("content_id", EntityKind::Media),
];

/// Array reference fields.
const REFERENCE_ARRAYS: &[(&str, EntityKind)] = &[
    ("actor_ids", EntityKind::Actor),
    ("scene_ids", EntityKind::Scene),
];

/// Validation error types
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    EmptyField {
        field: &'static str,
    },
    ForeignKeyViolation {
        field: String,
        kind: EntityKind,
        id: String,
    },
    MissingOwnerId {
        owner_type: String,
    },
    InvalidOwnerType {
        value: String,
    },
    DuplicateName {
        kind: EntityKind,
        name: String,
        scope: String,
    },
    DuplicateId {
        kind: EntityKind,
        id: String,
    },
    DuplicateTakeNumber {
        media_id: String,
        take_number: u32,
    },
    TakeNumberReused {
        media_id: String,
        take_number: u32,
        next_take_number: u32,
    },
    ImmutableField {
        field: &'static str,
    },
    InvalidFilename {
        value: String,
    },
    MediaTypeMismatch {
        bin_id: String,
        expected: MediaType,
        found: MediaType,
    },
    InheritAtRoot {
        media_type: MediaType,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::ForeignKeyViolation { field, kind, id } => {
                write!(f, "Field '{}' references {} '{}' which does not exist", field, kind, id)
            }
            ValidationError::MissingOwnerId { owner_type } => {
                write!(f, "Owner type '{}' requires an owner_id", owner_type)
            }
            ValidationError::InvalidOwnerType { value } => {
                write!(f, "Unknown owner type '{}'", value)
            }
            ValidationError::DuplicateName { kind, name, scope } => {
                write!(f, "A {} named '{}' already exists in {}", kind, name, scope)
            }
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "{} with id '{}' already exists", kind, id)
            }
            ValidationError::DuplicateTakeNumber {
                media_id,
                take_number,
            } => {
                write!(f, "Take number {} is already used on media '{}'", take_number, media_id)
            }
            ValidationError::TakeNumberReused {
                media_id,
                take_number,
                next_take_number,
            } => write!(
                f,
                "Take number {} on media '{}' conflicts with next take number {}",
                take_number, media_id, next_take_number
            ),
            ValidationError::ImmutableField { field } => {
                write!(f, "Field '{}' cannot be changed", field)
            }
            ValidationError::InvalidFilename { value } => {
                write!(f, "'{}' is not a valid base filename", value)
            }
            ValidationError::MediaTypeMismatch {
                bin_id,
                expected,
                found,
            } => write!(
                f,
                "Bin '{}' holds {} media, got {}",
                bin_id,
                expected.as_str(),
                found.as_str()
            ),
            ValidationError::InheritAtRoot { media_type } => {
                write!(f, "No level overrides the {} block", media_type.as_str())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of a reference scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReferenceReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Checks every well-known foreign-key field of `candidate` against `catalog`.
///
/// Absent and `null` fields are ignored. `owner_type == "global"` needs no
/// `owner_id`.
pub fn validate_references(candidate: &Value, catalog: &Catalog) -> ReferenceReport {
    let mut errors = Vec::new();
    let Some(object) = candidate.as_object() else {
        return ReferenceReport {
            valid: true,
            errors,
        };
    };

    for (field, kind) in REFERENCE_FIELDS {
        if let Some(value) = object.get(*field) {
            check_reference(field, *kind, value, catalog, &mut errors);
        }
    }

    for (field, kind) in REFERENCE_ARRAYS {
        match object.get(*field) {
            Some(Value::Array(items)) => {
                for (index, value) in items.iter().enumerate() {
                    let name = format!("{}[{}]", field, index);
                    check_reference(&name, *kind, value, catalog, &mut errors);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => errors.push(ValidationError::ForeignKeyViolation {
                field: field.to_string(),
                kind: *kind,
                id: other.to_string(),
            }),
        }
    }

    check_owner(object, catalog, &mut errors);

    ReferenceReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn check_reference(
    field: &str,
    kind: EntityKind,
    value: &Value,
    catalog: &Catalog,
    errors: &mut Vec<ValidationError>,
) {
    let id = match value {
        Value::Null => return,
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    if !catalog.contains(kind, &id) {
        errors.push(ValidationError::ForeignKeyViolation {
            field: field.to_string(),
            kind,
            id,
        });
    }
}

fn check_owner(
    object: &serde_json::Map<String, Value>,
    catalog: &Catalog,
    errors: &mut Vec<ValidationError>,
) {
    let raw_type = match object.get("owner_type") {
        None | Some(Value::Null) => return,
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            errors.push(ValidationError::InvalidOwnerType {
                value: other.to_string(),
            });
            return;
        }
    };
    let Some(owner_type) = OwnerType::parse(raw_type) else {
        errors.push(ValidationError::InvalidOwnerType {
            value: raw_type.to_string(),
        });
        return;
    };
    let Some(kind) = owner_type.entity_kind() else {
        return;
    };
    match object.get("owner_id") {
        Some(Value::String(id)) if !id.is_empty() => {
            check_reference("owner_id", kind, &Value::String(id.clone()), catalog, errors)
        }
        _ => errors.push(ValidationError::MissingOwnerId {
            owner_type: raw_type.to_string(),
        }),
    }
}

/// How a record is entering the catalog.
#[derive(Clone, Copy, Debug)]
pub enum Check<'a> {
    /// A record about to be inserted. `fresh` is false when a redo replays an
    /// insert that already happened once, so take numbers below the media's
    /// high-water mark are accepted.
    Insert { fresh: bool },
    /// A new version of `previous`.
    Update { previous: &'a Record },
    /// A record already placed in the catalog, as after a restore.
    Existing,
}

/// Full rule set for `record`. An empty list means the record is valid.
pub fn validate_record(record: &Record, catalog: &Catalog, check: Check<'_>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if record.id().trim().is_empty() {
        errors.push(ValidationError::EmptyField { field: "id" });
    }
    if let Check::Insert { .. } = check {
        if catalog.contains(record.kind(), record.id()) {
            errors.push(ValidationError::DuplicateId {
                kind: record.kind(),
                id: record.id().to_string(),
            });
        }
    }

    match record {
        Record::Actor(actor) => {
            require("display_name", &actor.display_name, &mut errors);
            if actor.base_filename.trim().is_empty() {
                errors.push(ValidationError::EmptyField {
                    field: "base_filename",
                });
            } else if !BASE_FILENAME_RE.is_match(&actor.base_filename) {
                errors.push(ValidationError::InvalidFilename {
                    value: actor.base_filename.clone(),
                });
            }
            check_blocks(&actor.default_blocks, &mut errors);
        }
        Record::Scene(scene) => {
            require("name", &scene.name, &mut errors);
            check_blocks(&scene.default_blocks, &mut errors);
        }
        Record::Bin(bin) => {
            require("name", &bin.name, &mut errors);
            check_blocks(&bin.default_blocks, &mut errors);
            check_bin_name(bin, catalog, &mut errors);
        }
        Record::Media(media) => {
            require("name", &media.name, &mut errors);
            check_blocks(&media.default_blocks, &mut errors);
            check_media(media, catalog, &mut errors);
        }
        Record::Take(take) => {
            require("filename", &take.filename, &mut errors);
            check_take(take, catalog, check, &mut errors);
        }
    }

    if let Ok(value) = record.to_value() {
        errors.extend(validate_references(&value, catalog).errors);
    }

    errors
}

fn require(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError::EmptyField { field });
    }
}

fn check_blocks(blocks: &DefaultBlocks, errors: &mut Vec<ValidationError>) {
    for setting in blocks.values() {
        if let BlockSetting::Override(settings) = setting {
            if settings.provider.trim().is_empty() {
                errors.push(ValidationError::EmptyField { field: "provider" });
            }
        }
    }
}

fn check_bin_name(bin: &Bin, catalog: &Catalog, errors: &mut Vec<ValidationError>) {
    let owner = bin.owner();
    let clash = catalog.bins.iter().any(|other| {
        other.id != bin.id
            && other.media_type == bin.media_type
            && other.owner() == owner
            && other.name == bin.name
    });
    if clash {
        errors.push(ValidationError::DuplicateName {
            kind: EntityKind::Bin,
            name: bin.name.clone(),
            scope: format!("{} {} bins", owner, bin.media_type.as_str()),
        });
    }
}

fn check_media(media: &Media, catalog: &Catalog, errors: &mut Vec<ValidationError>) {
    if let Some(bin) = catalog.get_bin(&media.bin_id) {
        if bin.media_type != media.media_type {
            errors.push(ValidationError::MediaTypeMismatch {
                bin_id: bin.id.clone(),
                expected: bin.media_type,
                found: media.media_type,
            });
        }
    }
    let lowered = media.name.to_lowercase();
    let clash = catalog.media.iter().any(|other| {
        other.id != media.id && other.bin_id == media.bin_id && other.name.to_lowercase() == lowered
    });
    if clash {
        errors.push(ValidationError::DuplicateName {
            kind: EntityKind::Media,
            name: media.name.clone(),
            scope: format!("bin '{}'", media.bin_id),
        });
    }
}

fn check_take(take: &Take, catalog: &Catalog, check: Check<'_>, errors: &mut Vec<ValidationError>) {
    if take.take_number == 0 {
        errors.push(ValidationError::EmptyField {
            field: "take_number",
        });
    }
    let clash = catalog.takes.iter().any(|other| {
        other.id != take.id && other.media_id == take.media_id && other.take_number == take.take_number
    });
    if clash {
        errors.push(ValidationError::DuplicateTakeNumber {
            media_id: take.media_id.clone(),
            take_number: take.take_number,
        });
    }

    match check {
        Check::Insert { fresh: true } => {
            if let Some(media) = catalog.get_media(&take.media_id) {
                if take.take_number < media.next_take_number {
                    errors.push(ValidationError::TakeNumberReused {
                        media_id: media.id.clone(),
                        take_number: take.take_number,
                        next_take_number: media.next_take_number,
                    });
                }
            }
        }
        Check::Update {
            previous: Record::Take(old),
        } => {
            if old.take_number != take.take_number {
                errors.push(ValidationError::ImmutableField {
                    field: "take_number",
                });
            }
            if old.media_id != take.media_id {
                errors.push(ValidationError::ImmutableField { field: "media_id" });
            }
        }
        _ => {}
    }
}

/// Resolves the effective block for `media_type`, walking `layers` from the
/// most specific level down and ending at the project-wide `root` settings.
///
/// Fails when no level provides an override, since `inherit` cannot be the
/// last word of a chain.
pub fn resolve_effective_block<'a, I>(
    media_type: MediaType,
    layers: I,
    root: Option<&'a BlockSettings>,
) -> Result<&'a BlockSettings, ValidationError>
where
    I: IntoIterator<Item = Option<&'a BlockSetting>>,
{
    resolve_block(layers)
        .or(root.filter(|settings| settings.provider != INHERIT_PROVIDER))
        .ok_or(ValidationError::InheritAtRoot { media_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_catalog() -> (Catalog, Actor, Scene, Bin, Media) {
        let actor = Actor::new("Narrator", "narrator");
        let scene = Scene::new("Act1");
        let bin = Bin::new(OwnerRef::actor(&actor.id), MediaType::Dialogue, "Lines");
        let media = Media::new(&bin, "Greeting");
        let catalog = Catalog {
            actors: vec![actor.clone()],
            scenes: vec![scene.clone()],
            bins: vec![bin.clone()],
            media: vec![media.clone()],
            takes: Vec::new(),
        };
        (catalog, actor, scene, bin, media)
    }

    #[test]
    fn test_validate_references_all_resolve() {
        let (catalog, actor, scene, bin, media) = create_test_catalog();
        let candidate = json!({
            "actor_id": actor.id,
            "scene_id": scene.id,
            "bin_id": bin.id,
            "media_id": media.id,
            "actor_ids": [actor.id],
            "owner_type": "scene",
            "owner_id": scene.id,
        });
        let report = validate_references(&candidate, &catalog);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_validate_references_reports_every_violation() {
        let (catalog, actor, _, _, _) = create_test_catalog();
        let candidate = json!({
            "bin_id": "nope",
            "media_id": "gone",
            "actor_ids": [actor.id, "ghost"],
        });
        let report = validate_references(&candidate, &catalog);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.contains(&ValidationError::ForeignKeyViolation {
            field: "actor_ids[1]".to_string(),
            kind: EntityKind::Actor,
            id: "ghost".to_string(),
        }));
    }

    #[test]
    fn test_global_owner_needs_no_id() {
        let (catalog, _, _, _, _) = create_test_catalog();
        for candidate in [
            json!({"owner_type": "global"}),
            json!({"owner_type": "global", "owner_id": null}),
            json!({"owner_type": "global", "owner_id": "whatever"}),
        ] {
            assert!(validate_references(&candidate, &catalog).valid);
        }
    }

    #[test]
    fn test_owner_checks() {
        let (catalog, _, _, _, _) = create_test_catalog();
        let missing = validate_references(&json!({"owner_type": "actor"}), &catalog);
        assert_eq!(
            missing.errors,
            vec![ValidationError::MissingOwnerId {
                owner_type: "actor".to_string()
            }]
        );

        let unknown = validate_references(&json!({"owner_type": "planet", "owner_id": "x"}), &catalog);
        assert!(matches!(
            unknown.errors.as_slice(),
            [ValidationError::InvalidOwnerType { .. }]
        ));

        let dangling = validate_references(&json!({"owner_type": "scene", "owner_id": "x"}), &catalog);
        assert!(!dangling.valid);
    }

    #[test]
    fn test_unknown_fields_and_nulls_are_ignored() {
        let (catalog, _, _, _, _) = create_test_catalog();
        let candidate = json!({"scene_id": null, "whatever_id": "x", "name": "n"});
        assert!(validate_references(&candidate, &catalog).valid);
        assert!(validate_references(&json!("not an object"), &catalog).valid);
    }

    #[test]
    fn test_duplicate_bin_name_same_owner_and_type() {
        let (catalog, actor, _, _, _) = create_test_catalog();
        let twin = Bin::new(OwnerRef::actor(&actor.id), MediaType::Dialogue, "Lines");
        let errors = validate_record(&Record::Bin(twin), &catalog, Check::Insert { fresh: true });
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicateName { kind: EntityKind::Bin, .. }]
        ));

        // Different media type or different case is fine.
        let music = Bin::new(OwnerRef::actor(&actor.id), MediaType::Music, "Lines");
        assert!(validate_record(&Record::Bin(music), &catalog, Check::Insert { fresh: true }).is_empty());
        let lower = Bin::new(OwnerRef::actor(&actor.id), MediaType::Dialogue, "lines");
        assert!(validate_record(&Record::Bin(lower), &catalog, Check::Insert { fresh: true }).is_empty());
    }

    #[test]
    fn test_global_bins_share_one_scope() {
        let (mut catalog, _, _, _, _) = create_test_catalog();
        catalog.bins.push(Bin::new(OwnerRef::global(), MediaType::Sfx, "Doors"));

        let mut stray = Bin::new(OwnerRef::global(), MediaType::Sfx, "Doors");
        stray.owner_id = Some("junk".to_string());
        let errors = validate_record(&Record::Bin(stray), &catalog, Check::Insert { fresh: true });
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateName {
                kind: EntityKind::Bin,
                name: "Doors".to_string(),
                scope: "global sfx bins".to_string(),
            }]
        );
    }

    #[test]
    fn test_media_name_is_case_insensitive_within_bin() {
        let (catalog, _, _, bin, media) = create_test_catalog();
        let twin = Media::new(&bin, "GREETING");
        let errors = validate_record(&Record::Media(twin), &catalog, Check::Insert { fresh: true });
        assert_eq!(errors.len(), 1);

        // Renaming itself to a different case is not a clash.
        let mut renamed = media.clone();
        renamed.name = "greeting".to_string();
        let previous = Record::Media(media);
        let errors = validate_record(
            &Record::Media(renamed),
            &catalog,
            Check::Update {
                previous: &previous,
            },
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_media_type_must_match_bin() {
        let (catalog, _, _, bin, _) = create_test_catalog();
        let mut media = Media::new(&bin, "Theme");
        media.media_type = MediaType::Music;
        let errors = validate_record(&Record::Media(media), &catalog, Check::Insert { fresh: true });
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::MediaTypeMismatch { .. }]
        ));
    }

    #[test]
    fn test_actor_fields() {
        let (catalog, _, _, _, _) = create_test_catalog();
        let bad = Actor::new("", "../escape");
        let errors = validate_record(&Record::Actor(bad), &catalog, Check::Insert { fresh: true });
        assert!(errors.contains(&ValidationError::EmptyField {
            field: "display_name"
        }));
        assert!(errors.contains(&ValidationError::InvalidFilename {
            value: "../escape".to_string()
        }));
    }

    #[test]
    fn test_insert_rejects_existing_id() {
        let (catalog, actor, _, _, _) = create_test_catalog();
        let errors = validate_record(&Record::Actor(actor), &catalog, Check::Insert { fresh: true });
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicateId { .. }]
        ));
    }

    #[test]
    fn test_take_number_rules() {
        let (mut catalog, _, _, _, mut media) = create_test_catalog();
        media.next_take_number = 4;
        catalog.media = vec![media.clone()];
        catalog.takes.push(TakeDraft::new("a.wav").into_take(&media.id, 3));

        let reused = TakeDraft::new("b.wav").into_take(&media.id, 2);
        let fresh = validate_record(&Record::Take(reused.clone()), &catalog, Check::Insert { fresh: true });
        assert!(matches!(
            fresh.as_slice(),
            [ValidationError::TakeNumberReused { take_number: 2, .. }]
        ));
        let replay = validate_record(&Record::Take(reused), &catalog, Check::Insert { fresh: false });
        assert!(replay.is_empty());

        let clash = TakeDraft::new("c.wav").into_take(&media.id, 3);
        let errors = validate_record(&Record::Take(clash), &catalog, Check::Insert { fresh: false });
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicateTakeNumber { take_number: 3, .. }]
        ));
    }

    #[test]
    fn test_take_number_is_immutable() {
        let (mut catalog, _, _, _, media) = create_test_catalog();
        let take = TakeDraft::new("a.wav").into_take(&media.id, 1);
        catalog.takes.push(take.clone());

        let mut changed = take.clone();
        changed.take_number = 9;
        let previous = Record::Take(take);
        let errors = validate_record(
            &Record::Take(changed),
            &catalog,
            Check::Update {
                previous: &previous,
            },
        );
        assert!(errors.contains(&ValidationError::ImmutableField {
            field: "take_number"
        }));
    }

    #[test]
    fn test_empty_provider_override_rejected() {
        let (catalog, mut actor, _, _, _) = create_test_catalog();
        actor
            .default_blocks
            .insert(MediaType::Dialogue, BlockSetting::Override(BlockSettings::new(" ")));
        let previous = Record::Actor(actor.clone());
        let errors = validate_record(
            &Record::Actor(actor),
            &catalog,
            Check::Update {
                previous: &previous,
            },
        );
        assert_eq!(errors, vec![ValidationError::EmptyField { field: "provider" }]);
    }

    #[test]
    fn test_resolve_effective_block() {
        let media_level = BlockSetting::Inherit;
        let bin_level = BlockSetting::Override(BlockSettings::new("elevenlabs"));
        let root = BlockSettings::new("openai");

        let resolved =
            resolve_effective_block(MediaType::Dialogue, [Some(&media_level), Some(&bin_level)], Some(&root))
                .unwrap();
        assert_eq!(resolved.provider, "elevenlabs");

        let resolved =
            resolve_effective_block(MediaType::Dialogue, [Some(&media_level), None], Some(&root)).unwrap();
        assert_eq!(resolved.provider, "openai");

        let inherit_root = BlockSettings::new(INHERIT_PROVIDER);
        let err = resolve_effective_block(MediaType::Sfx, [Some(&media_level)], Some(&inherit_root))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InheritAtRoot {
                media_type: MediaType::Sfx
            }
        );
    }
}
