//! Human-readable descriptions of catalog mutations.
//!
//! Messages are hierarchical, `"{owner_type} → {owner_name} → {bin} → {media}: {change}"`,
//! with the change text built from a field diff of the old and new record.

use serde_json::{json, Map, Value};

use crate::catalog_store::{CascadePlan, Catalog, EntityKind, Record, TakeStatus};

/// Fields that change on every write and say nothing to a user.
const IGNORED_FIELDS: &[&str] = &["created_at", "updated_at", "next_take_number"];

/// Calculate the diff between two JSON values representing entity states.
///
/// For creates, pass `None` as `old`. For deletes, pass `None` as `new`.
///
/// Returns a JSON object with changed fields: `{"field": {"old": X, "new": Y}}`
pub fn calculate_field_diff(old: Option<&Value>, new: Option<&Value>) -> Value {
    match (old, new) {
        (None, Some(new_val)) => whole_object(new_val, |v| json!({"old": null, "new": v})),
        (Some(old_val), None) => whole_object(old_val, |v| json!({"old": v, "new": null})),
        (Some(old_val), Some(new_val)) => calculate_object_diff(old_val, new_val),
        (None, None) => json!({}),
    }
}

fn whole_object(value: &Value, pair: impl Fn(&Value) -> Value) -> Value {
    match value.as_object() {
        Some(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), pair(v))).collect()),
        None => json!({ "value": pair(value) }),
    }
}

/// Changed fields only.
fn calculate_object_diff(old: &Value, new: &Value) -> Value {
    let mut diff = Map::new();

    match (old.as_object(), new.as_object()) {
        (Some(old_map), Some(new_map)) => {
            for (key, old_value) in old_map {
                let new_value = new_map.get(key).unwrap_or(&Value::Null);
                if old_value != new_value {
                    diff.insert(key.clone(), json!({"old": old_value, "new": new_value}));
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    diff.insert(key.clone(), json!({"old": null, "new": new_value}));
                }
            }
        }
        _ => {
            if old != new {
                diff.insert("value".to_string(), json!({"old": old, "new": new}));
            }
        }
    }

    Value::Object(diff)
}

/// Renders a JSON value the way it should read in a sentence.
fn render(value: &Value) -> String {
    match value {
        Value::Null => "none".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Where a record sits in the owner hierarchy, e.g. `actor → Narrator → Lines → Greeting`.
pub fn location(record: &Record, catalog: &Catalog) -> String {
    match record {
        Record::Actor(actor) => format!("actor → {}", actor.display_name),
        Record::Scene(scene) => format!("scene → {}", scene.name),
        Record::Bin(bin) => format!("{} → {}", owner_path(&bin.owner(), catalog), bin.name),
        Record::Media(media) => {
            let bin = catalog
                .get_bin(&media.bin_id)
                .map_or(media.bin_id.as_str(), |b| b.name.as_str());
            format!("{} → {} → {}", owner_path(&media.owner(), catalog), bin, media.name)
        }
        Record::Take(take) => match catalog.get_media(&take.media_id) {
            Some(media) => location(&Record::Media(media.clone()), catalog),
            None => format!("media → {}", take.media_id),
        },
    }
}

fn owner_path(owner: &crate::catalog_store::OwnerRef, catalog: &Catalog) -> String {
    match (&owner.owner_id, catalog.owner_name(owner)) {
        (_, Some(name)) => format!("{} → {}", owner.owner_type.as_str(), name),
        (Some(id), None) => format!("{} → {}", owner.owner_type.as_str(), id),
        (None, None) => owner.owner_type.as_str().to_string(),
    }
}

pub fn describe_create(record: &Record, catalog: &Catalog) -> String {
    let change = match record {
        Record::Take(take) => format!("generated take {}", take.take_number),
        other => format!("created {} '{}'", other.kind(), other.display_name()),
    };
    format!("{}: {}", location(record, catalog), change)
}

pub fn describe_remove(record: &Record, catalog: &Catalog) -> String {
    format!(
        "{}: removed {} '{}'",
        location(record, catalog),
        record.kind(),
        record.display_name()
    )
}

pub fn describe_restore(record: &Record, restored: usize, catalog: &Catalog) -> String {
    let mut message = format!(
        "{}: restored {} '{}'",
        location(record, catalog),
        record.kind(),
        record.display_name()
    );
    if restored > 1 {
        message.push_str(&format!(" with {} dependent records", restored - 1));
    }
    message
}

pub fn describe_delete(record: &Record, plan: &CascadePlan, catalog: &Catalog) -> String {
    let mut message = format!(
        "{}: deleted {} '{}'",
        location(record, catalog),
        record.kind(),
        record.display_name()
    );
    let parts: Vec<String> = [EntityKind::Bin, EntityKind::Media, EntityKind::Take]
        .into_iter()
        .filter(|kind| *kind != record.kind())
        .map(|kind| (kind, plan.removed_count(kind)))
        .filter(|(_, n)| *n > 0)
        .map(|(kind, n)| format!("{} {}", n, if n == 1 { kind.as_str() } else { kind.plural() }))
        .collect();
    if !parts.is_empty() {
        message.push_str(&format!(" (removed {})", parts.join(", ")));
    }
    message
}

/// Message for replacing `old` with `new`.
pub fn describe_update(old: &Record, new: &Record, catalog: &Catalog) -> String {
    let change = match (old.to_value(), new.to_value()) {
        (Ok(old_value), Ok(new_value)) => {
            describe_fields(old, &calculate_field_diff(Some(&old_value), Some(&new_value)))
        }
        _ => "Updated".to_string(),
    };
    format!("{}: {}", location(old, catalog), change)
}

fn describe_fields(old: &Record, diff: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(fields) = diff.as_object() {
        let mut sorted: Vec<(&String, &Value)> = fields.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (field, change) in sorted {
            if IGNORED_FIELDS.contains(&field.as_str()) {
                continue;
            }
            let before = change.get("old").unwrap_or(&Value::Null);
            let after = change.get("new").unwrap_or(&Value::Null);
            describe_field(old, field, before, after, &mut parts);
        }
    }
    if parts.is_empty() {
        "No changes".to_string()
    } else {
        parts.join(", ")
    }
}

fn describe_field(old: &Record, field: &str, before: &Value, after: &Value, parts: &mut Vec<String>) {
    match (field, old) {
        ("status", Record::Take(take)) => {
            match serde_json::from_value::<TakeStatus>(after.clone()) {
                Ok(status) => parts.push(format!("{} take {}", status.verb(), take.take_number)),
                Err(_) => parts.push(format!("Changed status: {} → {}", render(before), render(after))),
            }
        }
        ("complete", _) => {
            if after.as_bool().unwrap_or(false) {
                parts.push("marked as complete".to_string());
            } else {
                parts.push("marked as incomplete".to_string());
            }
        }
        ("name" | "display_name", _) => {
            parts.push(format!("Renamed: {} → {}", render(before), render(after)))
        }
        ("prompt", _) => parts.push("Updated prompt".to_string()),
        ("default_blocks", _) => describe_blocks(before, after, parts),
        (other, _) => parts.push(format!("Changed {}: {} → {}", other, render(before), render(after))),
    }
}

/// Per-parameter text for a change of the default blocks map.
fn describe_blocks(before: &Value, after: &Value, parts: &mut Vec<String>) {
    let diff = calculate_field_diff(Some(before), Some(after));
    let Some(by_type) = diff.as_object() else {
        return;
    };
    for (media_type, change) in by_type {
        let old_block = change.get("old").unwrap_or(&Value::Null);
        let new_block = change.get("new").unwrap_or(&Value::Null);
        match (old_block.is_null(), new_block.is_null()) {
            (true, false) => parts.push(format!("Set {} block", media_type)),
            (false, true) => parts.push(format!("Cleared {} block", media_type)),
            _ => {
                let inner = calculate_field_diff(Some(old_block), Some(new_block));
                if let Some(params) = inner.as_object() {
                    for (param, values) in params {
                        let from = values.get("old").unwrap_or(&Value::Null);
                        let to = values.get("new").unwrap_or(&Value::Null);
                        parts.push(format!("Changed {}: {} → {}", param, render(from), render(to)));
                    }
                }
            }
        }
    }
}
