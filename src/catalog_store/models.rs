//! Catalog entity models.
//!
//! Every entity is persisted as one JSON object per line in the record file of
//! its kind. Mutation never happens in place: callers read the whole set,
//! change it in memory and write the whole set back (see `record_store`).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Provider value that marks a default block as "no override at this level".
pub const INHERIT_PROVIDER: &str = "inherit";

/// Current UTC time in the format stored in `created_at`/`updated_at`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn first_take_number() -> u32 {
    1
}

// =============================================================================
// Enumerations
// =============================================================================

/// The five kinds of catalog entities, one record file each.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Actor,
    Scene,
    Bin,
    Media,
    Take,
}

impl EntityKind {
    /// Root-to-leaf order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Actor,
        EntityKind::Scene,
        EntityKind::Bin,
        EntityKind::Media,
        EntityKind::Take,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Actor => "actor",
            EntityKind::Scene => "scene",
            EntityKind::Bin => "bin",
            EntityKind::Media => "media",
            EntityKind::Take => "take",
        }
    }

    /// Get the plural form for display purposes
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Actor => "actors",
            EntityKind::Scene => "scenes",
            EntityKind::Bin => "bins",
            EntityKind::Media => "media",
            EntityKind::Take => "takes",
        }
    }

    /// Parses either the singular or the plural form.
    pub fn parse(s: &str) -> Option<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.plural() == s)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a Bin or Media item belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Actor,
    Scene,
    Global,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Actor => "actor",
            OwnerType::Scene => "scene",
            OwnerType::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "actor" => Some(OwnerType::Actor),
            "scene" => Some(OwnerType::Scene),
            "global" => Some(OwnerType::Global),
            _ => None,
        }
    }

    /// Entity kind the `owner_id` must resolve to. `None` for the global scope.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            OwnerType::Actor => Some(EntityKind::Actor),
            OwnerType::Scene => Some(EntityKind::Scene),
            OwnerType::Global => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Dialogue,
    Music,
    Sfx,
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Dialogue => "dialogue",
            MediaType::Music => "music",
            MediaType::Sfx => "sfx",
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakeStatus {
    #[default]
    New,
    Approved,
    Rejected,
    Hidden,
}

impl TakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakeStatus::New => "new",
            TakeStatus::Approved => "approved",
            TakeStatus::Rejected => "rejected",
            TakeStatus::Hidden => "hidden",
        }
    }

    /// Past-tense verb used in history messages ("Approved take").
    pub fn verb(&self) -> &'static str {
        match self {
            TakeStatus::New => "Reset",
            TakeStatus::Approved => "Approved",
            TakeStatus::Rejected => "Rejected",
            TakeStatus::Hidden => "Hid",
        }
    }
}

// =============================================================================
// Default blocks
// =============================================================================

/// Provider settings of one default block, as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockSettings {
    pub provider: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl BlockSettings {
    pub fn new(provider: &str) -> Self {
        BlockSettings {
            provider: provider.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// A default block at one level of the owner hierarchy.
///
/// On disk an inheriting block is written as `{"provider": "inherit"}`; any
/// parameters stored next to the sentinel are dropped when it is read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "BlockSettings", into = "BlockSettings")]
pub enum BlockSetting {
    Override(BlockSettings),
    Inherit,
}

impl From<BlockSettings> for BlockSetting {
    fn from(settings: BlockSettings) -> Self {
        if settings.provider == INHERIT_PROVIDER {
            BlockSetting::Inherit
        } else {
            BlockSetting::Override(settings)
        }
    }
}

impl From<BlockSetting> for BlockSettings {
    fn from(setting: BlockSetting) -> Self {
        match setting {
            BlockSetting::Override(settings) => settings,
            BlockSetting::Inherit => BlockSettings::new(INHERIT_PROVIDER),
        }
    }
}

pub type DefaultBlocks = BTreeMap<MediaType, BlockSetting>;

/// Returns the first override found walking `layers` from the most specific
/// level (media) to the least specific one (owner). `None` means every level
/// inherits and the caller falls back to its global settings.
pub fn resolve_block<'a, I>(layers: I) -> Option<&'a BlockSettings>
where
    I: IntoIterator<Item = Option<&'a BlockSetting>>,
{
    layers.into_iter().flatten().find_map(|setting| match setting {
        BlockSetting::Override(settings) => Some(settings),
        BlockSetting::Inherit => None,
    })
}

// =============================================================================
// Owner reference
// =============================================================================

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct OwnerRef {
    pub owner_type: OwnerType,
    pub owner_id: Option<String>,
}

impl OwnerRef {
    /// Builds a reference from stored fields. Global owners carry no id, so
    /// any stray `owner_id` on a global record is dropped.
    pub fn new(owner_type: OwnerType, owner_id: Option<&str>) -> Self {
        match owner_type {
            OwnerType::Global => OwnerRef::global(),
            _ => OwnerRef {
                owner_type,
                owner_id: owner_id.map(String::from),
            },
        }
    }

    pub fn global() -> Self {
        OwnerRef {
            owner_type: OwnerType::Global,
            owner_id: None,
        }
    }

    pub fn actor(id: &str) -> Self {
        OwnerRef {
            owner_type: OwnerType::Actor,
            owner_id: Some(id.to_string()),
        }
    }

    pub fn scene(id: &str) -> Self {
        OwnerRef {
            owner_type: OwnerType::Scene,
            owner_id: Some(id.to_string()),
        }
    }

    /// True when this reference points at entity `id` of `kind`.
    pub fn points_at(&self, kind: EntityKind, id: &str) -> bool {
        self.owner_type.entity_kind() == Some(kind) && self.owner_id.as_deref() == Some(id)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_id {
            Some(id) => write!(f, "{}:{}", self.owner_type.as_str(), id),
            None => f.write_str(self.owner_type.as_str()),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub base_filename: String,
    #[serde(default)]
    pub default_blocks: DefaultBlocks,
    #[serde(default)]
    pub complete: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Actor {
    pub fn new(display_name: &str, base_filename: &str) -> Self {
        let now = now_timestamp();
        Actor {
            id: new_id(),
            display_name: display_name.to_string(),
            base_filename: base_filename.to_string(),
            default_blocks: DefaultBlocks::new(),
            complete: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_blocks: DefaultBlocks,
    #[serde(default)]
    pub actor_ids: Vec<String>,
    #[serde(default)]
    pub complete: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        let now = now_timestamp();
        Scene {
            id: new_id(),
            name: name.to_string(),
            description: None,
            default_blocks: DefaultBlocks::new(),
            actor_ids: Vec::new(),
            complete: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub id: String,
    pub owner_type: OwnerType,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub media_type: MediaType,
    pub name: String,
    #[serde(default)]
    pub default_blocks: DefaultBlocks,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub scene_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Bin {
    pub fn new(owner: OwnerRef, media_type: MediaType, name: &str) -> Self {
        let now = now_timestamp();
        Bin {
            id: new_id(),
            owner_type: owner.owner_type,
            owner_id: owner.owner_id,
            media_type,
            name: name.to_string(),
            default_blocks: DefaultBlocks::new(),
            complete: false,
            scene_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type, self.owner_id.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub owner_type: OwnerType,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub bin_id: String,
    pub media_type: MediaType,
    pub name: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub default_blocks: DefaultBlocks,
    #[serde(default)]
    pub complete: bool,
    /// High-water mark: the number the next generated take will receive.
    #[serde(default = "first_take_number")]
    pub next_take_number: u32,
    #[serde(default)]
    pub scene_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Media {
    /// A new media item inside `bin`, inheriting its owner and media type.
    pub fn new(bin: &Bin, name: &str) -> Self {
        let now = now_timestamp();
        Media {
            id: new_id(),
            owner_type: bin.owner_type,
            owner_id: bin.owner_id.clone(),
            bin_id: bin.id.clone(),
            media_type: bin.media_type,
            name: name.to_string(),
            prompt: None,
            default_blocks: DefaultBlocks::new(),
            complete: false,
            next_take_number: first_take_number(),
            scene_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type, self.owner_id.as_deref())
    }
}

/// Where a take came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub provider: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub generated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Take {
    pub id: String,
    pub media_id: String,
    pub take_number: u32,
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub duration_sec: Option<f64>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub channels: Option<u16>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub status: TakeStatus,
    #[serde(default)]
    pub generation: Option<Generation>,
    pub created_at: String,
    pub updated_at: String,
}

/// Everything a generator knows about a take before the catalog numbers it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TakeDraft {
    pub filename: String,
    pub path: Option<String>,
    pub format: Option<String>,
    pub duration_sec: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub size_bytes: Option<u64>,
    pub content_hash: Option<String>,
    pub generation: Option<Generation>,
}

impl TakeDraft {
    pub fn new(filename: &str) -> Self {
        TakeDraft {
            filename: filename.to_string(),
            ..Default::default()
        }
    }

    pub fn into_take(self, media_id: &str, take_number: u32) -> Take {
        let now = now_timestamp();
        Take {
            id: new_id(),
            media_id: media_id.to_string(),
            take_number,
            filename: self.filename,
            path: self.path,
            format: self.format,
            duration_sec: self.duration_sec,
            sample_rate: self.sample_rate,
            channels: self.channels,
            size_bytes: self.size_bytes,
            content_hash: self.content_hash,
            status: TakeStatus::New,
            generation: self.generation,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

// =============================================================================
// Heterogeneous record
// =============================================================================

/// Any catalog entity, tagged with its kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum Record {
    Actor(Actor),
    Scene(Scene),
    Bin(Bin),
    Media(Media),
    Take(Take),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Actor(_) => EntityKind::Actor,
            Record::Scene(_) => EntityKind::Scene,
            Record::Bin(_) => EntityKind::Bin,
            Record::Media(_) => EntityKind::Media,
            Record::Take(_) => EntityKind::Take,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Actor(r) => &r.id,
            Record::Scene(r) => &r.id,
            Record::Bin(r) => &r.id,
            Record::Media(r) => &r.id,
            Record::Take(r) => &r.id,
        }
    }

    /// Name shown to users; takes have no name and use their number.
    pub fn display_name(&self) -> String {
        match self {
            Record::Actor(r) => r.display_name.clone(),
            Record::Scene(r) => r.name.clone(),
            Record::Bin(r) => r.name.clone(),
            Record::Media(r) => r.name.clone(),
            Record::Take(r) => format!("take {}", r.take_number),
        }
    }

    pub fn set_updated_at(&mut self, timestamp: String) {
        match self {
            Record::Actor(r) => r.updated_at = timestamp,
            Record::Scene(r) => r.updated_at = timestamp,
            Record::Bin(r) => r.updated_at = timestamp,
            Record::Media(r) => r.updated_at = timestamp,
            Record::Take(r) => r.updated_at = timestamp,
        }
    }

    /// JSON object of the wrapped entity, without the kind tag.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Record::Actor(r) => serde_json::to_value(r),
            Record::Scene(r) => serde_json::to_value(r),
            Record::Bin(r) => serde_json::to_value(r),
            Record::Media(r) => serde_json::to_value(r),
            Record::Take(r) => serde_json::to_value(r),
        }
    }
}

/// Kind plus id of an entity.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: &str) -> Self {
        EntityRef {
            kind,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}
