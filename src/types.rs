//! Wire shapes of the posts lookup response.
//!
//! Posts and media descriptors are held as [`Record`]s: the JSON exactly as
//! received plus a typed view when it fits the known shape. Writing a document
//! back out emits the received JSON, so key order and odd fields survive.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Photo,
    Video,
    AnimatedGif,
    Other(String),
}

impl From<String> for MediaType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "photo" => MediaType::Photo,
            "video" => MediaType::Video,
            "animated_gif" => MediaType::AnimatedGif,
            _ => MediaType::Other(s),
        }
    }
}

impl From<MediaType> for String {
    fn from(t: MediaType) -> Self {
        match t {
            MediaType::Photo => "photo".to_string(),
            MediaType::Video => "video".to_string(),
            MediaType::AnimatedGif => "animated_gif".to_string(),
            MediaType::Other(s) => s,
        }
    }
}

impl MediaType {
    /// File name stem used for downloaded media of this type.
    pub fn role(&self) -> Option<&'static str> {
        match self {
            MediaType::Photo => Some("photo"),
            MediaType::Video => Some("video"),
            MediaType::AnimatedGif => Some("gif"),
            MediaType::Other(_) => None,
        }
    }
}

/// One encoded rendition of a video or animated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub media_key: String,
    #[serde(rename = "type")]
    pub kind: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<Variant>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaDescriptor {
    pub fn variants(&self) -> &[Variant] {
        self.variants.as_deref().unwrap_or_default()
    }
}

/// A received JSON object and, when it parses, its typed view.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    raw: Value,
    parsed: Option<T>,
}

impl<T: DeserializeOwned> Record<T> {
    pub fn new(raw: Value) -> Self {
        let parsed = T::deserialize(&raw).ok();
        Self { raw, parsed }
    }
}

impl<T> Record<T> {
    pub fn parsed(&self) -> Option<&T> {
        self.parsed.as_ref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl<T> Serialize for Record<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Record<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

pub type MediaRecord = Record<MediaDescriptor>;

/// Side-table returned next to the primary items, referenced by media key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Includes {
    pub fn media(&self) -> &[MediaRecord] {
        self.media.as_deref().unwrap_or_default()
    }

    pub fn find_media(&self, media_key: &str) -> Option<&MediaDescriptor> {
        self.media().iter().filter_map(Record::parsed).find(|d| d.media_key == media_key)
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_keys: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One fetched post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn media_keys(&self) -> &[String] {
        self.attachments
            .as_ref()
            .and_then(|a| a.media_keys.as_deref())
            .unwrap_or_default()
    }
}

pub type ItemRecord = Record<Item>;

impl Record<Item> {
    pub fn as_item(&self) -> Option<&Item> {
        self.parsed()
    }

    /// The string id, also for records that did not parse as an [`Item`].
    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }
}

/// Body of one successful lookup call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ItemRecord>>,
    #[serde(default, skip_serializing_if = "Includes::is_empty")]
    pub includes: Includes,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchResponse {
    pub fn items(&self) -> &[ItemRecord] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Number of per-post errors reported alongside the data (deleted or protected posts).
    pub fn error_count(&self) -> usize {
        self.extra.get("errors").and_then(Value::as_array).map_or(0, Vec::len)
    }
}
