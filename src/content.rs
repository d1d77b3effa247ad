use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relevance multiplier applied to activity matches.
pub const ACTIVITY_BOOST: f32 = 1.0;
/// Relevance multiplier applied to app feature matches.
pub const FEATURE_BOOST: f32 = 0.8;
/// Relevance multiplier applied to content resource matches.
pub const CONTENT_RESOURCE_BOOST: f32 = 0.6;

/// The three shapes of catalog record, without their payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Activity,
    Feature,
    ContentResource,
}

impl EntryKind {
    pub const ALL: [EntryKind; 3] = [
        EntryKind::Activity,
        EntryKind::Feature,
        EntryKind::ContentResource,
    ];

    pub fn relevance_boost(self) -> f32 {
        match self {
            EntryKind::Activity => ACTIVITY_BOOST,
            EntryKind::Feature => FEATURE_BOOST,
            EntryKind::ContentResource => CONTENT_RESOURCE_BOOST,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Activity => "activity",
            EntryKind::Feature => "feature",
            EntryKind::ContentResource => "content_resource",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes only learning activities carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub min_age: u8,
    pub max_age: u8,
    /// 1 (easiest) to 5.
    pub difficulty: u8,
    pub duration_minutes: u32,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Kind tag plus the kind-specific payload.
///
/// Serialized inline next to the common entry fields:
///
/// ```
/// use discovery::content::{ContentEntry, EntryKind};
///
/// let json = r#"{
///     "id": "counting-safari",
///     "kind": "activity",
///     "title": "Counting Safari",
///     "description": "Count the animals you meet",
///     "category": "math",
///     "min_age": 3,
///     "max_age": 6,
///     "difficulty": 2,
///     "duration_minutes": 10
/// }"#;
/// let entry: ContentEntry = serde_json::from_str(json).unwrap();
/// assert_eq!(entry.kind(), EntryKind::Activity);
/// assert_eq!(entry.activity().unwrap().difficulty, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    Activity(ActivityDetails),
    Feature,
    ContentResource,
}

/// A single catalog record as supplied by the catalog provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(flatten)]
    pub content: ContentKind,
}

impl ContentEntry {
    pub fn kind(&self) -> EntryKind {
        match self.content {
            ContentKind::Activity(_) => EntryKind::Activity,
            ContentKind::Feature => EntryKind::Feature,
            ContentKind::ContentResource => EntryKind::ContentResource,
        }
    }

    pub fn activity(&self) -> Option<&ActivityDetails> {
        match &self.content {
            ContentKind::Activity(details) => Some(details),
            _ => None,
        }
    }

    pub fn relevance_boost(&self) -> f32 {
        self.kind().relevance_boost()
    }

    /// Lowercased concatenation of every text field the search engine
    /// matches against.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            self.title.as_str(),
            self.description.as_str(),
            self.category.as_str(),
        ];
        if let Some(sub) = &self.subcategory {
            parts.push(sub);
        }
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}
