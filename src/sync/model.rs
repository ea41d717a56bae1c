//! Entities mirrored from the remote side: feeds and entries.
//!
//! The server speaks loosely-typed JSON (ids and counters may arrive as
//! strings, flags as `0`/`1`), so deserialization goes through the
//! [`lenient`] helpers instead of serde's strict defaults.

use serde::{Deserialize, Serialize};

pub type FeedId = i64;
pub type EntryId = i64;

// ============================================================================
// Feed
// ============================================================================

/// A subscribed feed with its locally tracked unread counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(deserialize_with = "lenient::id")]
    pub id: FeedId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: String,
    /// Ordered set of tag names. Travels as a comma-separated string.
    #[serde(
        default,
        deserialize_with = "lenient::tags",
        serialize_with = "lenient::serialize_tags"
    )]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub unread_count: u32,
}

impl Feed {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Display title, falling back to the URL for feeds the server has not
    /// named yet.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// A single syndicated item. `content` is absent in list responses and
/// fetched lazily when the entry is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(deserialize_with = "lenient::id")]
    pub id: EntryId,
    #[serde(deserialize_with = "lenient::id")]
    pub feed_id: FeedId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub read: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub favorite: bool,
}

impl Entry {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Apply a patch locally. Returns the read transition it caused, if any.
    pub fn apply(&mut self, patch: &EntryPatch) -> Option<ReadTransition> {
        if let Some(favorite) = patch.favorite {
            self.favorite = favorite;
        }
        match patch.read {
            Some(read) if read != self.read => {
                self.read = read;
                Some(ReadTransition {
                    feed_id: self.feed_id,
                    now_read: read,
                })
            }
            _ => None,
        }
    }
}

/// A change of an entry's `read` flag, consumed by the aggregate tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTransition {
    pub feed_id: FeedId,
    pub now_read: bool,
}

// ============================================================================
// Mutation payloads
// ============================================================================

/// Partial update of an entry. Flags serialize as `0`/`1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryPatch {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "lenient::serialize_opt_flag"
    )]
    pub read: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "lenient::serialize_opt_flag"
    )]
    pub favorite: Option<bool>,
}

impl EntryPatch {
    pub fn read(value: bool) -> Self {
        Self {
            read: Some(value),
            favorite: None,
        }
    }

    pub fn favorite(value: bool) -> Self {
        Self {
            read: None,
            favorite: Some(value),
        }
    }
}

/// Partial update of a feed's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "lenient::serialize_opt_tags"
    )]
    pub tags: Option<Vec<String>>,
}

/// Subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFeed {
    pub url: String,
    #[serde(serialize_with = "lenient::serialize_tags")]
    pub tags: Vec<String>,
}

// ============================================================================
// Tag helpers
// ============================================================================

/// Split a comma-separated tag field into an ordered set: trimmed,
/// empty names dropped, first occurrence wins.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

// ============================================================================
// Lenient serde helpers
// ============================================================================

pub(crate) mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagsRepr {
        List(Vec<String>),
        Joined(String),
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Scalar::deserialize(d)? {
            Scalar::Int(n) => Ok(n),
            Scalar::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid id: {:?}", s))),
            _ => Err(D::Error::custom("id must be an integer or numeric string")),
        }
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = match Option::<Scalar>::deserialize(d)? {
            None => 0,
            Some(Scalar::Int(n)) => n,
            Some(Scalar::Float(f)) => f as i64,
            Some(Scalar::Str(s)) if s.trim().is_empty() => 0,
            Some(Scalar::Str(s)) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid count: {:?}", s)))?,
            Some(Scalar::Bool(_)) => return Err(D::Error::custom("count must be numeric")),
        };
        Ok(value.clamp(0, u32::MAX as i64) as u32)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(false),
            Some(Scalar::Bool(b)) => Ok(b),
            Some(Scalar::Int(n)) => Ok(n != 0),
            Some(Scalar::Float(f)) => Ok(f != 0.0),
            Some(Scalar::Str(s)) => match s.trim() {
                "" | "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                other => Err(D::Error::custom(format!("invalid flag: {:?}", other))),
            },
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }

    pub fn tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<TagsRepr>::deserialize(d)? {
            None => Vec::new(),
            Some(TagsRepr::Joined(raw)) => super::split_tags(&raw),
            Some(TagsRepr::List(list)) => super::split_tags(&list.join(",")),
        })
    }

    pub fn serialize_tags<S: Serializer>(tags: &[String], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::join_tags(tags))
    }

    pub fn serialize_opt_tags<S: Serializer>(
        tags: &Option<Vec<String>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match tags {
            Some(tags) => serialize_tags(tags, s),
            None => s.serialize_none(),
        }
    }

    pub fn serialize_opt_flag<S: Serializer>(flag: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        match flag {
            Some(value) => s.serialize_u8(u8::from(*value)),
            None => s.serialize_none(),
        }
    }
}
