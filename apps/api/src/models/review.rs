use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Provenance tag for reviews pulled from the upstream feed.
pub const SOURCE_LIVE: &str = "live";
/// Provenance tag for the hardcoded review set.
pub const SOURCE_FALLBACK: &str = "fallback";

const AVATARS: [&str; 8] = ["⭐", "👤", "🎮", "🕹️", "🎯", "🏆", "💎", "🔥"];

/// One user testimonial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    /// Raw text. Escape before putting it anywhere near HTML.
    pub content: String,
    #[serde(default)]
    pub rating: Rating,
    /// ISO-8601 when present. Not validated here; the renderer degrades on garbage.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

fn default_source() -> String {
    SOURCE_LIVE.to_string()
}

impl Review {
    /// The review's own avatar, or a glyph picked deterministically from the author name.
    pub fn display_avatar(&self) -> &str {
        match self.avatar.as_deref() {
            Some(avatar) if !avatar.is_empty() => avatar,
            _ => derive_avatar(&self.author),
        }
    }
}

/// Picks a glyph from the first UTF-16 code unit of `author`.
pub fn derive_avatar(author: &str) -> &'static str {
    let unit = author.encode_utf16().next().unwrap_or(0) as usize;
    AVATARS[unit % AVATARS.len()]
}

/// Star rating, 1 through 5. Accepted as `"5"` or `5`, always written as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: Rating = Rating(5);

    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Rating(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating::MAX
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRating {
            Number(i64),
            Text(String),
        }

        let value = match RawRating::deserialize(deserializer)? {
            RawRating::Number(n) => n,
            RawRating::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("rating '{s}' is not a number")))?,
        };

        u8::try_from(value)
            .ok()
            .and_then(Rating::new)
            .ok_or_else(|| D::Error::custom(format!("rating {value} is outside 1-5")))
    }
}

/// A complete set of reviews plus metadata. `count` only exists on the wire
/// and is always derived from `reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotWire", into = "SnapshotWire")]
pub struct Snapshot {
    pub reviews: Vec<Review>,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

impl Snapshot {
    pub fn new(
        reviews: Vec<Review>,
        source: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            reviews,
            last_updated,
            source: source.into(),
        }
    }

    pub fn count(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotWire {
    reviews: Vec<Review>,
    last_updated: DateTime<Utc>,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    count: usize,
}

impl From<SnapshotWire> for Snapshot {
    fn from(wire: SnapshotWire) -> Self {
        // The stored count is ignored; a hand-edited file must not break the invariant.
        Snapshot {
            reviews: wire.reviews,
            last_updated: wire.last_updated,
            source: wire.source,
        }
    }
}

impl From<Snapshot> for SnapshotWire {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotWire {
            count: snapshot.reviews.len(),
            reviews: snapshot.reviews,
            last_updated: snapshot.last_updated,
            source: snapshot.source,
        }
    }
}
