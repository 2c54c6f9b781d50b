//! The hardcoded review set shown when nothing live is reachable.
//!
//! Both the publisher and the client loader build their fallback from this
//! one table, so a degraded server and a degraded browser show the same
//! six reviews in the same order.

use chrono::{DateTime, Utc};

use crate::models::{Rating, Review, Snapshot, SOURCE_FALLBACK};

struct FallbackEntry {
    author: &'static str,
    content: &'static str,
    date: &'static str,
}

const FALLBACK_ENTRIES: [FallbackEntry; 6] = [
    FallbackEntry {
        author: "⭐⭐⭐⭐⭐",
        content: "One of the best upcoming role play servers out there amazing staff team the best owners/founders Zhalo + Icy bringing the best fiveM experience possible",
        date: "2025-10-03T00:18:00.000Z",
    },
    FallbackEntry {
        author: "Green",
        content: "one of the best server i played has good staff nice people over all great server",
        date: "2025-10-02T19:06:00.000Z",
    },
    FallbackEntry {
        author: "XRYZKI",
        content: "great server gotta love it",
        date: "2025-10-02T14:13:00.000Z",
    },
    FallbackEntry {
        author: "Zane",
        content: "When I first joined the server, I did not know what to do. So I approached the lovely staff who helped me out so much it was unreal!!",
        date: "2025-10-02T04:36:00.000Z",
    },
    FallbackEntry {
        author: "gamerswhocook",
        content: "Amazing people! Joined to just fined a place to call home and i found it just some lovely people and not money hungry",
        date: "2025-10-02T02:45:00.000Z",
    },
    FallbackEntry {
        author: "Dr_Spitfire",
        content: "Good looking server so far can not wait to see what it looks like when it drops",
        date: "2025-10-02T07:28:00.000Z",
    },
];

/// The fallback reviews, ids `fallback_1` through `fallback_6`.
pub fn fallback_reviews() -> Vec<Review> {
    FALLBACK_ENTRIES
        .iter()
        .enumerate()
        .map(|(i, entry)| Review {
            id: format!("fallback_{}", i + 1),
            author: entry.author.to_string(),
            content: entry.content.to_string(),
            rating: Rating::MAX,
            date: Some(entry.date.to_string()),
            source: SOURCE_FALLBACK.to_string(),
            avatar: None,
        })
        .collect()
}

pub fn fallback_snapshot(now: DateTime<Utc>) -> Snapshot {
    Snapshot::new(fallback_reviews(), SOURCE_FALLBACK, now)
}
