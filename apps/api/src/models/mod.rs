pub mod review;

pub use review::{Rating, Review, Snapshot, SOURCE_FALLBACK, SOURCE_LIVE};
