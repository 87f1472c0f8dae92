//! Sighting feeds
//!
//! Two sources deliver raw sightings to the worker:
//! - [`PushFeed`]: a bounded queue filled by a listener on a real-time channel
//!   and drained once per tick
//! - [`HttpFeed`]: a map server polled with one blocking GET per tick
//!
//! Both normalize their wire records into [`Sighting`]s.

mod pull;
mod push;

pub use pull::{parse_response, HttpFeed, MapPokemon};
pub use push::{PushFeed, SightingSender, SocialSighting};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which kind of feed a sighting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    Push,
    Pull,
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
        }
    }
}

/// One reported creature appearance, before filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub species_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub encounter_id: Option<u64>,
    pub spawn_point_id: Option<String>,
    /// Epoch seconds after which the sighting is stale
    pub expires_at: i64,
    pub iv: Option<f64>,
}

/// A source polled once per tick
///
/// The outer `Result` is a feed-level failure (nothing could be read); inner
/// errors are per-item parse failures the caller skips.
pub trait SightingSource: Send {
    /// Kind of feed, which decides the filter rules and whether targets are trusted
    fn mode(&self) -> FeedMode;

    /// Take the current snapshot of sightings
    fn poll(&mut self) -> Result<Vec<Result<Sighting>>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Empty identifiers on the wire mean "unknown"
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
