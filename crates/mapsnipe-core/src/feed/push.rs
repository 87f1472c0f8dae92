//! Push feed: bounded queue between a real-time listener and the worker

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use super::{non_empty, FeedMode, Sighting, SightingSource};
use crate::error::Result;

/// A sighting as published on the real-time channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSighting {
    pub pokemon_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub encounter_id: Option<u64>,
    #[serde(default)]
    pub spawn_point_id: Option<String>,
    pub expiration_timestamp_ms: i64,
}

impl SocialSighting {
    pub fn into_sighting(self) -> Sighting {
        Sighting {
            species_id: self.pokemon_id,
            latitude: self.latitude,
            longitude: self.longitude,
            encounter_id: self.encounter_id,
            spawn_point_id: non_empty(self.spawn_point_id),
            expires_at: self.expiration_timestamp_ms / 1000,
            iv: None,
        }
    }
}

/// Handle given to the listener side of the push feed
#[derive(Debug, Clone)]
pub struct SightingSender {
    tx: SyncSender<SocialSighting>,
}

impl SightingSender {
    /// Queue a sighting without blocking.
    ///
    /// Returns `false` when the queue is full or the worker is gone; the
    /// sighting is dropped in both cases.
    pub fn send(&self, sighting: SocialSighting) -> bool {
        match self.tx.try_send(sighting) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(
                    "Push feed queue is full, dropping sighting of #{}",
                    dropped.pokemon_id
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Parse a JSON payload from the channel and queue it
    pub fn send_json(&self, payload: &str) -> Result<bool> {
        let sighting: SocialSighting = serde_json::from_str(payload)?;
        Ok(self.send(sighting))
    }
}

/// Worker side of the push feed
#[derive(Debug)]
pub struct PushFeed {
    rx: Receiver<SocialSighting>,
    capacity: usize,
}

impl PushFeed {
    /// Create a queue holding at most `capacity` undelivered sightings
    pub fn bounded(capacity: usize) -> (SightingSender, PushFeed) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (SightingSender { tx }, PushFeed { rx, capacity })
    }

    /// Take everything queued so far, leaving the queue empty
    pub fn drain(&self) -> Vec<SocialSighting> {
        self.rx.try_iter().collect()
    }
}

impl SightingSource for PushFeed {
    fn mode(&self) -> FeedMode {
        FeedMode::Push
    }

    fn poll(&mut self) -> Result<Vec<Result<Sighting>>> {
        Ok(self
            .drain()
            .into_iter()
            .map(|s| Ok(s.into_sighting()))
            .collect())
    }

    fn describe(&self) -> String {
        format!("push queue (capacity {})", self.capacity)
    }
}
