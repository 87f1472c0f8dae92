//! Eligible targets produced by the candidate filter

use serde::{Deserialize, Serialize};

use crate::feed::Sighting;
use crate::services::Position;

/// A filtered sighting enriched with distance, priority and VIP status.
///
/// Distance and priority are computed against the trainer position of the
/// tick that produced the candidate and are never carried into the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub species_id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub encounter_id: Option<u64>,
    pub spawn_point_id: Option<String>,
    /// Epoch seconds
    pub expires_at: i64,
    pub iv: Option<f64>,
    /// Meters from the trainer at filter time
    pub distance: f64,
    pub priority: i32,
    pub is_vip: bool,
}

impl Candidate {
    pub fn from_sighting(sighting: &Sighting, name: impl Into<String>, is_vip: bool) -> Self {
        Self {
            species_id: sighting.species_id,
            name: name.into(),
            latitude: sighting.latitude,
            longitude: sighting.longitude,
            encounter_id: sighting.encounter_id,
            spawn_point_id: sighting.spawn_point_id.clone(),
            expires_at: sighting.expires_at,
            iv: sighting.iv,
            distance: 0.0,
            priority: 0,
            is_vip,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }

    /// Seconds until the sighting goes stale (negative once expired)
    pub fn seconds_left(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    /// Whether either identifier is missing
    pub fn lacks_identifiers(&self) -> bool {
        self.encounter_id.is_none() || self.spawn_point_id.is_none()
    }
}
