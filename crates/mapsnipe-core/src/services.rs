//! Host collaborators consumed by the worker
//!
//! The worker never owns trainer state, map cells, inventory or path
//! interpolation. It reaches them through these traits, bundled in
//! [`Services`] and injected when the worker is built.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::candidate::Candidate;
use crate::error::Result;
use crate::events::EventSink;
use crate::utils::distance;

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Meters to another point
    pub fn distance_to(&self, other: &Position) -> f64 {
        distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Trainer position and keepalive
pub trait PositionService: Send + Sync {
    fn current_position(&self) -> Position;

    /// Move the trainer. `immediate` pushes the new position to the server right away.
    fn set_position(&self, latitude: f64, longitude: f64, altitude: f64, immediate: bool)
        -> Result<()>;

    fn heartbeat(&self) -> Result<()>;
}

/// Which map-cell list a nearby sighting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearbyKind {
    Wild,
    Catchable,
}

/// A sighting visible from the trainer's current cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbySighting {
    pub kind: NearbyKind,
    pub species_id: u32,
    pub encounter_id: Option<u64>,
    pub spawn_point_id: Option<String>,
    /// Epoch milliseconds, when the server reported one
    pub expires_at_ms: Option<i64>,
}

/// Refetch of the trainer's surroundings
pub trait SurroundingsService: Send + Sync {
    /// Wild and catchable sightings around the current position
    fn nearby_wild_and_catchable(&self) -> Result<Vec<NearbySighting>>;
}

/// One incremental movement toward a fixed target
pub trait PathWalker {
    /// Advance one step; `true` once the target is reached
    fn step(&mut self) -> bool;
}

/// Builds path-walkers for a named strategy
pub trait WalkerFactory: Send + Sync {
    fn create(&self, strategy: &str, latitude: f64, longitude: f64) -> Box<dyn PathWalker>;
}

/// Result of starting an encounter, consumed when the capture completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterHandshake {
    pub species_id: u32,
    pub encounter_id: Option<u64>,
    /// Host-specific response body
    pub payload: serde_json::Value,
}

/// Capture attempts plus the host's capture lock
pub trait CaptureService: Send + Sync {
    fn create_encounter_call(&self, candidate: &Candidate) -> Result<EncounterHandshake>;

    fn complete_capture(&self, handshake: EncounterHandshake) -> Result<()>;

    /// Restrict the host's generic catching to one species
    fn lock_to_species(&self, species_id: u32);

    /// Lift a lock set by [`CaptureService::lock_to_species`]
    fn release_lock(&self);
}

/// Capture items counted by the inventory gate (master balls excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ball {
    Poke,
    Great,
    Ultra,
}

impl Ball {
    pub const ALL: [Ball; 3] = [Ball::Poke, Ball::Great, Ball::Ultra];

    /// Item id used by the inventory service
    pub fn item_id(self) -> u32 {
        match self {
            Ball::Poke => 1,
            Ball::Great => 2,
            Ball::Ultra => 3,
        }
    }
}

/// Item counts
pub trait InventoryService: Send + Sync {
    fn count_of(&self, item_id: u32) -> u32;

    /// Poke + great + ultra balls
    fn ball_count(&self) -> u32 {
        Ball::ALL.iter().map(|b| self.count_of(b.item_id())).sum()
    }
}

/// A fort the trainer can route through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Nearby forts
pub trait WaypointService: Send + Sync {
    fn nearby_waypoints(&self, ordered_by_distance: bool) -> Vec<Waypoint>;

    fn waypoint_name(&self, id: &str) -> Option<String>;

    /// Forts recently used and temporarily excluded
    fn is_on_timeout(&self, id: &str) -> bool;
}

/// Every collaborator the worker needs
#[derive(Clone)]
pub struct Services {
    pub position: Arc<dyn PositionService>,
    pub surroundings: Arc<dyn SurroundingsService>,
    pub walkers: Arc<dyn WalkerFactory>,
    pub capture: Arc<dyn CaptureService>,
    pub inventory: Arc<dyn InventoryService>,
    pub waypoints: Arc<dyn WaypointService>,
    pub events: Arc<dyn EventSink>,
}

impl Services {
    /// Bundle a host object implementing every collaborator trait
    pub fn from_host<H>(host: Arc<H>, events: Arc<dyn EventSink>) -> Self
    where
        H: PositionService
            + SurroundingsService
            + WalkerFactory
            + CaptureService
            + InventoryService
            + WaypointService
            + 'static,
    {
        Self {
            position: host.clone(),
            surroundings: host.clone(),
            walkers: host.clone(),
            capture: host.clone(),
            inventory: host.clone(),
            waypoints: host,
            events,
        }
    }
}
