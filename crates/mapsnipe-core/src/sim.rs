//! In-memory host used by the `simulate` command and the test suites
//!
//! [`SimulatedHost`] implements every collaborator trait from
//! [`crate::services`] over one shared state. Each call is appended to an
//! action log so callers can check what the worker asked the host to do.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::candidate::Candidate;
use crate::error::{Error, Result};
use crate::services::{
    Ball, CaptureService, EncounterHandshake, InventoryService, NearbySighting, PathWalker,
    Position, PositionService, SurroundingsService, WalkerFactory, Waypoint, WaypointService,
};

/// Meters covered by one walker step unless configured otherwise
pub const DEFAULT_STEP_METERS: f64 = 25.0;

/// One call made against the simulated host
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    SetPosition {
        latitude: f64,
        longitude: f64,
        altitude: f64,
        immediate: bool,
    },
    Heartbeat,
    ScanSurroundings,
    WalkerStep {
        strategy: String,
        latitude: f64,
        longitude: f64,
        arrived: bool,
    },
    EncounterCall {
        species_id: u32,
    },
    CompleteCapture {
        species_id: u32,
    },
    LockSpecies(u32),
    ReleaseLock,
}

#[derive(Debug)]
struct SimState {
    position: Position,
    altitude: f64,
    items: HashMap<u32, u32>,
    step_meters: f64,
    nearby: Vec<NearbySighting>,
    waypoints: Vec<Waypoint>,
    waypoint_names: HashMap<String, String>,
    timeouts: HashSet<String>,
    fail_surroundings: bool,
    fail_relocation: bool,
    fail_captures: bool,
    captures: Vec<u32>,
    capture_lock: Option<u32>,
    actions: Vec<HostAction>,
}

/// Shared in-memory host
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedHost {
    /// Host with the trainer at the given position and 50 poke balls
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let mut items = HashMap::new();
        items.insert(Ball::Poke.item_id(), 50);
        Self {
            state: Arc::new(Mutex::new(SimState {
                position: Position::new(latitude, longitude),
                altitude: 0.0,
                items,
                step_meters: DEFAULT_STEP_METERS,
                nearby: Vec::new(),
                waypoints: Vec::new(),
                waypoint_names: HashMap::new(),
                timeouts: HashSet::new(),
                fail_surroundings: false,
                fail_relocation: false,
                fail_captures: false,
                captures: Vec::new(),
                capture_lock: None,
                actions: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the inventory with `count` poke balls
    pub fn with_balls(self, count: u32) -> Self {
        self.set_balls(Ball::Poke, count);
        {
            let mut state = self.state();
            state.items.remove(&Ball::Great.item_id());
            state.items.remove(&Ball::Ultra.item_id());
        }
        self
    }

    pub fn with_step_meters(self, meters: f64) -> Self {
        self.state().step_meters = meters;
        self
    }

    pub fn set_balls(&self, ball: Ball, count: u32) {
        self.state().items.insert(ball.item_id(), count);
    }

    /// Sightings returned by the next surroundings scans
    pub fn set_nearby(&self, nearby: Vec<NearbySighting>) {
        self.state().nearby = nearby;
    }

    pub fn add_waypoint(&self, id: &str, name: &str, latitude: f64, longitude: f64) {
        let mut state = self.state();
        state.waypoints.push(Waypoint {
            id: id.to_string(),
            latitude,
            longitude,
        });
        state
            .waypoint_names
            .insert(id.to_string(), name.to_string());
    }

    /// Put a waypoint on (or take it off) timeout
    pub fn set_timeout(&self, id: &str, on_timeout: bool) {
        let mut state = self.state();
        if on_timeout {
            state.timeouts.insert(id.to_string());
        } else {
            state.timeouts.remove(id);
        }
    }

    pub fn fail_surroundings(&self, fail: bool) {
        self.state().fail_surroundings = fail;
    }

    pub fn fail_relocation(&self, fail: bool) {
        self.state().fail_relocation = fail;
    }

    pub fn fail_captures(&self, fail: bool) {
        self.state().fail_captures = fail;
    }

    /// Move the trainer without logging an action
    pub fn teleport(&self, latitude: f64, longitude: f64) {
        self.state().position = Position::new(latitude, longitude);
    }

    pub fn position(&self) -> Position {
        self.state().position
    }

    pub fn altitude(&self) -> f64 {
        self.state().altitude
    }

    /// Species ids whose capture completed, in order
    pub fn captures(&self) -> Vec<u32> {
        self.state().captures.clone()
    }

    pub fn capture_lock(&self) -> Option<u32> {
        self.state().capture_lock
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.state().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }
}

impl PositionService for SimulatedHost {
    fn current_position(&self) -> Position {
        self.position()
    }

    fn set_position(
        &self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        immediate: bool,
    ) -> Result<()> {
        let mut state = self.state();
        state.actions.push(HostAction::SetPosition {
            latitude,
            longitude,
            altitude,
            immediate,
        });
        if state.fail_relocation && immediate {
            return Err(Error::service("position", "relocation refused"));
        }
        state.position = Position::new(latitude, longitude);
        state.altitude = altitude;
        Ok(())
    }

    fn heartbeat(&self) -> Result<()> {
        self.state().actions.push(HostAction::Heartbeat);
        Ok(())
    }
}

impl SurroundingsService for SimulatedHost {
    fn nearby_wild_and_catchable(&self) -> Result<Vec<NearbySighting>> {
        let mut state = self.state();
        state.actions.push(HostAction::ScanSurroundings);
        if state.fail_surroundings {
            return Err(Error::service("surroundings", "map objects unavailable"));
        }
        Ok(state.nearby.clone())
    }
}

impl WalkerFactory for SimulatedHost {
    fn create(&self, strategy: &str, latitude: f64, longitude: f64) -> Box<dyn PathWalker> {
        Box::new(SimWalker {
            state: Arc::clone(&self.state),
            strategy: strategy.to_string(),
            target: Position::new(latitude, longitude),
        })
    }
}

impl CaptureService for SimulatedHost {
    fn create_encounter_call(&self, candidate: &Candidate) -> Result<EncounterHandshake> {
        let mut state = self.state();
        state.actions.push(HostAction::EncounterCall {
            species_id: candidate.species_id,
        });
        if state.fail_captures {
            return Err(Error::service("capture", "encounter refused"));
        }
        Ok(EncounterHandshake {
            species_id: candidate.species_id,
            encounter_id: candidate.encounter_id,
            payload: serde_json::json!({
                "status": 1,
                "spawn_point_id": candidate.spawn_point_id,
            }),
        })
    }

    fn complete_capture(&self, handshake: EncounterHandshake) -> Result<()> {
        let mut state = self.state();
        state.actions.push(HostAction::CompleteCapture {
            species_id: handshake.species_id,
        });
        state.captures.push(handshake.species_id);
        Ok(())
    }

    fn lock_to_species(&self, species_id: u32) {
        let mut state = self.state();
        state.actions.push(HostAction::LockSpecies(species_id));
        state.capture_lock = Some(species_id);
    }

    fn release_lock(&self) {
        let mut state = self.state();
        state.actions.push(HostAction::ReleaseLock);
        state.capture_lock = None;
    }
}

impl InventoryService for SimulatedHost {
    fn count_of(&self, item_id: u32) -> u32 {
        self.state().items.get(&item_id).copied().unwrap_or(0)
    }
}

impl WaypointService for SimulatedHost {
    fn nearby_waypoints(&self, ordered_by_distance: bool) -> Vec<Waypoint> {
        let state = self.state();
        let mut waypoints = state.waypoints.clone();
        if ordered_by_distance {
            let here = state.position;
            waypoints.sort_by(|a, b| {
                here.distance_to(&a.position())
                    .total_cmp(&here.distance_to(&b.position()))
            });
        }
        waypoints
    }

    fn waypoint_name(&self, id: &str) -> Option<String> {
        self.state().waypoint_names.get(id).cloned()
    }

    fn is_on_timeout(&self, id: &str) -> bool {
        self.state().timeouts.contains(id)
    }
}

/// Straight-line walker moving a fixed distance per step
struct SimWalker {
    state: Arc<Mutex<SimState>>,
    strategy: String,
    target: Position,
}

impl PathWalker for SimWalker {
    fn step(&mut self) -> bool {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let from = state.position;
        let remaining = from.distance_to(&self.target);
        let arrived = remaining <= state.step_meters;

        state.position = if arrived {
            self.target
        } else {
            let ratio = state.step_meters / remaining;
            Position::new(
                from.latitude + (self.target.latitude - from.latitude) * ratio,
                from.longitude + (self.target.longitude - from.longitude) * ratio,
            )
        };
        state.actions.push(HostAction::WalkerStep {
            strategy: self.strategy.clone(),
            latitude: self.target.latitude,
            longitude: self.target.longitude,
            arrived,
        });
        arrived
    }
}
