//! Relocation protocol: backup, teleport, validate, capture, restore
//!
//! One call to [`Sniper::snipe`] runs the whole sequence synchronously. Once
//! the trainer has been relocated the protocol always runs through `Restore`
//! before returning, whatever the collaborators report, so the trainer's
//! authoritative position is never left at the target.

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::candidate::Candidate;
use crate::config::SnipeConfig;
use crate::error::Error;
use crate::events::{names, Event};
use crate::ledger::DedupLedger;
use crate::services::{EncounterHandshake, Position, Services};
use crate::utils::DistanceUnit;

/// Stage of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipePhase {
    Backup,
    Relocate,
    Validate,
    Capture,
    Abort,
    Restore,
    Done,
}

impl std::fmt::Display for SnipePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Relocate => write!(f, "relocate"),
            Self::Validate => write!(f, "validate"),
            Self::Capture => write!(f, "capture"),
            Self::Abort => write!(f, "abort"),
            Self::Restore => write!(f, "restore"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipeOutcome {
    /// Target confirmed and the capture was driven
    Encountered,
    /// Target not found at its location
    Vanished,
    /// Never relocated (cancelled or the relocation was refused)
    Abandoned,
}

/// Trace of one attempt
#[derive(Debug, Clone)]
pub struct SnipeReport {
    pub outcome: SnipeOutcome,
    /// Phases in the order they ran
    pub phases: Vec<SnipePhase>,
    /// Position recorded in `Backup`
    pub backup: Position,
    /// Target after validation, with any backfilled identifiers
    pub target: Candidate,
}

/// Pauses between protocol stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnipeTimings {
    /// After each relocation and before scanning surroundings
    pub relocation_settle: Duration,
    /// Around the capture/restore steps
    pub snipe_sleep: Duration,
}

impl SnipeTimings {
    pub fn from_config(config: &SnipeConfig) -> Self {
        Self {
            relocation_settle: config.relocation_settle(),
            snipe_sleep: config.snipe_sleep(),
        }
    }

    /// No pauses at all
    pub fn immediate() -> Self {
        Self {
            relocation_settle: Duration::ZERO,
            snipe_sleep: Duration::ZERO,
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

/// Draw the relocation altitude from the configured range
fn draw_altitude(min: f64, max: f64) -> f64 {
    if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    }
}

/// Runs the relocation protocol
#[derive(Debug, Clone)]
pub struct Sniper {
    altitude: f64,
    trust_feed: bool,
    timings: SnipeTimings,
    unit: DistanceUnit,
    cancellation: Option<Arc<AtomicBool>>,
}

impl Sniper {
    /// Create a sniper; the altitude is drawn once here and reused for every relocation
    pub fn new(config: &SnipeConfig) -> Self {
        Self {
            altitude: draw_altitude(config.alt_min, config.alt_max),
            trust_feed: false,
            timings: SnipeTimings::from_config(config),
            unit: config.distance_unit,
            cancellation: None,
        }
    }

    /// Skip validation: the feed is authoritative
    pub fn with_trusted_feed(mut self, trusted: bool) -> Self {
        self.trust_feed = trusted;
        self
    }

    pub fn with_timings(mut self, timings: SnipeTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    /// Flag checked before relocating; setting it abandons attempts that have not moved yet
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn timings(&self) -> SnipeTimings {
        self.timings
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the protocol against one candidate.
    ///
    /// Every attempt that reached `Relocate` is recorded in the ledger, whether
    /// the target was confirmed, vanished or the relocation was refused.
    /// Cancelled attempts are not recorded.
    pub fn snipe(
        &self,
        candidate: &Candidate,
        services: &Services,
        ledger: &mut DedupLedger,
    ) -> SnipeReport {
        let now = chrono::Utc::now().timestamp();
        let mut target = candidate.clone();
        let mut phases = vec![SnipePhase::Backup];

        let backup = services.position.current_position();
        if let Err(e) = services.position.heartbeat() {
            tracing::warn!("Heartbeat before relocation failed: {}", e);
        }

        if self.is_cancelled() {
            tracing::info!("Snipe of {} abandoned: {}", target.name, Error::Cancelled);
            phases.push(SnipePhase::Done);
            return SnipeReport {
                outcome: SnipeOutcome::Abandoned,
                phases,
                backup,
                target,
            };
        }

        phases.push(SnipePhase::Relocate);
        services.events.emit(Event::for_candidate(
            names::TELEPORT_TO,
            "Teleporting to {poke_name}. ({poke_dist})",
            &target,
            self.unit,
            now,
        ));
        if let Err(e) =
            services
                .position
                .set_position(target.latitude, target.longitude, self.altitude, true)
        {
            services
                .events
                .emit(Event::failure(format!("Could not teleport to {}: {}", target.name, e)));
            ledger.record(&target);
            phases.push(SnipePhase::Done);
            return SnipeReport {
                outcome: SnipeOutcome::Abandoned,
                phases,
                backup,
                target,
            };
        }
        pause(self.timings.relocation_settle);

        let exists = if self.trust_feed {
            true
        } else {
            phases.push(SnipePhase::Validate);
            self.validate(&mut target, services)
        };

        let outcome = if exists {
            phases.push(SnipePhase::Capture);
            services.events.emit(Event::for_candidate(
                names::ENCOUNTER,
                "Encountered Pokemon: {poke_name}",
                &target,
                self.unit,
                now,
            ));

            let handshake = match services.capture.create_encounter_call(&target) {
                Ok(handshake) => Some(handshake),
                Err(e) => {
                    services.events.emit(Event::failure(format!(
                        "Could not start encounter with {}: {}",
                        target.name, e
                    )));
                    None
                }
            };
            pause(self.timings.snipe_sleep);

            self.restore(backup, services, &mut phases);
            if let Some(handshake) = handshake {
                self.complete(handshake, &target, services);
            }
            ledger.record(&target);
            SnipeOutcome::Encountered
        } else {
            phases.push(SnipePhase::Abort);
            services.events.emit(Event::failure(format!(
                "{} doesnt exist anymore. Skipping...",
                target.name
            )));
            ledger.record(&target);
            pause(self.timings.snipe_sleep);

            self.restore(backup, services, &mut phases);
            SnipeOutcome::Vanished
        };

        phases.push(SnipePhase::Done);
        SnipeReport {
            outcome,
            phases,
            backup,
            target,
        }
    }

    /// Look for the target among the sightings visible after relocating
    fn validate(&self, target: &mut Candidate, services: &Services) -> bool {
        let nearby = match services.surroundings.nearby_wild_and_catchable() {
            Ok(nearby) => nearby,
            Err(e) => {
                tracing::warn!("Could not refresh surroundings: {}", e);
                return false;
            }
        };
        pause(self.timings.relocation_settle);

        let Some(found) = nearby.iter().find(|n| n.species_id == target.species_id) else {
            return false;
        };

        if target.lacks_identifiers() {
            tracing::debug!(
                "Backfilling identifiers of {} from surroundings (encounter {:?})",
                target.name,
                found.encounter_id
            );
            target.encounter_id = found.encounter_id;
            target.spawn_point_id = found.spawn_point_id.clone();
            if let Some(expires_at_ms) = found.expires_at_ms {
                target.expires_at = expires_at_ms / 1000;
            }
        }
        true
    }

    fn complete(&self, handshake: EncounterHandshake, target: &Candidate, services: &Services) {
        if let Err(e) = services.capture.complete_capture(handshake) {
            services.events.emit(Event::failure(format!(
                "Capture of {} failed: {}",
                target.name, e
            )));
        }
    }

    /// Move back to the backup position and resync with the server
    fn restore(&self, backup: Position, services: &Services, phases: &mut Vec<SnipePhase>) {
        phases.push(SnipePhase::Restore);
        services.events.emit(
            Event::new(
                names::TELEPORT_BACK,
                "Teleporting back to previous location ({last_lat}, {last_lon})...",
            )
            .with("last_lat", backup.latitude)
            .with("last_lon", backup.longitude),
        );

        if let Err(e) = services.position.set_position(
            backup.latitude,
            backup.longitude,
            self.altitude,
            false,
        ) {
            tracing::error!(
                "Could not restore position ({}, {}): {}",
                backup.latitude,
                backup.longitude,
                e
            );
        }
        pause(self.timings.snipe_sleep);

        if let Err(e) = services.position.heartbeat() {
            tracing::warn!("Heartbeat after restore failed: {}", e);
        }
    }
}
