//! Walking toward a target, directly or through a fort on the way

use crate::candidate::Candidate;
use crate::config::SnipeConfig;
use crate::events::{names, Event};
use crate::ledger::DedupLedger;
use crate::services::{Position, Services, Waypoint};
use crate::utils::{format_dist, DistanceUnit};
use crate::worker::WorkerResult;

/// First waypoint (in the given order) whose detour stays within
/// `max_extra_pct` percent of the direct distance.
///
/// Callers pass waypoints nearest-first with timed-out forts already removed.
pub fn waypoint_on_the_way<'a>(
    waypoints: &'a [Waypoint],
    from: Position,
    target: Position,
    max_extra_pct: f64,
) -> Option<&'a Waypoint> {
    let direct = from.distance_to(&target);
    let allowed = (1.0 + max_extra_pct / 100.0) * direct;

    waypoints.iter().find(|waypoint| {
        let via = waypoint.position();
        from.distance_to(&via) + via.distance_to(&target) <= allowed
    })
}

/// Drives one walking step per tick
#[derive(Debug, Clone)]
pub struct WalkDispatcher {
    strategy: String,
    max_extra_dist_pct: f64,
    reachable_distance: f64,
    fort_reachable_distance: f64,
    unit: DistanceUnit,
    locked: Option<u32>,
}

impl WalkDispatcher {
    pub fn new(config: &SnipeConfig) -> Self {
        Self {
            strategy: config.walker.clone(),
            max_extra_dist_pct: config.max_extra_dist_fort,
            reachable_distance: config.reachable_distance,
            fort_reachable_distance: config.fort_reachable_distance,
            unit: config.distance_unit,
            locked: None,
        }
    }

    /// Species the capture lock is currently held for
    pub fn locked_species(&self) -> Option<u32> {
        self.locked
    }

    /// Release the capture lock if this dispatcher holds it
    pub fn release_lock(&mut self, services: &Services) {
        if let Some(species_id) = self.locked.take() {
            tracing::debug!("Releasing capture lock on #{}", species_id);
            services.capture.release_lock();
        }
    }

    /// Take one step toward `target`
    pub fn dispatch(
        &mut self,
        target: &Candidate,
        services: &Services,
        ledger: &mut DedupLedger,
    ) -> WorkerResult {
        let now = chrono::Utc::now().timestamp();
        let here = services.position.current_position();

        let waypoint = if target.is_vip {
            None
        } else {
            let open: Vec<Waypoint> = services
                .waypoints
                .nearby_waypoints(true)
                .into_iter()
                .filter(|w| !services.waypoints.is_on_timeout(&w.id))
                .collect();
            waypoint_on_the_way(&open, here, target.position(), self.max_extra_dist_pct).cloned()
        };

        match waypoint {
            Some(waypoint) => self.walk_via(target, &waypoint, here, services, now),
            None => self.walk_direct(target, services, ledger, now),
        }
    }

    fn walk_direct(
        &mut self,
        target: &Candidate,
        services: &Services,
        ledger: &mut DedupLedger,
        now: i64,
    ) -> WorkerResult {
        if self.locked != Some(target.species_id) {
            self.release_lock(services);
            services.capture.lock_to_species(target.species_id);
            self.locked = Some(target.species_id);
        }

        services.events.emit(Event::for_candidate(
            names::MOVE_TOWARDS,
            "Moving towards {poke_name}, {poke_dist}, left ({disappears_in})",
            target,
            self.unit,
            now,
        ));

        let mut walker =
            services
                .walkers
                .create(&self.strategy, target.latitude, target.longitude);
        let arrived = walker.step();

        let remaining = services
            .position
            .current_position()
            .distance_to(&target.position());

        if arrived && remaining <= self.reachable_distance {
            services.events.emit(Event::for_candidate(
                names::ENCOUNTER,
                "Encountered Pokemon: {poke_name}",
                target,
                self.unit,
                now,
            ));
            self.release_lock(services);
            ledger.record(target);
            return WorkerResult::Success;
        }

        WorkerResult::Running
    }

    fn walk_via(
        &mut self,
        target: &Candidate,
        waypoint: &Waypoint,
        here: Position,
        services: &Services,
        now: i64,
    ) -> WorkerResult {
        // The fort route is not tied to one species
        self.release_lock(services);

        let to_fort = here.distance_to(&waypoint.position());
        let fort_name = services
            .waypoints
            .waypoint_name(&waypoint.id)
            .unwrap_or_else(|| "Unknown".to_string());

        if to_fort > self.fort_reachable_distance {
            services.events.emit(
                Event::for_candidate(
                    names::THROUGH_FORT,
                    "Moving towards {poke_name} - {poke_dist} through pokestop {fort_name} - {distance}",
                    target,
                    self.unit,
                    now,
                )
                .with("fort_name", fort_name)
                .with("distance", format_dist(to_fort, self.unit)),
            );
        } else {
            services.events.emit(
                Event::new(names::ARRIVED_AT_FORT, "Arrived at fort {fort_name}.")
                    .with("fort_name", fort_name),
            );
        }

        let mut walker =
            services
                .walkers
                .create(&self.strategy, waypoint.latitude, waypoint.longitude);
        if walker.step() {
            WorkerResult::Success
        } else {
            WorkerResult::Running
        }
    }
}
