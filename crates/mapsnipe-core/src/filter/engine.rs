//! Filter engine turning feed sightings into eligible candidates

use super::{FilterCriteria, Rejection};
use crate::candidate::Candidate;
use crate::feed::{FeedMode, Sighting};
use crate::ledger::DedupLedger;
use crate::services::Position;
use crate::species::SpeciesTable;

/// A sighting that did not pass, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSighting {
    pub species_id: u32,
    /// Resolved name, when the species is known
    pub name: Option<String>,
    pub reason: Rejection,
}

impl std::fmt::Display for RejectedSighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Skipped {} because {}", name, self.reason),
            None => write!(f, "Skipped #{} because {}", self.species_id, self.reason),
        }
    }
}

/// Outcome of filtering one feed snapshot
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    /// Eligible candidates in feed order
    pub candidates: Vec<Candidate>,
    pub rejected: Vec<RejectedSighting>,
}

/// Everything the filter reads besides the sightings themselves
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub mode: FeedMode,
    /// Trainer position for this tick
    pub position: Position,
    /// Epoch seconds
    pub now: i64,
    pub ledger: &'a DedupLedger,
    pub species: &'a SpeciesTable,
}

/// Engine applying [`FilterCriteria`] to sightings
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    criteria: FilterCriteria,
}

impl CandidateFilter {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Filter a snapshot, keeping feed order
    pub fn filter(&self, sightings: &[Sighting], ctx: &FilterContext<'_>) -> FilterReport {
        let mut report = FilterReport::default();
        for sighting in sightings {
            match self.evaluate(sighting, ctx) {
                Ok(candidate) => report.candidates.push(candidate),
                Err(rejected) => report.rejected.push(rejected),
            }
        }
        report
    }

    /// Run one sighting through the rules in order
    pub fn evaluate(
        &self,
        sighting: &Sighting,
        ctx: &FilterContext<'_>,
    ) -> Result<Candidate, RejectedSighting> {
        let reject = |name: Option<&str>, reason: Rejection| RejectedSighting {
            species_id: sighting.species_id,
            name: name.map(str::to_string),
            reason,
        };

        let name = ctx
            .species
            .name(sighting.species_id)
            .map_err(|_| reject(None, Rejection::UnknownSpecies(sighting.species_id)))?;
        let is_vip = self.criteria.is_vip(name);

        // Pull feeds also let VIPs through; pushed sightings must be allow-listed
        let allowed = match ctx.mode {
            FeedMode::Push => self.criteria.is_allowed(name),
            FeedMode::Pull => self.criteria.is_allowed(name) || is_vip,
        };
        if !allowed {
            return Err(reject(Some(name), Rejection::NotInCatchList));
        }

        if ctx.ledger.is_inspected(sighting.latitude, sighting.longitude) {
            return Err(reject(Some(name), Rejection::AlreadyInspected));
        }

        let mut candidate = Candidate::from_sighting(sighting, name, is_vip);
        candidate.distance = ctx.position.distance_to(&candidate.position());

        if candidate.distance > self.criteria.max_sniping_distance {
            return Err(reject(
                Some(name),
                Rejection::BeyondSnipingRange {
                    max: self.criteria.max_sniping_distance,
                },
            ));
        }

        if !self.criteria.snipe {
            if candidate.distance > self.criteria.max_walking_distance {
                return Err(reject(
                    Some(name),
                    Rejection::BeyondWalkingRange {
                        max: self.criteria.max_walking_distance,
                    },
                ));
            }

            let walkable = candidate.seconds_left(ctx.now) as f64 * self.criteria.mean_walk_speed;
            if candidate.distance > walkable {
                return Err(reject(Some(name), Rejection::UnreachableInTime));
            }
        }

        candidate.priority = self.criteria.priority_of(name);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerEntry;

    const NOW: i64 = 1_700_000_000;
    const HOME: Position = Position {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Roughly `meters` north of HOME
    fn sighting(species_id: u32, meters: f64) -> Sighting {
        Sighting {
            species_id,
            latitude: meters / 111_195.0,
            longitude: 0.0,
            encounter_id: None,
            spawn_point_id: None,
            expires_at: NOW + 3600,
            iv: None,
        }
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria::new()
            .with_catch("Pikachu", 20)
            .with_catch("Pidgey", 0)
            .with_vip("Dragonite")
            .with_distances(5_000.0, 1_000.0)
            .with_walk_speed(3.0)
    }

    fn run(
        filter: &CandidateFilter,
        sightings: &[Sighting],
        mode: FeedMode,
        ledger: &DedupLedger,
    ) -> FilterReport {
        let species = SpeciesTable::builtin();
        let ctx = FilterContext {
            mode,
            position: HOME,
            now: NOW,
            ledger,
            species: &species,
        };
        filter.filter(sightings, &ctx)
    }

    #[test]
    fn test_attaches_distance_priority_and_vip() {
        let filter = CandidateFilter::new(criteria().with_catch("Dragonite", 500));
        let report = run(
            &filter,
            &[sighting(25, 200.0), sighting(149, 300.0)],
            FeedMode::Pull,
            &DedupLedger::new(),
        );

        assert_eq!(report.candidates.len(), 2);
        let pikachu = &report.candidates[0];
        assert_eq!(pikachu.name, "Pikachu");
        assert_eq!(pikachu.priority, 20);
        assert!(!pikachu.is_vip);
        assert!((pikachu.distance - 200.0).abs() < 1.0);

        let dragonite = &report.candidates[1];
        assert!(dragonite.is_vip);
        assert_eq!(dragonite.priority, 500);
    }

    #[test]
    fn test_ledger_entries_are_suppressed() {
        let mut ledger = DedupLedger::new();
        let seen = sighting(25, 200.0);
        ledger.inspect(LedgerEntry {
            latitude: seen.latitude + 0.000_01,
            longitude: seen.longitude,
            pokemon_id: 25,
            name: "Pikachu".to_string(),
            encounter_id: None,
            spawn_point_id: None,
            expires_at: 0,
        });

        let filter = CandidateFilter::new(criteria());
        for mode in [FeedMode::Push, FeedMode::Pull] {
            let report = run(&filter, &[seen.clone(), seen.clone()], mode, &ledger);
            assert!(report.candidates.is_empty());
            assert!(report
                .rejected
                .iter()
                .all(|r| r.reason == Rejection::AlreadyInspected));
        }
    }

    #[test]
    fn test_sniping_range_applies_regardless_of_toggle() {
        for snipe in [false, true] {
            let filter = CandidateFilter::new(criteria().with_snipe(snipe));
            let report = run(&filter, &[sighting(25, 6_000.0)], FeedMode::Pull, &DedupLedger::new());
            assert!(report.candidates.is_empty());
            assert_eq!(
                report.rejected[0].reason,
                Rejection::BeyondSnipingRange { max: 5_000.0 }
            );
        }
    }

    #[test]
    fn test_walking_range_only_without_sniping() {
        let far = [sighting(25, 2_000.0)];

        let walking = CandidateFilter::new(criteria().with_snipe(false));
        let report = run(&walking, &far, FeedMode::Push, &DedupLedger::new());
        assert!(report.candidates.is_empty());
        assert_eq!(
            report.rejected[0].reason,
            Rejection::BeyondWalkingRange { max: 1_000.0 }
        );

        let sniping = CandidateFilter::new(criteria().with_snipe(true));
        let report = run(&sniping, &far, FeedMode::Push, &DedupLedger::new());
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn test_unreachable_before_expiry() {
        // 900m away, 60s left at 3 m/s = 180m walkable
        let mut soon = sighting(25, 900.0);
        soon.expires_at = NOW + 60;

        let walking = CandidateFilter::new(criteria());
        let report = run(&walking, &[soon.clone()], FeedMode::Pull, &DedupLedger::new());
        assert_eq!(report.rejected[0].reason, Rejection::UnreachableInTime);

        let sniping = CandidateFilter::new(criteria().with_snipe(true));
        let report = run(&sniping, &[soon], FeedMode::Pull, &DedupLedger::new());
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn test_vip_allow_list_differs_per_feed() {
        // Dragonite is a VIP but not in the catch list
        let filter = CandidateFilter::new(criteria());
        let vip = [sighting(149, 100.0)];

        let pull = run(&filter, &vip, FeedMode::Pull, &DedupLedger::new());
        assert_eq!(pull.candidates.len(), 1);
        assert_eq!(pull.candidates[0].priority, 0);

        let push = run(&filter, &vip, FeedMode::Push, &DedupLedger::new());
        assert!(push.candidates.is_empty());
        assert_eq!(push.rejected[0].reason, Rejection::NotInCatchList);
    }

    #[test]
    fn test_unknown_species_and_order() {
        let filter = CandidateFilter::new(criteria());
        let report = run(
            &filter,
            &[sighting(16, 50.0), sighting(999, 50.0), sighting(25, 60.0)],
            FeedMode::Pull,
            &DedupLedger::new(),
        );

        let names: Vec<_> = report.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Pidgey", "Pikachu"]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].reason, Rejection::UnknownSpecies(999));
        assert_eq!(
            report.rejected[0].to_string(),
            "Skipped #999 because species #999 is unknown"
        );
    }
}
