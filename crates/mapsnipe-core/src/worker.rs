//! Per-tick worker
//!
//! [`SnipeWorker::work`] is called repeatedly by an external scheduler. Each
//! call checks the ball inventory, persists the ledger, polls the feed,
//! filters and ranks what it got, then either snipes or takes one walking
//! step toward the best candidate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::candidate::Candidate;
use crate::config::{FeedSourceConfig, SnipeConfig};
use crate::error::{Error, Result};
use crate::events::Event;
use crate::feed::{FeedMode, HttpFeed, PushFeed, Sighting, SightingSender, SightingSource};
use crate::filter::{CandidateFilter, FilterContext, FilterCriteria, FilterReport, Rejection};
use crate::ledger::DedupLedger;
use crate::selector::TargetSelector;
use crate::services::Services;
use crate::snipe::{SnipeReport, SnipeTimings, Sniper};
use crate::species::SpeciesTable;
use crate::walker::WalkDispatcher;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerResult {
    /// Nothing left to do this tick
    Success,
    /// Still walking toward a target
    Running,
}

/// Build the sighting source described by the configuration.
///
/// Push feeds also return the sender the listener should write to.
pub fn source_from_config(
    config: &SnipeConfig,
) -> Result<(Box<dyn SightingSource>, Option<SightingSender>)> {
    match &config.feed {
        FeedSourceConfig::Push { capacity } => {
            let (sender, feed) = PushFeed::bounded(*capacity);
            Ok((Box::new(feed), Some(sender)))
        }
        FeedSourceConfig::Pull { address } => Ok((Box::new(HttpFeed::new(address.clone())?), None)),
    }
}

/// The map-feed sniping worker
pub struct SnipeWorker {
    config: SnipeConfig,
    species: SpeciesTable,
    ledger: DedupLedger,
    source: Box<dyn SightingSource>,
    services: Services,
    filter: CandidateFilter,
    selector: TargetSelector,
    sniper: Sniper,
    walker: WalkDispatcher,
    bypass_count: u32,
    cancellation: Arc<AtomicBool>,
}

impl SnipeWorker {
    pub fn builder(config: SnipeConfig) -> SnipeWorkerBuilder {
        SnipeWorkerBuilder::new(config)
    }

    pub fn config(&self) -> &SnipeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn sniper(&self) -> &Sniper {
        &self.sniper
    }

    /// Flag that abandons pending snipes once set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancellation)
    }

    pub fn feed_mode(&self) -> FeedMode {
        self.source.mode()
    }

    fn log(&self, message: impl Into<String>) {
        self.services.events.emit(Event::log(message));
    }

    fn has_enough_balls(&self) -> bool {
        let balls = self.services.inventory.ball_count();
        if balls < self.config.min_ball {
            self.log(format!(
                "Not enough balls to start sniping (have {}, {} needed)",
                balls, self.config.min_ball
            ));
            return false;
        }
        true
    }

    /// Poll the feed once and return the ranked candidates with the rejections.
    ///
    /// Feed failures are reported as failure events and yield an empty report.
    pub fn scan(&mut self) -> FilterReport {
        let sightings = self.poll();
        let ctx = FilterContext {
            mode: self.source.mode(),
            position: self.services.position.current_position(),
            now: chrono::Utc::now().timestamp(),
            ledger: &self.ledger,
            species: &self.species,
        };
        let mut report = self.filter.filter(&sightings, &ctx);
        self.selector.rank(&mut report.candidates);
        report
    }

    fn poll(&mut self) -> Vec<Sighting> {
        let items = match self.source.poll() {
            Ok(items) => items,
            Err(e) => {
                self.services.events.emit(Event::failure(e.to_string()));
                return Vec::new();
            }
        };

        let mut sightings = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Ok(sighting) => sightings.push(sighting),
                Err(e) => self.log(format!("Error while parsing information: {}", e)),
            }
        }
        tracing::debug!(
            "Got {} sightings from {}",
            sightings.len(),
            self.source.describe()
        );
        sightings
    }

    fn report_rejections(&self, report: &FilterReport) {
        for rejected in &report.rejected {
            match rejected.reason {
                Rejection::UnknownSpecies(id) => {
                    self.services
                        .events
                        .emit(Event::failure(Error::UnknownSpecies(id).to_string()));
                }
                _ if self.config.debug => self.log(rejected.to_string()),
                _ => tracing::debug!("{}", rejected),
            }
        }
    }

    /// Run one tick
    pub fn work(&mut self) -> WorkerResult {
        if !self.has_enough_balls() {
            self.walker.release_lock(&self.services);
            return WorkerResult::Success;
        }

        if let Err(e) = self.ledger.save() {
            tracing::warn!("Could not save ledger: {}", e);
        }

        if self.config.snipe && self.source.mode() == FeedMode::Push {
            self.bypass_count += 1;
            if self.bypass_count < self.config.skip_rounds {
                tracing::debug!("Skipping pass {}", self.bypass_count);
                return WorkerResult::Success;
            }
            self.bypass_count = 0;
        }

        let report = self.scan();
        self.report_rejections(&report);
        let candidates = report.candidates;

        let Some(target) = self.selector.select(&candidates) else {
            self.log("No pokemons in list to snipe");
            self.walker.release_lock(&self.services);
            return WorkerResult::Success;
        };

        if self.config.snipe {
            if self.config.snipe_high_prio_only {
                self.snipe_chain(&candidates);
            } else {
                self.sniper.snipe(target, &self.services, &mut self.ledger);
            }
            return WorkerResult::Success;
        }

        if !self.has_enough_balls() {
            self.walker.release_lock(&self.services);
            return WorkerResult::Success;
        }
        self.walker.dispatch(target, &self.services, &mut self.ledger)
    }

    /// Snipe every candidate above the priority threshold, up to the chain limit
    fn snipe_chain(&mut self, ranked: &[Candidate]) -> Vec<SnipeReport> {
        let (high, _) =
            TargetSelector::split_by_priority(ranked, self.config.snipe_high_prio_threshold);
        let pause = self.sniper.timings().snipe_sleep * 5;
        let mut reports = Vec::new();

        for (idx, candidate) in high
            .into_iter()
            .take(self.config.snipe_max_in_chain)
            .enumerate()
        {
            if idx > 0 {
                if self.cancellation.load(Ordering::Relaxed) {
                    tracing::info!("Snipe chain cancelled after {} attempt(s)", idx);
                    break;
                }
                if !pause.is_zero() {
                    std::thread::sleep(pause);
                }
            }
            reports.push(self.sniper.snipe(candidate, &self.services, &mut self.ledger));
        }
        reports
    }
}

/// Builder for creating a [`SnipeWorker`]
pub struct SnipeWorkerBuilder {
    config: SnipeConfig,
    species: Option<SpeciesTable>,
    ledger: Option<DedupLedger>,
    source: Option<Box<dyn SightingSource>>,
    services: Option<Services>,
    altitude: Option<f64>,
    timings: Option<SnipeTimings>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl SnipeWorkerBuilder {
    pub fn new(config: SnipeConfig) -> Self {
        Self {
            config,
            species: None,
            ledger: None,
            source: None,
            services: None,
            altitude: None,
            timings: None,
            cancellation: None,
        }
    }

    /// Species table; the built-in one when unset
    pub fn species(mut self, species: SpeciesTable) -> Self {
        self.species = Some(species);
        self
    }

    /// Ledger to use instead of the configured per-user file
    pub fn ledger(mut self, ledger: DedupLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn source(mut self, source: Box<dyn SightingSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Fix the relocation altitude instead of drawing it
    pub fn altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Override the configured pauses
    pub fn timings(mut self, timings: SnipeTimings) -> Self {
        self.timings = Some(timings);
        self
    }

    pub fn cancellation(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Build the worker
    pub fn build(self) -> Result<SnipeWorker> {
        self.config.validate()?;

        let services = self
            .services
            .ok_or_else(|| Error::Config("Host services are required".to_string()))?;

        let source = match self.source {
            Some(source) => source,
            None => match &self.config.feed {
                FeedSourceConfig::Pull { .. } => source_from_config(&self.config)?.0,
                FeedSourceConfig::Push { .. } => {
                    return Err(Error::Config(
                        "A push feed needs its queue passed to the builder".to_string(),
                    ))
                }
            },
        };

        let ledger = match self.ledger {
            Some(ledger) => ledger,
            None => match self.config.ledger_path() {
                Some(path) => DedupLedger::open(path)?,
                None => {
                    tracing::warn!("No data directory available, ledger will not be persisted");
                    DedupLedger::new()
                }
            },
        };

        let cancellation = self
            .cancellation
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        let mut sniper = Sniper::new(&self.config)
            .with_trusted_feed(source.mode() == FeedMode::Push)
            .with_cancellation(Arc::clone(&cancellation));
        if let Some(altitude) = self.altitude {
            sniper = sniper.with_altitude(altitude);
        }
        if let Some(timings) = self.timings {
            sniper = sniper.with_timings(timings);
        }

        tracing::info!(
            "Sniping worker ready: {} feed, {} ledger entries, altitude {:.1}",
            source.mode(),
            ledger.len(),
            sniper.altitude()
        );

        Ok(SnipeWorker {
            filter: CandidateFilter::new(FilterCriteria::from_config(&self.config)),
            selector: TargetSelector::from_config(&self.config),
            walker: WalkDispatcher::new(&self.config),
            species: self.species.unwrap_or_default(),
            config: self.config,
            ledger,
            source,
            services,
            sniper,
            bypass_count: 0,
            cancellation,
        })
    }
}
