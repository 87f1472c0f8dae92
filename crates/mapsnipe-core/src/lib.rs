//! # mapsnipe-core
//!
//! Core library for chasing creatures reported by a live map feed.
//!
//! This crate provides the foundational functionality for:
//! - Reading sightings from a push queue or a polled map server
//! - Filtering them against the catch list, distance limits and a dedup ledger
//! - Ranking the eligible candidates by priority and VIP status
//! - Relocating to a target, validating it and restoring the trainer afterwards
//! - Walking toward a target, directly or through a fort on the way
//!
//! ## Modules
//!
//! - [`candidate`] - Eligible targets
//! - [`config`] - Worker configuration and default paths
//! - [`error`] - Error types and Result alias
//! - [`events`] - Structured notifications and sinks
//! - [`feed`] - Push and pull sighting feeds
//! - [`filter`] - Candidate filtering
//! - [`ledger`] - Bounded, persisted dedup ledger
//! - [`selector`] - Target ranking
//! - [`services`] - Host collaborator traits
//! - [`sim`] - In-memory host
//! - [`snipe`] - Relocation protocol
//! - [`species`] - Species id to name table
//! - [`walker`] - Walking dispatcher
//! - [`worker`] - Per-tick entry point
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mapsnipe_core::{
//!     sim::SimulatedHost, source_from_config, Services, SnipeConfig, SnipeWorker,
//!     TracingEventSink,
//! };
//!
//! let config = SnipeConfig::load();
//! let (source, _sender) = source_from_config(&config).expect("Failed to build feed");
//! let host = Arc::new(SimulatedHost::new(40.7580, -73.9855));
//! let services = Services::from_host(host, Arc::new(TracingEventSink));
//!
//! let mut worker = SnipeWorker::builder(config)
//!     .source(source)
//!     .services(services)
//!     .build()
//!     .expect("Failed to build worker");
//! let result = worker.work();
//! println!("Tick finished: {:?}", result);
//! ```

pub mod candidate;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod filter;
pub mod ledger;
pub mod selector;
pub mod services;
pub mod sim;
pub mod snipe;
pub mod species;
pub mod utils;
pub mod walker;
pub mod worker;

// Error types
pub use error::{Error, Result};

// Configuration
pub use config::{FeedSourceConfig, SelectionMode, SnipeConfig};

// Feeds
pub use feed::{FeedMode, HttpFeed, PushFeed, Sighting, SightingSender, SightingSource};

// Filtering and selection
pub use candidate::Candidate;
pub use filter::{CandidateFilter, FilterCriteria, FilterReport, Rejection};
pub use ledger::{DedupLedger, LedgerEntry, LEDGER_CAPACITY};
pub use selector::TargetSelector;

// Host collaborators and events
pub use events::{Event, EventSink, RecordingEventSink, TracingEventSink};
pub use services::{Position, Services};

// Protocol and worker
pub use snipe::{SnipeOutcome, SnipePhase, SnipeReport, SnipeTimings, Sniper};
pub use species::SpeciesTable;
pub use utils::{format_dist, format_time, DistanceUnit};
pub use walker::WalkDispatcher;
pub use worker::{source_from_config, SnipeWorker, SnipeWorkerBuilder, WorkerResult};
