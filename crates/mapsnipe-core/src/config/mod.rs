//! Worker configuration and default file locations

mod paths;

pub use paths::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::DistanceUnit;

/// How eligible candidates are ordered before one is picked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest catch-list priority first
    #[default]
    Priority,
    /// Keep the order the feed delivered
    Feed,
}

/// Where sightings come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedSourceConfig {
    /// Real-time channel pushing sightings into a bounded queue
    Push {
        #[serde(default = "default_push_capacity")]
        capacity: usize,
    },
    /// Map server polled with one HTTP GET per tick
    Pull { address: String },
}

impl Default for FeedSourceConfig {
    fn default() -> Self {
        Self::Pull {
            address: "http://localhost:5000/raw_data".to_string(),
        }
    }
}

fn default_push_capacity() -> usize {
    500
}

/// Configuration for the sniping worker.
///
/// Every field has a default so partial JSON files load cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnipeConfig {
    /// Trainer account name, used to key the ledger file
    pub username: String,
    /// Allow-list of species names with their priority weight
    pub catch: HashMap<String, i32>,
    /// Species always worth chasing
    pub vips: HashSet<String>,
    pub mode: SelectionMode,
    /// Put VIP candidates ahead of everything else
    pub prioritize_vips: bool,
    /// Relocate instead of walking
    pub snipe: bool,
    /// Meters; sightings further away are never considered
    pub max_sniping_distance: f64,
    /// Meters; only enforced while sniping is disabled
    pub max_walking_distance: f64,
    pub snipe_high_prio_only: bool,
    pub snipe_high_prio_threshold: i32,
    pub snipe_max_in_chain: usize,
    /// Pause around the capture/restore steps, in seconds
    pub snipe_sleep_sec: f64,
    /// Propagation lag after a relocation, in seconds
    pub relocation_settle_sec: f64,
    /// Push mode only: snipe once every this many ticks
    pub skip_rounds: u32,
    /// Minimum number of balls (poke + great + ultra) needed to do anything
    pub min_ball: u32,
    /// Path-walker strategy name handed to the host
    pub walker: String,
    /// Allowed detour through a waypoint, in percent of the direct distance
    pub max_extra_dist_fort: f64,
    /// Meters within which a walked-to target counts as reached
    pub reachable_distance: f64,
    /// Meters within which a waypoint counts as reached
    pub fort_reachable_distance: f64,
    /// Walking speed bounds in m/s
    pub walk_min: f64,
    pub walk_max: f64,
    /// Altitude bounds for relocations
    pub alt_min: f64,
    pub alt_max: f64,
    pub distance_unit: DistanceUnit,
    /// Emit per-candidate log events
    pub debug: bool,
    /// Directory holding the ledger file; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub feed: FeedSourceConfig,
}

impl Default for SnipeConfig {
    fn default() -> Self {
        Self {
            username: "trainer".to_string(),
            catch: HashMap::new(),
            vips: HashSet::new(),
            mode: SelectionMode::Priority,
            prioritize_vips: false,
            snipe: false,
            max_sniping_distance: 10_000.0,
            max_walking_distance: 1_000.0,
            snipe_high_prio_only: false,
            snipe_high_prio_threshold: 400,
            snipe_max_in_chain: 2,
            snipe_sleep_sec: 2.0,
            relocation_settle_sec: 2.0,
            skip_rounds: 30,
            min_ball: 1,
            walker: "StepWalker".to_string(),
            max_extra_dist_fort: 20.0,
            reachable_distance: 40.0,
            fort_reachable_distance: 38.0,
            walk_min: 2.16,
            walk_max: 4.16,
            alt_min: 500.0,
            alt_max: 1000.0,
            distance_unit: DistanceUnit::Km,
            debug: false,
            data_dir: None,
            feed: FeedSourceConfig::default(),
        }
    }
}

impl SnipeConfig {
    /// Load config from the default location, falling back to defaults if not found
    pub fn load() -> Self {
        default_config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Load and validate config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the worker cannot act on
    pub fn validate(&self) -> Result<()> {
        if self.walk_min > self.walk_max {
            return Err(Error::Config(format!(
                "walk_min ({}) is greater than walk_max ({})",
                self.walk_min, self.walk_max
            )));
        }
        if self.alt_min > self.alt_max {
            return Err(Error::Config(format!(
                "alt_min ({}) is greater than alt_max ({})",
                self.alt_min, self.alt_max
            )));
        }
        if self.snipe_sleep_sec < 0.0 || self.relocation_settle_sec < 0.0 {
            return Err(Error::Config("sleep durations cannot be negative".to_string()));
        }
        if self.snipe_max_in_chain == 0 {
            return Err(Error::Config("snipe_max_in_chain must be at least 1".to_string()));
        }
        if let FeedSourceConfig::Pull { address } = &self.feed {
            if address.trim().is_empty() {
                return Err(Error::Config("pull feed address is empty".to_string()));
            }
        }
        if let FeedSourceConfig::Push { capacity: 0 } = self.feed {
            return Err(Error::Config("push feed capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Mean of the configured walking speeds in m/s
    pub fn mean_walk_speed(&self) -> f64 {
        (self.walk_max + self.walk_min) / 2.0
    }

    /// Priority weight of a species, 0 when it is not in the catch list
    pub fn priority_of(&self, name: &str) -> i32 {
        self.catch.get(name).copied().unwrap_or(0)
    }

    pub fn is_vip(&self, name: &str) -> bool {
        self.vips.contains(name)
    }

    pub fn snipe_sleep(&self) -> Duration {
        Duration::from_secs_f64(self.snipe_sleep_sec)
    }

    pub fn relocation_settle(&self) -> Duration {
        Duration::from_secs_f64(self.relocation_settle_sec)
    }

    /// Whether sightings arrive through the push queue
    pub fn is_push_feed(&self) -> bool {
        matches!(self.feed, FeedSourceConfig::Push { .. })
    }

    /// Path of this user's ledger file
    pub fn ledger_path(&self) -> Option<PathBuf> {
        let dir = self.data_dir.clone().or_else(default_data_dir)?;
        Some(dir.join(ledger_file_name(&self.username)))
    }
}
