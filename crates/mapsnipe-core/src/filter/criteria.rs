//! Filter criteria and rejection reasons

use std::collections::{HashMap, HashSet};

use crate::config::SnipeConfig;

/// Rules a sighting must pass to become a candidate
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Allow-list with priority weights
    pub catch: HashMap<String, i32>,
    pub vips: HashSet<String>,
    /// Meters
    pub max_sniping_distance: f64,
    /// Meters, only enforced while sniping is disabled
    pub max_walking_distance: f64,
    pub snipe: bool,
    /// m/s used to judge whether a sighting can be reached on foot in time
    pub mean_walk_speed: f64,
}

impl FilterCriteria {
    /// Create new empty filter criteria
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria taken from the worker configuration
    pub fn from_config(config: &SnipeConfig) -> Self {
        Self {
            catch: config.catch.clone(),
            vips: config.vips.clone(),
            max_sniping_distance: config.max_sniping_distance,
            max_walking_distance: config.max_walking_distance,
            snipe: config.snipe,
            mean_walk_speed: config.mean_walk_speed(),
        }
    }

    /// Add a species to the allow-list
    pub fn with_catch(mut self, name: impl Into<String>, priority: i32) -> Self {
        self.catch.insert(name.into(), priority);
        self
    }

    /// Mark a species as VIP
    pub fn with_vip(mut self, name: impl Into<String>) -> Self {
        self.vips.insert(name.into());
        self
    }

    /// Set both distance limits
    pub fn with_distances(mut self, max_sniping: f64, max_walking: f64) -> Self {
        self.max_sniping_distance = max_sniping;
        self.max_walking_distance = max_walking;
        self
    }

    pub fn with_snipe(mut self, snipe: bool) -> Self {
        self.snipe = snipe;
        self
    }

    pub fn with_walk_speed(mut self, mean_walk_speed: f64) -> Self {
        self.mean_walk_speed = mean_walk_speed;
        self
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.catch.contains_key(name)
    }

    pub fn is_vip(&self, name: &str) -> bool {
        self.vips.contains(name)
    }

    /// Allow-list weight, 0 for species outside the list
    pub fn priority_of(&self, name: &str) -> i32 {
        self.catch.get(name).copied().unwrap_or(0)
    }
}

/// Why a sighting did not become a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Species id missing from the species table
    UnknownSpecies(u32),
    /// Not allow-listed (and, for pull feeds, not a VIP either)
    NotInCatchList,
    /// Location already in the dedup ledger
    AlreadyInspected,
    BeyondSnipingRange { max: f64 },
    BeyondWalkingRange { max: f64 },
    /// Gone before it could be reached at mean walking speed
    UnreachableInTime,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSpecies(id) => write!(f, "species #{} is unknown", id),
            Self::NotInCatchList => write!(f, "it is not in catch list and not a VIP"),
            Self::AlreadyInspected => write!(f, "it was already caught or does not exist"),
            Self::BeyondSnipingRange { max } => {
                write!(f, "the sniping distance exceeds the max ({})", max)
            }
            Self::BeyondWalkingRange { max } => {
                write!(f, "the walking distance exceeds the max ({})", max)
            }
            Self::UnreachableInTime => {
                write!(f, "it is not reachable with mean walking speed before it disappears")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let criteria = FilterCriteria::new()
            .with_catch("Snorlax", 300)
            .with_vip("Lapras")
            .with_distances(5000.0, 800.0)
            .with_snipe(true);

        assert!(criteria.is_allowed("Snorlax"));
        assert!(!criteria.is_allowed("Lapras"));
        assert!(criteria.is_vip("Lapras"));
        assert_eq!(criteria.priority_of("Snorlax"), 300);
        assert_eq!(criteria.priority_of("Lapras"), 0);
        assert_eq!(criteria.max_walking_distance, 800.0);
    }

    #[test]
    fn test_from_config() {
        let mut config = SnipeConfig::default();
        config.catch.insert("Eevee".to_string(), 50);
        config.walk_min = 1.0;
        config.walk_max = 3.0;

        let criteria = FilterCriteria::from_config(&config);
        assert_eq!(criteria.priority_of("Eevee"), 50);
        assert_eq!(criteria.mean_walk_speed, 2.0);
        assert_eq!(criteria.max_sniping_distance, 10_000.0);
        assert!(!criteria.snipe);
    }
}
