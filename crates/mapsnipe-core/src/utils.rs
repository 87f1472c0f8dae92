//! Utility functions shared across modules.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance between two lat/lon points in meters.
///
/// # Examples
///
/// ```
/// use mapsnipe_core::utils::distance;
///
/// assert_eq!(distance(40.0, -73.0, 40.0, -73.0), 0.0);
/// assert!((distance(0.0, 0.0, 0.0, 1.0) - 111_195.0).abs() < 1.0);
/// ```
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Approximate identity of a location: both coordinates rendered at 4 decimals.
///
/// Feeds do not always carry usable encounter ids, so locations are compared
/// at roughly 10m resolution instead.
pub fn location_key(latitude: f64, longitude: f64) -> (String, String) {
    (format!("{:.4}", latitude), format!("{:.4}", longitude))
}

/// Unit used when rendering distances for humans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[serde(alias = "meters")]
    M,
    #[default]
    #[serde(alias = "kilometers")]
    Km,
    #[serde(alias = "miles")]
    Mi,
    #[serde(alias = "feet")]
    Ft,
    #[serde(alias = "yards")]
    Yd,
}

impl DistanceUnit {
    /// Conversion factor from meters
    fn per_meter(self) -> f64 {
        match self {
            DistanceUnit::M => 1.0,
            DistanceUnit::Km => 0.001,
            DistanceUnit::Mi => 0.000_621_371,
            DistanceUnit::Ft => 3.280_84,
            DistanceUnit::Yd => 1.093_61,
        }
    }

    /// Suffix appended after the number
    pub fn suffix(self) -> &'static str {
        match self {
            DistanceUnit::M => "m",
            DistanceUnit::Km => "km",
            DistanceUnit::Mi => "mi",
            DistanceUnit::Ft => "ft",
            DistanceUnit::Yd => "yd",
        }
    }
}

/// Render a distance given in meters in the requested unit.
///
/// ```
/// use mapsnipe_core::utils::{format_dist, DistanceUnit};
///
/// assert_eq!(format_dist(1500.0, DistanceUnit::Km), "1.50km");
/// assert_eq!(format_dist(12.345, DistanceUnit::M), "12.35m");
/// ```
pub fn format_dist(meters: f64, unit: DistanceUnit) -> String {
    format!("{:.2}{}", meters * unit.per_meter(), unit.suffix())
}

/// Render a number of seconds as "1 hour, 2 minutes, 3 seconds".
pub fn format_time(seconds: i64) -> String {
    if seconds <= 0 {
        return "0 seconds".to_string();
    }

    let mut remaining = seconds;
    let mut parts = Vec::new();
    for (period, name) in [(3600, "hour"), (60, "minute"), (1, "second")] {
        if remaining >= period {
            let count = remaining / period;
            remaining %= period;
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", count, name, plural));
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance(48.8566, 2.3522, 51.5074, -0.1278);
        let b = distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((a - b).abs() < 1e-6);
        // Paris -> London is roughly 344 km
        assert!((a - 343_500.0).abs() < 2_000.0);
    }

    #[test]
    fn test_location_key_rounds_to_four_decimals() {
        assert_eq!(
            location_key(40.712_81, -74.006_04),
            ("40.7128".to_string(), "-74.0060".to_string())
        );
        assert_eq!(location_key(1.0, 2.0), location_key(1.000_04, 2.000_01));
        assert_ne!(location_key(1.0, 2.0), location_key(1.000_1, 2.0));
    }

    #[test]
    fn test_format_dist_units() {
        assert_eq!(format_dist(1000.0, DistanceUnit::Km), "1.00km");
        assert_eq!(format_dist(1609.344, DistanceUnit::Mi), "1.00mi");
        assert_eq!(format_dist(10.0, DistanceUnit::Ft), "32.81ft");
        assert_eq!(format_dist(0.0, DistanceUnit::M), "0.00m");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0 seconds");
        assert_eq!(format_time(-12), "0 seconds");
        assert_eq!(format_time(1), "1 second");
        assert_eq!(format_time(61), "1 minute, 1 second");
        assert_eq!(format_time(3600), "1 hour");
        assert_eq!(format_time(7322), "2 hours, 2 minutes, 2 seconds");
    }

    #[test]
    fn test_distance_unit_from_config_strings() {
        let unit: DistanceUnit = serde_json::from_str("\"km\"").unwrap();
        assert_eq!(unit, DistanceUnit::Km);
        let unit: DistanceUnit = serde_json::from_str("\"miles\"").unwrap();
        assert_eq!(unit, DistanceUnit::Mi);
    }
}
