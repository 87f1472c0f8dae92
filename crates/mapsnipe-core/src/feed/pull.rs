//! Pull feed: map server polled over HTTP

use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

use super::{non_empty, FeedMode, Sighting, SightingSource};
use crate::error::{Error, Result};

/// Request timeout for one poll
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One element of the map server's `pokemons` array
#[derive(Debug, Clone, Deserialize)]
pub struct MapPokemon {
    pub pokemon_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds
    pub disappear_time: f64,
    /// Base64 of the decimal encounter id
    #[serde(default)]
    pub encounter_id: Option<String>,
    #[serde(default)]
    pub spawnpoint_id: Option<String>,
    #[serde(default)]
    pub iv: Option<f64>,
}

impl MapPokemon {
    pub fn into_sighting(self) -> Result<Sighting> {
        let encounter_id = match non_empty(self.encounter_id) {
            Some(encoded) => Some(decode_encounter_id(&encoded)?),
            None => None,
        };

        Ok(Sighting {
            species_id: self.pokemon_id,
            latitude: self.latitude,
            longitude: self.longitude,
            encounter_id,
            spawn_point_id: non_empty(self.spawnpoint_id),
            expires_at: (self.disappear_time / 1000.0) as i64,
            iv: self.iv,
        })
    }
}

fn decode_encounter_id(encoded: &str) -> Result<u64> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::SightingParse(format!("encounter_id is not base64: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::SightingParse("encounter_id is not text".to_string()))?;
    text.trim()
        .parse()
        .map_err(|_| Error::SightingParse(format!("encounter_id '{}' is not a number", text)))
}

/// Parse a map server response body.
///
/// Fails as a whole when the body is not JSON or has no `pokemons` array;
/// individual elements that do not parse come back as inner errors.
pub fn parse_response(body: &str) -> Result<Vec<Result<Sighting>>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::FeedFormat(format!("JSON format is not valid: {}", e)))?;

    let pokemons = value
        .get("pokemons")
        .and_then(|p| p.as_array())
        .ok_or_else(|| Error::FeedFormat("response has no 'pokemons' array".to_string()))?;

    Ok(pokemons
        .iter()
        .map(|item| {
            MapPokemon::deserialize(item)
                .map_err(|e| Error::SightingParse(e.to_string()))
                .and_then(MapPokemon::into_sighting)
        })
        .collect())
}

/// Map server client
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::blocking::Client,
    address: String,
}

impl HttpFeed {
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            address: address.into(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn unavailable(&self, message: impl ToString) -> Error {
        Error::FeedUnavailable {
            address: self.address.clone(),
            message: message.to_string(),
        }
    }

    /// Fetch the raw response body
    pub fn fetch_body(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.address)
            .send()
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {}", status)));
        }

        response.text().map_err(|e| self.unavailable(e))
    }
}

impl SightingSource for HttpFeed {
    fn mode(&self) -> FeedMode {
        FeedMode::Pull
    }

    fn poll(&mut self) -> Result<Vec<Result<Sighting>>> {
        let body = self.fetch_body()?;
        parse_response(&body)
    }

    fn describe(&self) -> String {
        format!("map server at {}", self.address)
    }
}
