//! Dedup ledger of already-attempted target locations

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::candidate::Candidate;
use crate::error::Result;
use crate::utils::location_key;

/// Maximum number of remembered targets
pub const LEDGER_CAPACITY: usize = 200;

/// A target that was caught, walked to, or found missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub pokemon_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub encounter_id: Option<u64>,
    #[serde(default)]
    pub spawn_point_id: Option<String>,
    #[serde(default)]
    pub expires_at: i64,
}

impl From<&Candidate> for LedgerEntry {
    fn from(candidate: &Candidate) -> Self {
        Self {
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            pokemon_id: candidate.species_id,
            name: candidate.name.clone(),
            encounter_id: candidate.encounter_id,
            spawn_point_id: candidate.spawn_point_id.clone(),
            expires_at: candidate.expires_at,
        }
    }
}

/// Bounded FIFO of attempted locations, optionally backed by a JSON file.
///
/// Entries are matched by position rounded to 4 decimals, since feeds do not
/// reliably carry encounter ids.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    entries: VecDeque<LedgerEntry>,
    capacity: usize,
    path: Option<PathBuf>,
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupLedger {
    /// Create an empty in-memory ledger
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LEDGER_CAPACITY),
            capacity: LEDGER_CAPACITY,
            path: None,
        }
    }

    /// Open the ledger stored at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut ledger = Self::new();
        if path.exists() {
            for entry in Self::read_entries(&path)? {
                ledger.push(entry);
            }
        }
        ledger.path = Some(path);
        Ok(ledger)
    }

    fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Keep the loaded entries in memory only, so later saves never touch the file
    pub fn detached(mut self) -> Self {
        self.path = None;
        self
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rewrite the backing file with the current entries (no-op for in-memory ledgers)
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Write the entries to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check whether a location was already attempted
    pub fn is_inspected(&self, latitude: f64, longitude: f64) -> bool {
        let key = location_key(latitude, longitude);
        self.entries
            .iter()
            .any(|e| location_key(e.latitude, e.longitude) == key)
    }

    /// Remember an attempted target.
    ///
    /// Returns `false` if its location was already present. Evicts the oldest
    /// entry when the ledger is full.
    pub fn inspect(&mut self, entry: LedgerEntry) -> bool {
        if self.is_inspected(entry.latitude, entry.longitude) {
            return false;
        }
        self.push(entry);
        true
    }

    /// Remember a candidate (see [`DedupLedger::inspect`])
    pub fn record(&mut self, candidate: &Candidate) -> bool {
        self.inspect(LedgerEntry::from(candidate))
    }

    fn push(&mut self, entry: LedgerEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries from oldest to newest
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry (the file is rewritten on the next save)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
