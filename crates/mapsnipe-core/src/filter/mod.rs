//! Candidate filtering
//!
//! Turns a feed snapshot into the list of sightings worth acting on, applying
//! the allow-list, the dedup ledger, distance limits and the walking-time
//! check in that order.

mod criteria;
mod engine;

pub use criteria::{FilterCriteria, Rejection};
pub use engine::{CandidateFilter, FilterContext, FilterReport, RejectedSighting};
