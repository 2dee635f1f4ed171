//! Destination-system (SIS) adapters.
//!
//! Two surfaces: the REST intake API used to create applications and check
//! their existence, and the relational store reached through stored
//! procedures for status lookup, demographic/academic updates, scheduled
//! actions, and profile queries. Each store write commits independently; there
//! is no cross-record transaction.

mod api;
mod store;
mod types;

pub use api::{CampusApi, PowerCampusApiClient};
pub use store::{CampusStore, SqlCampusStore};
pub use types::*;
