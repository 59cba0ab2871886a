//! Business logic services.

pub mod aggregator;
pub mod auth;
pub mod journey;
pub mod memory;
pub mod place;
pub mod stats;
