//! Route definitions for the SafarX API.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod journeys;
pub mod memories;
pub mod places;
