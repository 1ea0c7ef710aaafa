//! labreview-core: review engine, data model, statistics, and traits.
//!
//! This crate defines the course catalog model, the deterministic score
//! simulator, the batch review engine and the statistics the dashboard shows.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod model;
pub mod prompts;
pub mod report;
pub mod results;
pub mod simulator;
pub mod state;
pub mod statistics;
pub mod traits;
