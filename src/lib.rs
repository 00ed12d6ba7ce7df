//! # Load Shifting Carbon
//!
//! Estimates the fuel mix and carbon intensity of electricity *consumed* inside a
//! balancing authority (BA), correcting for imports from neighbouring BAs, and
//! uses that intensity to compare the HVAC emissions of simple home thermal models.
//!
//! Pipeline:
//!
//! 1. [`source`] fetches demand, net generation, interchange and fuel-type rows.
//! 2. [`grid_mix::consumption`] reconciles local consumption by source region.
//! 3. [`grid_mix::attribution`] attributes consumption to fuel types and emissions.
//! 4. [`grid_mix::intensity`] collapses usage into hourly intensity and summaries.
//! 5. [`simulation`] steps home thermal models and compares scenarios.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod grid_mix;
pub mod simulation;
pub mod source;
pub mod telemetry;

pub use error::GridMixError;
