//! Pure pricing strategy — no I/O, no clocks.
//!
//! `occupancy` turns calendar rows into a trailing occupancy rate;
//! `heuristics` holds the named rule constants and the deterministic
//! price/risk arithmetic the proposal generator is built on.

pub mod heuristics;
pub mod occupancy;
