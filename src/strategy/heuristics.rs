//! Named heuristic constants and the pure pricing arithmetic.
//!
//! Every tunable the rule engine uses lives in `HeuristicConfig` so
//! operators can adjust bands and bumps from `config.toml` instead of
//! hunting for inline literals. The functions here are deterministic
//! and side-effect-free; the analyst composes them per night.

use serde::Deserialize;

use crate::types::{ImpactTier, RiskLevel};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable constants for proposal generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Guardrail floor as a multiple of the base price.
    pub floor_multiplier: f64,
    /// Guardrail ceiling as a multiple of the base price.
    pub ceiling_multiplier: f64,

    /// Percentage bump applied per event impact tier.
    pub high_event_increase_pct: f64,
    pub medium_event_increase_pct: f64,
    pub low_event_increase_pct: f64,

    /// Occupancy above this (strict) raises the price.
    pub high_occupancy_threshold: u8,
    /// Occupancy below this (strict) lowers the price.
    pub low_occupancy_threshold: u8,
    pub high_occupancy_increase_pct: f64,
    pub low_occupancy_decrease_pct: f64,

    /// Proposed prices are rounded to the nearest multiple of this.
    pub rounding_unit: f64,
    /// Absolute change percentages below this are dropped as no-ops.
    pub min_change_pct: u32,

    /// Risk band edges (inclusive upper bounds).
    pub low_risk_max_change_pct: u32,
    pub medium_risk_max_change_pct: u32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            floor_multiplier: 0.5,
            ceiling_multiplier: 3.0,
            high_event_increase_pct: 30.0,
            medium_event_increase_pct: 15.0,
            low_event_increase_pct: 5.0,
            high_occupancy_threshold: 80,
            low_occupancy_threshold: 60,
            high_occupancy_increase_pct: 10.0,
            low_occupancy_decrease_pct: 5.0,
            rounding_unit: 10.0,
            min_change_pct: 1,
            low_risk_max_change_pct: 10,
            medium_risk_max_change_pct: 30,
        }
    }
}

/// Which trailing-occupancy band a listing falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyBand {
    High,
    Moderate,
    Low,
}

impl HeuristicConfig {
    /// Guardrail floor for a base price, rounded to whole currency units.
    pub fn derive_floor(&self, base_price: f64) -> f64 {
        (base_price * self.floor_multiplier).round()
    }

    /// Guardrail ceiling for a base price, rounded to whole currency units.
    pub fn derive_ceiling(&self, base_price: f64) -> f64 {
        (base_price * self.ceiling_multiplier).round()
    }

    /// Percentage bump for an event impact tier.
    pub fn event_increase_pct(&self, tier: ImpactTier) -> f64 {
        match tier {
            ImpactTier::High => self.high_event_increase_pct,
            ImpactTier::Medium => self.medium_event_increase_pct,
            ImpactTier::Low => self.low_event_increase_pct,
        }
    }

    /// Band a trailing occupancy percentage. Both thresholds are strict.
    pub fn occupancy_band(&self, occupancy: u8) -> OccupancyBand {
        if occupancy > self.high_occupancy_threshold {
            OccupancyBand::High
        } else if occupancy < self.low_occupancy_threshold {
            OccupancyBand::Low
        } else {
            OccupancyBand::Moderate
        }
    }

    /// Signed percentage adjustment for an occupancy band.
    pub fn occupancy_adjustment_pct(&self, band: OccupancyBand) -> f64 {
        match band {
            OccupancyBand::High => self.high_occupancy_increase_pct,
            OccupancyBand::Low => -self.low_occupancy_decrease_pct,
            OccupancyBand::Moderate => 0.0,
        }
    }

    /// Risk classification from the rounded change percentage and
    /// whether the proposal is backed by event signals.
    ///
    /// Band edges are inclusive: a 30% event-backed change is medium,
    /// not high.
    pub fn classify_risk(&self, change_pct: i32, event_backed: bool) -> RiskLevel {
        let abs = change_pct.unsigned_abs();

        if event_backed && abs <= self.low_risk_max_change_pct {
            RiskLevel::Low
        } else if event_backed && abs <= self.medium_risk_max_change_pct {
            RiskLevel::Medium
        } else if abs > self.medium_risk_max_change_pct {
            RiskLevel::High
        } else if !event_backed && abs > self.low_risk_max_change_pct {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Pure arithmetic
// ---------------------------------------------------------------------------

/// Outcome of clamping a price into the guardrail bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampOutcome {
    Unclamped,
    Floor,
    Ceiling,
}

/// Clamp a price into `[floor, ceiling]`, reporting which bound hit.
pub fn clamp_price(price: f64, floor: f64, ceiling: f64) -> (f64, ClampOutcome) {
    if price < floor {
        (floor, ClampOutcome::Floor)
    } else if price > ceiling {
        (ceiling, ClampOutcome::Ceiling)
    } else {
        (price, ClampOutcome::Unclamped)
    }
}

/// Round a price to the nearest multiple of `unit`.
pub fn round_to_unit(price: f64, unit: f64) -> f64 {
    if unit <= 0.0 {
        return price;
    }
    (price / unit).round() * unit
}

/// Rounded percentage change from `current` to `proposed`.
///
/// Always computed locally — an externally supplied change percentage
/// is never trusted. `current` must be positive; the generator skips
/// degenerate nights before calling this.
pub fn change_pct(current: f64, proposed: f64) -> i32 {
    (((proposed - current) / current) * 100.0).round() as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
