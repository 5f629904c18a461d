//! Event signal provider.
//!
//! Read-only view over the range-indexed signal store, plus the
//! tier-based pricing recommendation the generator applies on event
//! days. The research step that populates the store (market and
//! competitor lookups) is an external black box — this module only
//! consumes what it published.

use anyhow::Result;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::stores::EventSignalStore;
use crate::strategy::heuristics::HeuristicConfig;
use crate::types::{DateRange, EventSignal, ImpactTier};

// ---------------------------------------------------------------------------
// Analysis types
// ---------------------------------------------------------------------------

/// Summary of the signals intersecting a date range.
#[derive(Debug, Clone)]
pub struct EventAnalysis {
    pub events: Vec<EventSignal>,
    pub range: DateRange,
    pub summary: String,
    pub total_events: usize,
    pub high_impact_events: usize,
}

/// Event-driven pricing suggestion for a set of overlapping signals.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingRecommendation {
    pub suggested_increase_pct: f64,
    pub reasoning: String,
}

impl fmt::Display for PricingRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{:.0}%: {}", self.suggested_increase_pct, self.reasoning)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Read-side of the event signal table.
pub struct EventSignalProvider {
    store: Arc<dyn EventSignalStore>,
}

impl EventSignalProvider {
    pub fn new(store: Arc<dyn EventSignalStore>) -> Self {
        Self { store }
    }

    /// Signals intersecting the range, from the latest published
    /// snapshot.
    pub async fn events_for(&self, range: DateRange) -> Result<Vec<EventSignal>> {
        let events = self.store.query(range).await?;
        debug!(range = %range, count = events.len(), "Event signals fetched");
        Ok(events)
    }

    /// Whether any signal covers the given night.
    pub async fn has_event_impact(&self, date: NaiveDate) -> Result<bool> {
        let events = self.store.query(DateRange::single(date)).await?;
        Ok(!events.is_empty())
    }

    /// Fetch and summarise the signals for a range.
    pub async fn analyze(&self, range: DateRange) -> Result<EventAnalysis> {
        let events = self.events_for(range).await?;

        let high_impact_events = events
            .iter()
            .filter(|e| e.expected_impact == ImpactTier::High)
            .count();

        let summary = if events.is_empty() {
            "No major events detected for this period.".to_string()
        } else if high_impact_events > 0 {
            format!(
                "{high_impact_events} high-impact event(s) detected. Significant demand increase expected."
            )
        } else {
            format!("{} event(s) detected with moderate impact.", events.len())
        };

        Ok(EventAnalysis {
            total_events: events.len(),
            high_impact_events,
            events,
            range,
            summary,
        })
    }
}

/// Pricing suggestion from the highest severity tier present among the
/// matched signals. Confidence values are informational only and do
/// not affect the magnitude.
pub fn recommendation(events: &[EventSignal], cfg: &HeuristicConfig) -> PricingRecommendation {
    if events.is_empty() {
        return PricingRecommendation {
            suggested_increase_pct: 0.0,
            reasoning: "No events detected, maintain current pricing".to_string(),
        };
    }

    let names_for = |tier: ImpactTier| -> Vec<&str> {
        events
            .iter()
            .filter(|e| e.expected_impact == tier)
            .map(|e| e.name.as_str())
            .collect()
    };

    let high = names_for(ImpactTier::High);
    if !high.is_empty() {
        return PricingRecommendation {
            suggested_increase_pct: cfg.event_increase_pct(ImpactTier::High),
            reasoning: format!(
                "High-impact events detected: {}. Significant demand increase expected.",
                high.join(", ")
            ),
        };
    }

    let medium = names_for(ImpactTier::Medium);
    if !medium.is_empty() {
        return PricingRecommendation {
            suggested_increase_pct: cfg.event_increase_pct(ImpactTier::Medium),
            reasoning: format!(
                "Medium-impact events detected: {}. Moderate demand increase expected.",
                medium.join(", ")
            ),
        };
    }

    PricingRecommendation {
        suggested_increase_pct: cfg.event_increase_pct(ImpactTier::Low),
        reasoning: "Low-impact events detected. Minor demand increase expected.".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
