//! Shared types for the HELM agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that store, strategy, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one night.
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// Whether a date falls inside the range (both endpoints inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    /// Number of nights covered (0 if end < start).
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// Availability status of a single calendar night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarStatus {
    Available,
    Booked,
    Blocked,
}

impl fmt::Display for CalendarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarStatus::Available => write!(f, "available"),
            CalendarStatus::Booked => write!(f, "booked"),
            CalendarStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl std::str::FromStr for CalendarStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(CalendarStatus::Available),
            "booked" | "reserved" => Ok(CalendarStatus::Booked),
            "blocked" => Ok(CalendarStatus::Blocked),
            _ => Err(anyhow::anyhow!("Unknown calendar status: {s}")),
        }
    }
}

/// One night of one listing's calendar, as held by the inventory store.
///
/// Read by the occupancy calculator and the proposal generator; written
/// by the executor once a price change is confirmed on the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarNight {
    pub listing_id: i64,
    pub date: NaiveDate,
    pub status: CalendarStatus,
    /// Current nightly price in the listing's currency.
    pub current_price: f64,
    pub min_stay: Option<u32>,
    pub max_stay: Option<u32>,
}

impl CalendarNight {
    pub fn is_booked(&self) -> bool {
        self.status == CalendarStatus::Booked
    }
}

impl fmt::Display for CalendarNight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @ {:.0}",
            self.listing_id, self.date, self.status, self.current_price,
        )
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// A managed listing as held by the listing registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    /// Base nightly price used when a night has no calendar row.
    pub base_price: f64,
    pub currency: String,
    /// Identifier on the external channel manager. `None` for
    /// local-only listings (dev/test) — the executor short-circuits
    /// these without any network call.
    pub external_id: Option<i64>,
    /// Explicit guardrail bounds. When absent, the generator derives
    /// them from the base price.
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (base {:.0} {}{})",
            self.id,
            self.name,
            self.base_price,
            self.currency,
            match self.external_id {
                Some(ext) => format!(", channel #{ext}"),
                None => ", local-only".to_string(),
            },
        )
    }
}

impl Listing {
    /// Helper to build a test listing with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Listing {
            id: 1,
            name: "Marina View 2BR".to_string(),
            base_price: 750.0,
            currency: "AED".to_string(),
            external_id: Some(40221),
            floor: None,
            ceiling: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event signals
// ---------------------------------------------------------------------------

/// Expected demand impact of an event signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for ImpactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactTier::High => write!(f, "high"),
            ImpactTier::Medium => write!(f, "medium"),
            ImpactTier::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for ImpactTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(ImpactTier::High),
            "medium" | "med" => Ok(ImpactTier::Medium),
            "low" => Ok(ImpactTier::Low),
            _ => Err(anyhow::anyhow!("Unknown impact tier: {s}")),
        }
    }
}

/// An externally sourced demand indicator (festival, conference,
/// holiday) tied to a date range. Immutable within a pricing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSignal {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub expected_impact: ImpactTier,
    /// Research confidence 0–100. Informational only — it does not
    /// weight the tier selection.
    pub confidence: u8,
    pub description: Option<String>,
}

impl EventSignal {
    /// Whether the event covers a date (inclusive on both endpoints).
    pub fn overlaps(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date >= date
    }

    /// Whether the event intersects a date range.
    pub fn overlaps_range(&self, range: DateRange) -> bool {
        self.end_date >= range.start && self.start_date <= range.end
    }
}

impl fmt::Display for EventSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}..{}, {} impact, conf {}%)",
            self.name, self.start_date, self.end_date, self.expected_impact, self.confidence,
        )
    }
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

/// Risk classification of a price proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Review lifecycle of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    /// Rejection is terminal; approval admits execution but stays
    /// `approved` across execution failures so retries remain possible.
    pub fn is_terminal(&self) -> bool {
        *self == ProposalStatus::Rejected
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Approved => write!(f, "approved"),
            ProposalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A reviewer's bulk decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(&self) -> ProposalStatus {
        match self {
            ReviewDecision::Approve => ProposalStatus::Approved,
            ReviewDecision::Reject => ProposalStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewDecision::Approve => write!(f, "approve"),
            ReviewDecision::Reject => write!(f, "reject"),
        }
    }
}

/// A candidate price change for one listing on one night.
///
/// Natural key is `(listing_id, date)` — regenerating a proposal for
/// the same key replaces the prior row under the same id with a bumped
/// `version`. Created by the analyst, transitioned by the reviewer,
/// read (never re-derived) by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceProposal {
    /// Store-assigned id; 0 until saved.
    pub id: i64,
    /// Optimistic-concurrency stamp, bumped on every upsert for the
    /// same `(listing_id, date)` key; 0 until saved.
    pub version: u32,
    pub listing_id: i64,
    pub date: NaiveDate,
    pub current_price: f64,
    pub proposed_price: f64,
    pub price_floor: f64,
    pub price_ceiling: f64,
    /// Rounded percentage change, always recomputed locally from
    /// `current_price` and `proposed_price`.
    pub change_pct: i32,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub status: ProposalStatus,
}

impl PriceProposal {
    /// Whether the proposed price respects the guardrail bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.proposed_price >= self.price_floor && self.proposed_price <= self.price_ceiling
    }

    /// Absolute price movement in currency units.
    pub fn price_delta(&self) -> f64 {
        self.proposed_price - self.current_price
    }

    /// Helper to build a test proposal with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        PriceProposal {
            id: 0,
            version: 0,
            listing_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            current_price: 750.0,
            proposed_price: 830.0,
            price_floor: 375.0,
            price_ceiling: 2250.0,
            change_pct: 11,
            risk_level: RiskLevel::Medium,
            reasoning: "High occupancy (85%). Demand is strong, increase pricing.".to_string(),
            status: ProposalStatus::Pending,
        }
    }
}

impl fmt::Display for PriceProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.change_pct >= 0 { "+" } else { "" };
        write!(
            f,
            "[{}] listing {} {}: {:.0} -> {:.0} ({sign}{}%, {} risk, {})",
            self.id,
            self.listing_id,
            self.date,
            self.current_price,
            self.proposed_price,
            self.change_pct,
            self.risk_level,
            self.status,
        )
    }
}

// ---------------------------------------------------------------------------
// Execution results
// ---------------------------------------------------------------------------

/// Audit record of one execution attempt. Append-only — retries of the
/// same proposal produce new records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub proposal_id: i64,
    pub success: bool,
    pub updated_days: u32,
    /// Whether the read-back price matched within tolerance. False on
    /// failure, but also false on an eventually-consistent mismatch —
    /// "retry later", not "operation failed".
    pub verified: bool,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// A failed attempt with no days updated.
    pub fn failure(proposal_id: i64, error: impl Into<String>) -> Self {
        Self {
            proposal_id,
            success: false,
            updated_days: 0,
            verified: false,
            error: Some(error.into()),
            executed_at: Utc::now(),
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match (self.success, self.verified) {
            (true, true) => "verified",
            (true, false) => "unverified",
            (false, _) => "failed",
        };
        write!(f, "proposal {} {} ({} day(s))", self.proposal_id, outcome, self.updated_days)?;
        if let Some(err) = &self.error {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for HELM.
#[derive(Debug, thiserror::Error)]
pub enum HelmError {
    #[error("Listing not found: {0}")]
    ListingNotFound(i64),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(i64),

    #[error("Channel manager error: {message}")]
    Channel { message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // -- DateRange tests --

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, 5));
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], d(2026, 3, 1));
        assert_eq!(days[4], d(2026, 3, 5));
        assert_eq!(range.num_days(), 5);
    }

    #[test]
    fn test_date_range_single() {
        let range = DateRange::single(d(2026, 3, 20));
        assert_eq!(range.days().count(), 1);
        assert!(range.contains(d(2026, 3, 20)));
        assert!(!range.contains(d(2026, 3, 21)));
    }

    #[test]
    fn test_date_range_contains_endpoints() {
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, 31));
        assert!(range.contains(d(2026, 3, 1)));
        assert!(range.contains(d(2026, 3, 31)));
        assert!(!range.contains(d(2026, 2, 28)));
        assert!(!range.contains(d(2026, 4, 1)));
    }

    // -- CalendarStatus tests --

    #[test]
    fn test_calendar_status_from_str() {
        assert_eq!("available".parse::<CalendarStatus>().unwrap(), CalendarStatus::Available);
        assert_eq!("BOOKED".parse::<CalendarStatus>().unwrap(), CalendarStatus::Booked);
        assert_eq!("reserved".parse::<CalendarStatus>().unwrap(), CalendarStatus::Booked);
        assert_eq!("blocked".parse::<CalendarStatus>().unwrap(), CalendarStatus::Blocked);
        assert!("nonsense".parse::<CalendarStatus>().is_err());
    }

    #[test]
    fn test_calendar_status_serialization() {
        let json = serde_json::to_string(&CalendarStatus::Booked).unwrap();
        assert_eq!(json, "\"booked\"");
        let parsed: CalendarStatus = serde_json::from_str("\"available\"").unwrap();
        assert_eq!(parsed, CalendarStatus::Available);
    }

    // -- EventSignal tests --

    fn sample_event() -> EventSignal {
        EventSignal {
            name: "Dubai Shopping Festival".to_string(),
            start_date: d(2026, 1, 1),
            end_date: d(2026, 2, 1),
            location: "Dubai".to_string(),
            expected_impact: ImpactTier::High,
            confidence: 95,
            description: Some("Annual shopping festival".to_string()),
        }
    }

    #[test]
    fn test_event_overlaps_inclusive_endpoints() {
        let event = sample_event();
        assert!(event.overlaps(d(2026, 1, 1)));
        assert!(event.overlaps(d(2026, 2, 1)));
        assert!(event.overlaps(d(2026, 1, 15)));
        assert!(!event.overlaps(d(2025, 12, 31)));
        assert!(!event.overlaps(d(2026, 2, 2)));
    }

    #[test]
    fn test_event_overlaps_range() {
        let event = sample_event();
        // Range ends exactly on the event's first day
        assert!(event.overlaps_range(DateRange::new(d(2025, 12, 20), d(2026, 1, 1))));
        // Range starts exactly on the event's last day
        assert!(event.overlaps_range(DateRange::new(d(2026, 2, 1), d(2026, 2, 10))));
        // Disjoint
        assert!(!event.overlaps_range(DateRange::new(d(2026, 2, 2), d(2026, 2, 10))));
    }

    #[test]
    fn test_impact_tier_from_str() {
        assert_eq!("high".parse::<ImpactTier>().unwrap(), ImpactTier::High);
        assert_eq!("MED".parse::<ImpactTier>().unwrap(), ImpactTier::Medium);
        assert_eq!("low".parse::<ImpactTier>().unwrap(), ImpactTier::Low);
        assert!("extreme".parse::<ImpactTier>().is_err());
    }

    #[test]
    fn test_event_display() {
        let display = format!("{}", sample_event());
        assert!(display.contains("Dubai Shopping Festival"));
        assert!(display.contains("high impact"));
    }

    // -- ProposalStatus tests --

    #[test]
    fn test_status_terminal() {
        assert!(!ProposalStatus::Pending.is_terminal());
        assert!(!ProposalStatus::Approved.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_review_decision_target() {
        assert_eq!(ReviewDecision::Approve.target_status(), ProposalStatus::Approved);
        assert_eq!(ReviewDecision::Reject.target_status(), ProposalStatus::Rejected);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ProposalStatus::Pending).unwrap(), "\"pending\"");
        let parsed: ProposalStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, ProposalStatus::Approved);
    }

    // -- PriceProposal tests --

    #[test]
    fn test_proposal_within_bounds() {
        let p = PriceProposal::sample();
        assert!(p.is_within_bounds());

        let mut over = PriceProposal::sample();
        over.proposed_price = 3000.0;
        assert!(!over.is_within_bounds());

        let mut under = PriceProposal::sample();
        under.proposed_price = 100.0;
        assert!(!under.is_within_bounds());
    }

    #[test]
    fn test_proposal_price_delta() {
        let p = PriceProposal::sample();
        assert!((p.price_delta() - 80.0).abs() < 1e-10);
    }

    #[test]
    fn test_proposal_display() {
        let display = format!("{}", PriceProposal::sample());
        assert!(display.contains("+11%"));
        assert!(display.contains("medium risk"));
        assert!(display.contains("pending"));
    }

    #[test]
    fn test_proposal_serialization_roundtrip() {
        let p = PriceProposal::sample();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: PriceProposal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.listing_id, 1);
        assert_eq!(parsed.change_pct, 11);
        assert_eq!(parsed.risk_level, RiskLevel::Medium);
        assert_eq!(parsed.status, ProposalStatus::Pending);
    }

    // -- ExecutionResult tests --

    #[test]
    fn test_execution_result_failure() {
        let result = ExecutionResult::failure(42, "connection timeout");
        assert_eq!(result.proposal_id, 42);
        assert!(!result.success);
        assert!(!result.verified);
        assert_eq!(result.updated_days, 0);
        assert_eq!(result.error.as_deref(), Some("connection timeout"));
    }

    #[test]
    fn test_execution_result_display() {
        let ok = ExecutionResult {
            proposal_id: 7,
            success: true,
            updated_days: 1,
            verified: true,
            error: None,
            executed_at: Utc::now(),
        };
        assert!(format!("{ok}").contains("verified"));

        let unverified = ExecutionResult { verified: false, ..ok.clone() };
        assert!(format!("{unverified}").contains("unverified"));

        let failed = ExecutionResult::failure(7, "boom");
        let display = format!("{failed}");
        assert!(display.contains("failed"));
        assert!(display.contains("boom"));
    }

    // -- Listing tests --

    #[test]
    fn test_listing_display() {
        let display = format!("{}", Listing::sample());
        assert!(display.contains("Marina View"));
        assert!(display.contains("channel #40221"));

        let local = Listing { external_id: None, ..Listing::sample() };
        assert!(format!("{local}").contains("local-only"));
    }

    // -- HelmError tests --

    #[test]
    fn test_helm_error_display() {
        assert_eq!(
            format!("{}", HelmError::ListingNotFound(9)),
            "Listing not found: 9"
        );
        assert_eq!(
            format!("{}", HelmError::ProposalNotFound(3)),
            "Proposal not found: 3"
        );
        let e = HelmError::Channel { message: "503 from channel".to_string() };
        assert!(format!("{e}").contains("503"));
    }
}
