//! Collaborator store interfaces.
//!
//! The pipeline consumes four externally owned stores: the booking
//! calendar, the event-signal table, the listing registry, and the
//! proposal table. Each is abstracted behind a trait so the engine can
//! run against the in-memory implementations here or a real backend
//! without changes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{
    CalendarNight, CalendarStatus, DateRange, EventSignal, Listing, PriceProposal, ProposalStatus,
};

// ---------------------------------------------------------------------------
// Calendar store
// ---------------------------------------------------------------------------

/// Partial update of a calendar night. Absent fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct CalendarUpdateFields {
    pub price: Option<f64>,
    pub status: Option<CalendarStatus>,
}

/// The local booking calendar (one row per listing per night).
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Fetch the nights for a listing inside a range, ordered by date.
    async fn get(&self, listing_id: i64, range: DateRange) -> Result<Vec<CalendarNight>>;

    /// Insert or partially update a single night.
    async fn upsert(
        &self,
        listing_id: i64,
        date: NaiveDate,
        fields: CalendarUpdateFields,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Event signal store
// ---------------------------------------------------------------------------

/// Range-indexed demand signals, refreshed as append-only versioned
/// snapshots. Readers always see the latest complete snapshot — an
/// in-flight refresh can never hand a generator a half-replaced table.
#[async_trait]
pub trait EventSignalStore: Send + Sync {
    /// Signals from the latest snapshot that intersect the range
    /// (`end_date >= range.start AND start_date <= range.end`).
    async fn query(&self, range: DateRange) -> Result<Vec<EventSignal>>;

    /// Publish a fresh snapshot; returns its version number.
    async fn publish(&self, signals: Vec<EventSignal>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Listing registry
// ---------------------------------------------------------------------------

/// The portfolio of managed listings.
#[async_trait]
pub trait ListingRegistry: Send + Sync {
    async fn get(&self, listing_id: i64) -> Result<Option<Listing>>;

    /// Every listing, in stable id order.
    async fn all(&self) -> Result<Vec<Listing>>;
}

// ---------------------------------------------------------------------------
// Proposal store
// ---------------------------------------------------------------------------

/// Outcome of a compare-and-set status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The proposal was in `from` and is now in `to`.
    Applied,
    /// Already in the target state — idempotent no-op.
    AlreadyTarget,
    /// In some other state; left untouched.
    Refused,
    NotFound,
}

/// Live price proposals, at most one per `(listing_id, date)` key.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<PriceProposal>>;

    /// Insert a proposal, replacing any prior row for the same
    /// `(listing_id, date)` key. The replacement keeps the row id and
    /// bumps the version stamp. Returns the id.
    async fn upsert(&self, proposal: PriceProposal) -> Result<i64>;

    /// Atomically move a proposal from `from` to `to`. The compare is
    /// done under the store lock, so two concurrent reviewers cannot
    /// both claim the same transition.
    async fn transition(
        &self,
        id: i64,
        from: ProposalStatus,
        to: ProposalStatus,
    ) -> Result<TransitionOutcome>;

    /// All proposals currently in a status, in id order.
    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<PriceProposal>>;
}
