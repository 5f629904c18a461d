//! In-memory store implementations.
//!
//! Deterministic, lock-protected reference backends used by the binary
//! and the test suite. All state lives behind `std::sync::Mutex` — the
//! critical sections are tiny and never held across an await.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::{
    CalendarStore, CalendarUpdateFields, EventSignalStore, ListingRegistry, ProposalStore,
    TransitionOutcome,
};
use crate::types::{
    CalendarNight, CalendarStatus, DateRange, EventSignal, Listing, PriceProposal, ProposalStatus,
};

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// In-memory booking calendar keyed by `(listing_id, date)`.
#[derive(Default)]
pub struct MemoryCalendarStore {
    nights: Mutex<HashMap<(i64, NaiveDate), CalendarNight>>,
}

impl MemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nights(nights: Vec<CalendarNight>) -> Self {
        let map = nights
            .into_iter()
            .map(|n| ((n.listing_id, n.date), n))
            .collect();
        Self { nights: Mutex::new(map) }
    }
}

#[async_trait]
impl CalendarStore for MemoryCalendarStore {
    async fn get(&self, listing_id: i64, range: DateRange) -> Result<Vec<CalendarNight>> {
        let nights = self.nights.lock().unwrap();
        let mut rows: Vec<CalendarNight> = nights
            .values()
            .filter(|n| n.listing_id == listing_id && range.contains(n.date))
            .cloned()
            .collect();
        rows.sort_by_key(|n| n.date);
        Ok(rows)
    }

    async fn upsert(
        &self,
        listing_id: i64,
        date: NaiveDate,
        fields: CalendarUpdateFields,
    ) -> Result<()> {
        let mut nights = self.nights.lock().unwrap();
        let night = nights.entry((listing_id, date)).or_insert(CalendarNight {
            listing_id,
            date,
            status: CalendarStatus::Available,
            current_price: 0.0,
            min_stay: None,
            max_stay: None,
        });
        if let Some(price) = fields.price {
            night.current_price = price;
        }
        if let Some(status) = fields.status {
            night.status = status;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event signals
// ---------------------------------------------------------------------------

struct SignalSnapshot {
    version: u64,
    fetched_at: DateTime<Utc>,
    signals: Vec<EventSignal>,
}

/// Versioned, append-only signal table. `publish` adds a numbered
/// snapshot; `query` only ever reads the most recent one, so a refresh
/// concurrent with generation is invisible until it completes.
#[derive(Default)]
pub struct MemoryEventSignalStore {
    snapshots: Mutex<Vec<SignalSnapshot>>,
}

impl MemoryEventSignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signals(signals: Vec<EventSignal>) -> Self {
        Self {
            snapshots: Mutex::new(vec![SignalSnapshot {
                version: 1,
                fetched_at: Utc::now(),
                signals,
            }]),
        }
    }

    /// Version of the latest snapshot, 0 if none has been published.
    pub fn latest_version(&self) -> u64 {
        self.snapshots
            .lock()
            .unwrap()
            .last()
            .map(|s| s.version)
            .unwrap_or(0)
    }

    /// When the latest snapshot was published, if any.
    pub fn latest_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshots.lock().unwrap().last().map(|s| s.fetched_at)
    }
}

#[async_trait]
impl EventSignalStore for MemoryEventSignalStore {
    async fn query(&self, range: DateRange) -> Result<Vec<EventSignal>> {
        let snapshots = self.snapshots.lock().unwrap();
        let Some(latest) = snapshots.last() else {
            return Ok(Vec::new());
        };
        Ok(latest
            .signals
            .iter()
            .filter(|s| s.overlaps_range(range))
            .cloned()
            .collect())
    }

    async fn publish(&self, signals: Vec<EventSignal>) -> Result<u64> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let version = snapshots.last().map(|s| s.version + 1).unwrap_or(1);
        debug!(version, count = signals.len(), "Publishing signal snapshot");
        snapshots.push(SignalSnapshot {
            version,
            fetched_at: Utc::now(),
            signals,
        });
        Ok(version)
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// In-memory listing registry.
#[derive(Default)]
pub struct MemoryListingRegistry {
    listings: Mutex<HashMap<i64, Listing>>,
}

impl MemoryListingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: Vec<Listing>) -> Self {
        let map = listings.into_iter().map(|l| (l.id, l)).collect();
        Self { listings: Mutex::new(map) }
    }
}

#[async_trait]
impl ListingRegistry for MemoryListingRegistry {
    async fn get(&self, listing_id: i64) -> Result<Option<Listing>> {
        Ok(self.listings.lock().unwrap().get(&listing_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Listing>> {
        let mut rows: Vec<Listing> = self.listings.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|l| l.id);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

/// In-memory proposal table enforcing one live row per
/// `(listing_id, date)` key.
#[derive(Default)]
pub struct MemoryProposalStore {
    inner: Mutex<ProposalTable>,
}

#[derive(Default)]
struct ProposalTable {
    rows: HashMap<i64, PriceProposal>,
    by_key: HashMap<(i64, NaiveDate), i64>,
    next_id: i64,
}

impl MemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalStore for MemoryProposalStore {
    async fn get(&self, id: i64) -> Result<Option<PriceProposal>> {
        Ok(self.inner.lock().unwrap().rows.get(&id).cloned())
    }

    async fn upsert(&self, proposal: PriceProposal) -> Result<i64> {
        let mut table = self.inner.lock().unwrap();
        let key = (proposal.listing_id, proposal.date);

        let (id, version) = match table.by_key.get(&key) {
            Some(&existing_id) => {
                let prior_version = table
                    .rows
                    .get(&existing_id)
                    .map(|p| p.version)
                    .unwrap_or(0);
                (existing_id, prior_version + 1)
            }
            None => {
                table.next_id += 1;
                (table.next_id, 1)
            }
        };

        let mut row = proposal;
        row.id = id;
        row.version = version;
        debug!(id, version, listing_id = row.listing_id, date = %row.date, "Proposal upserted");
        table.by_key.insert(key, id);
        table.rows.insert(id, row);
        Ok(id)
    }

    async fn transition(
        &self,
        id: i64,
        from: ProposalStatus,
        to: ProposalStatus,
    ) -> Result<TransitionOutcome> {
        let mut table = self.inner.lock().unwrap();
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(TransitionOutcome::NotFound);
        };

        if row.status == to {
            return Ok(TransitionOutcome::AlreadyTarget);
        }
        if row.status != from {
            return Ok(TransitionOutcome::Refused);
        }

        row.status = to;
        row.version += 1;
        Ok(TransitionOutcome::Applied)
    }

    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<PriceProposal>> {
        let table = self.inner.lock().unwrap();
        let mut rows: Vec<PriceProposal> = table
            .rows
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.id);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
