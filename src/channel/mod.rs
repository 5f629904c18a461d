//! Channel manager integration.
//!
//! Defines the `ChannelManager` trait the executor syncs through, and
//! provides the HostAway HTTP implementation. The external system is
//! the system of record for live calendar pricing; everything local is
//! a cache of it.

pub mod hostaway;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::DateRange;

/// A single-date price update pushed to the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarUpdate {
    pub date: NaiveDate,
    pub price: f64,
}

/// One night of the channel's calendar as read back for verification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelCalendarDay {
    pub date: NaiveDate,
    pub price: f64,
}

/// Abstraction over the external channel-management system.
///
/// Implementors are expected to be rate-limited and eventually
/// consistent — callers treat a read-back mismatch as "retry later",
/// never as proof the update was lost.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelManager: Send + Sync {
    /// Push price updates for a listing's calendar.
    async fn update_calendar(&self, external_id: i64, updates: Vec<CalendarUpdate>) -> Result<()>;

    /// Read back a listing's calendar for a date range.
    async fn get_calendar(
        &self,
        external_id: i64,
        range: DateRange,
    ) -> Result<Vec<ChannelCalendarDay>>;

    /// Channel name for logging and identification.
    fn name(&self) -> &str;
}
