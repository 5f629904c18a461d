//! Trailing occupancy calculator.
//!
//! A pure function over calendar rows. The analyst decides the window
//! (trailing 30 days by default) and feeds the rows in; an empty window
//! reads as 0% rather than an error.

use crate::types::CalendarNight;

/// Percentage of nights booked, rounded to the nearest whole percent.
/// Returns 0 for an empty slice.
pub fn occupancy_rate(nights: &[CalendarNight]) -> u8 {
    if nights.is_empty() {
        return 0;
    }

    let booked = nights.iter().filter(|n| n.is_booked()).count();
    ((booked as f64 / nights.len() as f64) * 100.0).round() as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
