//! Pricing analyst.
//!
//! Generates per-night price proposals from occupancy and event
//! signals, constrained by the listing's guardrail bounds. Proposals
//! are ranked in date order and carry human-readable reasoning so a
//! reviewer can see why each change was suggested.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::signals::{recommendation, EventSignalProvider};
use crate::stores::{CalendarStore, ListingRegistry, ProposalStore};
use crate::strategy::heuristics::{
    change_pct, clamp_price, round_to_unit, ClampOutcome, HeuristicConfig, OccupancyBand,
};
use crate::strategy::occupancy::occupancy_rate;
use crate::types::{DateRange, HelmError, PriceProposal, ProposalStatus};

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

/// Proposals for one listing over one range, with summary stats.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub proposals: Vec<PriceProposal>,
    pub summary: String,
    pub total_proposals: usize,
    pub average_increase: f64,
}

// ---------------------------------------------------------------------------
// Analyst
// ---------------------------------------------------------------------------

pub struct PricingAnalyst {
    registry: Arc<dyn ListingRegistry>,
    calendar: Arc<dyn CalendarStore>,
    proposals: Arc<dyn ProposalStore>,
    signals: EventSignalProvider,
    cfg: HeuristicConfig,
    occupancy_window_days: u32,
    as_of: Option<NaiveDate>,
}

impl PricingAnalyst {
    pub fn new(
        registry: Arc<dyn ListingRegistry>,
        calendar: Arc<dyn CalendarStore>,
        proposals: Arc<dyn ProposalStore>,
        signals: EventSignalProvider,
        cfg: HeuristicConfig,
    ) -> Self {
        Self {
            registry,
            calendar,
            proposals,
            signals,
            cfg,
            occupancy_window_days: 30,
            as_of: None,
        }
    }

    /// Override the trailing-occupancy window length (default 30 days).
    pub fn with_occupancy_window(mut self, days: u32) -> Self {
        self.occupancy_window_days = days;
        self
    }

    /// Pin "today" for the occupancy window, for deterministic runs.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Generate proposals for one listing over a date range.
    pub async fn generate_proposals(
        &self,
        listing_id: i64,
        range: DateRange,
    ) -> Result<AnalysisResult> {
        let listing = self
            .registry
            .get(listing_id)
            .await?
            .ok_or(HelmError::ListingNotFound(listing_id))?;

        let base = listing.base_price;
        let floor = listing.floor.unwrap_or_else(|| self.cfg.derive_floor(base));
        let ceiling = listing
            .ceiling
            .unwrap_or_else(|| self.cfg.derive_ceiling(base));

        let events = self.signals.events_for(range).await?;
        let occupancy = self.trailing_occupancy(listing_id).await?;

        let calendar = self.calendar.get(listing_id, range).await?;
        let price_at: HashMap<NaiveDate, f64> = calendar
            .iter()
            .map(|n| (n.date, n.current_price))
            .collect();

        debug!(
            listing_id,
            range = %range,
            occupancy,
            events = events.len(),
            "Generating proposals"
        );

        let mut proposals = Vec::new();

        for date in range.days() {
            let current = price_at.get(&date).copied().unwrap_or(base);

            // A zero or negative price would blow up the change
            // percentage below; skip the night entirely.
            if current <= 0.0 {
                debug!(listing_id, %date, current, "Skipping night with degenerate price");
                continue;
            }

            let day_events: Vec<_> = events
                .iter()
                .filter(|e| e.overlaps(date))
                .cloned()
                .collect();
            let event_backed = !day_events.is_empty();

            let (mut proposed, mut reasoning) = if event_backed {
                let rec = recommendation(&day_events, &self.cfg);
                (
                    current * (1.0 + rec.suggested_increase_pct / 100.0),
                    rec.reasoning,
                )
            } else {
                match self.cfg.occupancy_band(occupancy) {
                    OccupancyBand::High => (
                        current
                            * (1.0
                                + self.cfg.occupancy_adjustment_pct(OccupancyBand::High) / 100.0),
                        format!("High occupancy ({occupancy}%). Demand is strong, increase pricing."),
                    ),
                    OccupancyBand::Low => (
                        current
                            * (1.0 + self.cfg.occupancy_adjustment_pct(OccupancyBand::Low) / 100.0),
                        format!("Low occupancy ({occupancy}%). Decrease price to attract bookings."),
                    ),
                    OccupancyBand::Moderate => (
                        current,
                        format!("Moderate occupancy ({occupancy}%). Maintain current pricing."),
                    ),
                }
            };

            let (clamped, outcome) = clamp_price(proposed, floor, ceiling);
            proposed = clamped;
            match outcome {
                ClampOutcome::Floor => {
                    reasoning.push_str(&format!(
                        " (Capped at floor: {} {floor:.0})",
                        listing.currency
                    ));
                }
                ClampOutcome::Ceiling => {
                    reasoning.push_str(&format!(
                        " (Capped at ceiling: {} {ceiling:.0})",
                        listing.currency
                    ));
                }
                ClampOutcome::Unclamped => {}
            }

            // Rounding can nudge a clamped price back past a bound, so
            // re-clamp without touching the reasoning.
            proposed = round_to_unit(proposed, self.cfg.rounding_unit);
            (proposed, _) = clamp_price(proposed, floor, ceiling);

            let change = change_pct(current, proposed);
            if change.unsigned_abs() < self.cfg.min_change_pct {
                continue;
            }

            proposals.push(PriceProposal {
                id: 0,
                version: 0,
                listing_id,
                date,
                current_price: current,
                proposed_price: proposed,
                price_floor: floor,
                price_ceiling: ceiling,
                change_pct: change,
                risk_level: self.cfg.classify_risk(change, event_backed),
                reasoning,
                status: ProposalStatus::Pending,
            });
        }

        let total_proposals = proposals.len();
        let average_increase = proposals.iter().map(|p| p.change_pct as f64).sum::<f64>()
            / (total_proposals.max(1) as f64);

        let summary = if total_proposals == 0 {
            "No pricing changes recommended for this period.".to_string()
        } else {
            let sign = if average_increase > 0.0 { "+" } else { "" };
            format!(
                "{total_proposals} proposal(s) generated with avg {sign}{average_increase:.1}% change."
            )
        };

        info!(listing_id, total_proposals, average_increase, "Analysis complete");

        Ok(AnalysisResult {
            proposals,
            summary,
            total_proposals,
            average_increase,
        })
    }

    /// Generate proposals for every listing in the registry,
    /// sequentially, skipping listings that produce none.
    pub async fn generate_portfolio(
        &self,
        range: DateRange,
    ) -> Result<Vec<(i64, AnalysisResult)>> {
        let listings = self.registry.all().await?;
        let mut results = Vec::new();

        for listing in listings {
            let result = self.generate_proposals(listing.id, range).await?;
            if result.total_proposals > 0 {
                results.push((listing.id, result));
            }
        }

        Ok(results)
    }

    /// Persist proposals through the store, replacing any prior row for
    /// the same `(listing_id, date)` key. Returns the assigned ids.
    pub async fn save_proposals(&self, result: &AnalysisResult) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(result.proposals.len());
        for proposal in &result.proposals {
            ids.push(self.proposals.upsert(proposal.clone()).await?);
        }
        info!(count = ids.len(), "Proposals saved");
        Ok(ids)
    }

    async fn trailing_occupancy(&self, listing_id: i64) -> Result<u8> {
        let today = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let window = DateRange::new(
            today - chrono::Duration::days(self.occupancy_window_days as i64),
            today,
        );
        let nights = self.calendar.get(listing_id, window).await?;
        Ok(occupancy_rate(&nights))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{
        MemoryCalendarStore, MemoryEventSignalStore, MemoryListingRegistry, MemoryProposalStore,
    };
    use crate::types::{CalendarNight, CalendarStatus, EventSignal, ImpactTier, Listing, RiskLevel};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn listing(id: i64, base: f64) -> Listing {
        Listing {
            id,
            name: format!("Listing {id}"),
            base_price: base,
            currency: "AED".to_string(),
            external_id: None,
            floor: None,
            ceiling: None,
        }
    }

    fn booked_window(listing_id: i64, booked: u32, total: u32, end: NaiveDate) -> Vec<CalendarNight> {
        (0..total)
            .map(|i| CalendarNight {
                listing_id,
                date: end - chrono::Duration::days(i as i64),
                status: if i < booked {
                    CalendarStatus::Booked
                } else {
                    CalendarStatus::Available
                },
                current_price: 0.0,
                min_stay: None,
                max_stay: None,
            })
            .collect()
    }

    struct Fixture {
        registry: Arc<MemoryListingRegistry>,
        calendar: Arc<MemoryCalendarStore>,
        proposals: Arc<MemoryProposalStore>,
        signals: Arc<MemoryEventSignalStore>,
    }

    impl Fixture {
        fn new(listings: Vec<Listing>, nights: Vec<CalendarNight>, events: Vec<EventSignal>) -> Self {
            Self {
                registry: Arc::new(MemoryListingRegistry::with_listings(listings)),
                calendar: Arc::new(MemoryCalendarStore::with_nights(nights)),
                proposals: Arc::new(MemoryProposalStore::new()),
                signals: Arc::new(MemoryEventSignalStore::with_signals(events)),
            }
        }

        fn analyst(&self) -> PricingAnalyst {
            PricingAnalyst::new(
                self.registry.clone(),
                self.calendar.clone(),
                self.proposals.clone(),
                EventSignalProvider::new(self.signals.clone()),
                HeuristicConfig::default(),
            )
            // Pin today so the trailing window stays deterministic.
            .with_as_of(d(3, 1))
        }
    }

    fn event(name: &str, tier: ImpactTier, start: NaiveDate, end: NaiveDate) -> EventSignal {
        EventSignal {
            name: name.to_string(),
            start_date: start,
            end_date: end,
            location: "Dubai".to_string(),
            expected_impact: tier,
            confidence: 85,
            description: None,
        }
    }

    // High-occupancy worked example: base 750 at 85% occupancy, no
    // events. 750 * 1.1 = 825 rounds to 830, +11%, medium risk.
    #[tokio::test]
    async fn test_high_occupancy_worked_example() {
        let fx = Fixture::new(
            vec![listing(1, 750.0)],
            booked_window(1, 17, 20, d(3, 1)), // 85%
            vec![],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 20)))
            .await
            .unwrap();

        assert_eq!(result.total_proposals, 1);
        let p = &result.proposals[0];
        assert_eq!(p.proposed_price, 830.0);
        assert_eq!(p.change_pct, 11);
        assert_eq!(p.risk_level, RiskLevel::Medium);
        assert_eq!(p.price_floor, 375.0);
        assert_eq!(p.price_ceiling, 2250.0);
        assert!(p.reasoning.contains("High occupancy (85%)"));
    }

    // Event worked example: base 600 with one high-impact event.
    // 600 * 1.3 = 780, +30%, medium risk (inclusive boundary).
    #[tokio::test]
    async fn test_high_event_worked_example() {
        let fx = Fixture::new(
            vec![listing(1, 600.0)],
            vec![],
            vec![event("F1 Grand Prix", ImpactTier::High, d(3, 20), d(3, 22))],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 21), d(3, 21)))
            .await
            .unwrap();

        assert_eq!(result.total_proposals, 1);
        let p = &result.proposals[0];
        assert_eq!(p.proposed_price, 780.0);
        assert_eq!(p.change_pct, 30);
        assert_eq!(p.risk_level, RiskLevel::Medium);
        assert!(p.reasoning.contains("F1 Grand Prix"));
    }

    #[tokio::test]
    async fn test_moderate_occupancy_emits_nothing() {
        let fx = Fixture::new(
            vec![listing(1, 750.0)],
            booked_window(1, 14, 20, d(3, 1)), // 70%
            vec![],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 24)))
            .await
            .unwrap();

        assert_eq!(result.total_proposals, 0);
        assert_eq!(result.summary, "No pricing changes recommended for this period.");
        assert_eq!(result.average_increase, 0.0);
    }

    #[tokio::test]
    async fn test_low_occupancy_decreases_price() {
        let fx = Fixture::new(
            vec![listing(1, 800.0)],
            booked_window(1, 8, 20, d(3, 1)), // 40%
            vec![],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 20)))
            .await
            .unwrap();

        let p = &result.proposals[0];
        // 800 * 0.95 = 760
        assert_eq!(p.proposed_price, 760.0);
        assert_eq!(p.change_pct, -5);
        assert_eq!(p.risk_level, RiskLevel::Low);
        assert!(p.reasoning.contains("Low occupancy (40%)"));
    }

    #[tokio::test]
    async fn test_calendar_price_overrides_base() {
        let mut nights = booked_window(1, 17, 20, d(3, 1));
        nights.push(CalendarNight {
            listing_id: 1,
            date: d(3, 20),
            status: CalendarStatus::Available,
            current_price: 1000.0,
            min_stay: None,
            max_stay: None,
        });
        let fx = Fixture::new(vec![listing(1, 750.0)], nights, vec![]);
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 20)))
            .await
            .unwrap();

        let p = &result.proposals[0];
        assert_eq!(p.current_price, 1000.0);
        assert_eq!(p.proposed_price, 1100.0);
    }

    #[tokio::test]
    async fn test_degenerate_price_is_skipped() {
        let mut nights = booked_window(1, 17, 20, d(3, 1));
        nights.push(CalendarNight {
            listing_id: 1,
            date: d(3, 20),
            status: CalendarStatus::Available,
            current_price: 0.0,
            min_stay: None,
            max_stay: None,
        });
        let fx = Fixture::new(vec![listing(1, 750.0)], nights, vec![]);
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 21)))
            .await
            .unwrap();

        // Only the 21st survives; the zero-priced 20th is dropped.
        assert_eq!(result.total_proposals, 1);
        assert_eq!(result.proposals[0].date, d(3, 21));
    }

    #[tokio::test]
    async fn test_ceiling_clamp_appends_note() {
        // Explicit tight ceiling forces the clamp.
        let mut l = listing(1, 750.0);
        l.ceiling = Some(790.0);
        let fx = Fixture::new(
            vec![l],
            booked_window(1, 17, 20, d(3, 1)), // 85% → +10%
            vec![],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 20)))
            .await
            .unwrap();

        let p = &result.proposals[0];
        // 825 clamps to 790 then rounds to the nearest 10.
        assert_eq!(p.proposed_price, 790.0);
        assert!(p.reasoning.contains("Capped at ceiling: AED 790"));
        assert!(p.is_within_bounds());
    }

    #[tokio::test]
    async fn test_all_proposals_respect_bounds() {
        let fx = Fixture::new(
            vec![listing(1, 500.0)],
            booked_window(1, 18, 20, d(3, 1)),
            vec![event("Expo", ImpactTier::High, d(3, 20), d(3, 25))],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 15), d(3, 30)))
            .await
            .unwrap();

        assert!(result.total_proposals > 0);
        for p in &result.proposals {
            assert!(p.is_within_bounds(), "{p} violates bounds");
            // The change percentage is always recomputed locally.
            assert_eq!(p.change_pct, change_pct(p.current_price, p.proposed_price));
            assert!(p.change_pct.unsigned_abs() >= 1);
        }
    }

    #[tokio::test]
    async fn test_event_beats_occupancy_rule() {
        // 40% occupancy would cut the price, but the event day bumps it.
        let fx = Fixture::new(
            vec![listing(1, 600.0)],
            booked_window(1, 8, 20, d(3, 1)),
            vec![event("Boat Show", ImpactTier::Medium, d(3, 20), d(3, 20))],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 21)))
            .await
            .unwrap();

        assert_eq!(result.total_proposals, 2);
        let event_day = &result.proposals[0];
        assert_eq!(event_day.date, d(3, 20));
        assert_eq!(event_day.proposed_price, 690.0); // 600 * 1.15
        assert!(event_day.reasoning.contains("Boat Show"));

        let quiet_day = &result.proposals[1];
        assert_eq!(quiet_day.date, d(3, 21));
        assert_eq!(quiet_day.change_pct, -5);
    }

    #[tokio::test]
    async fn test_summary_average() {
        let fx = Fixture::new(
            vec![listing(1, 750.0)],
            booked_window(1, 17, 20, d(3, 1)),
            vec![],
        );
        let result = fx
            .analyst()
            .generate_proposals(1, DateRange::new(d(3, 20), d(3, 22)))
            .await
            .unwrap();

        assert_eq!(result.total_proposals, 3);
        assert!((result.average_increase - 11.0).abs() < 1e-10);
        assert_eq!(result.summary, "3 proposal(s) generated with avg +11.0% change.");
    }

    #[tokio::test]
    async fn test_unknown_listing_errors() {
        let fx = Fixture::new(vec![], vec![], vec![]);
        let err = fx
            .analyst()
            .generate_proposals(42, DateRange::new(d(3, 20), d(3, 21)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Listing not found: 42"));
    }

    #[tokio::test]
    async fn test_portfolio_skips_quiet_listings() {
        let fx = Fixture::new(
            vec![listing(1, 750.0), listing(2, 500.0)],
            // Listing 1 runs hot, listing 2 sits in the moderate band.
            [booked_window(1, 17, 20, d(3, 1)), booked_window(2, 14, 20, d(3, 1))].concat(),
            vec![],
        );
        let results = fx
            .analyst()
            .generate_portfolio(DateRange::new(d(3, 20), d(3, 21)))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[0].1.total_proposals, 2);
    }

    #[tokio::test]
    async fn test_save_proposals_replaces_same_key() {
        let fx = Fixture::new(
            vec![listing(1, 750.0)],
            booked_window(1, 17, 20, d(3, 1)),
            vec![],
        );
        let analyst = fx.analyst();
        let range = DateRange::new(d(3, 20), d(3, 20));

        let first = analyst.generate_proposals(1, range).await.unwrap();
        let ids_a = analyst.save_proposals(&first).await.unwrap();

        let second = analyst.generate_proposals(1, range).await.unwrap();
        let ids_b = analyst.save_proposals(&second).await.unwrap();

        // Regeneration for the same night reuses the row id.
        assert_eq!(ids_a, ids_b);
        let saved = fx.proposals.get(ids_a[0]).await.unwrap().unwrap();
        assert_eq!(saved.version, 2);
    }
}
