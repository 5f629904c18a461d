//! Channel sync executor.
//!
//! Pushes approved proposals to the channel manager one night at a
//! time, verifies each write by reading the calendar back, and records
//! the outcome. Failures never mutate a proposal's status — an
//! approved proposal stays approved so the caller can retry by id.

use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::{CalendarUpdate, ChannelManager};
use crate::stores::{CalendarStore, CalendarUpdateFields, ListingRegistry, ProposalStore};
use crate::types::{DateRange, ExecutionResult, HelmError, ProposalStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the execution path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between batch items, respecting the channel's rate limit.
    pub batch_delay_ms: u64,
    /// Read-back prices within this distance count as confirmed.
    pub price_tolerance: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: 500,
            price_tolerance: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct ChannelSyncExecutor {
    proposals: Arc<dyn ProposalStore>,
    registry: Arc<dyn ListingRegistry>,
    calendar: Arc<dyn CalendarStore>,
    channel: Arc<dyn ChannelManager>,
    cfg: SyncConfig,
}

impl ChannelSyncExecutor {
    pub fn new(
        proposals: Arc<dyn ProposalStore>,
        registry: Arc<dyn ListingRegistry>,
        calendar: Arc<dyn CalendarStore>,
        channel: Arc<dyn ChannelManager>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            proposals,
            registry,
            calendar,
            channel,
            cfg,
        }
    }

    /// Execute a single approved proposal against the channel.
    ///
    /// Returns `Err` only when the proposal or its listing is missing;
    /// every sync failure is folded into a failed `ExecutionResult` so
    /// the proposal remains approved and retryable.
    pub async fn execute_proposal(&self, id: i64) -> Result<ExecutionResult> {
        let executed_at = Utc::now();

        let Some(proposal) = self.proposals.get(id).await? else {
            return Err(HelmError::ProposalNotFound(id).into());
        };

        if proposal.status != ProposalStatus::Approved {
            return Ok(ExecutionResult::failure(
                id,
                format!("Proposal {id} is {}, not approved", proposal.status),
            ));
        }

        let Some(listing) = self.registry.get(proposal.listing_id).await? else {
            return Err(HelmError::ListingNotFound(proposal.listing_id).into());
        };

        // Local-only listings have no channel counterpart; confirm
        // without any network call.
        let Some(external_id) = listing.external_id else {
            debug!(proposal = id, listing = listing.id, "Local-only listing, skipping channel");
            self.write_local_calendar(&proposal).await?;
            return Ok(ExecutionResult {
                proposal_id: id,
                success: true,
                updated_days: 1,
                verified: true,
                error: None,
                executed_at,
            });
        };

        let update = CalendarUpdate {
            date: proposal.date,
            price: proposal.proposed_price,
        };

        if let Err(e) = self.channel.update_calendar(external_id, vec![update]).await {
            warn!(proposal = id, external_id, error = %e, "Channel update failed");
            return Ok(ExecutionResult::failure(id, e.to_string()));
        }

        let verified = match self
            .channel
            .get_calendar(external_id, DateRange::single(proposal.date))
            .await
        {
            Ok(days) => days.iter().any(|d| {
                d.date == proposal.date
                    && (d.price - proposal.proposed_price).abs() < self.cfg.price_tolerance
            }),
            Err(e) => {
                warn!(proposal = id, external_id, error = %e, "Verification read failed");
                return Ok(ExecutionResult::failure(
                    id,
                    format!("Verification read failed: {e}"),
                ));
            }
        };

        if verified {
            self.write_local_calendar(&proposal).await?;
        } else {
            // The channel may simply not have converged yet; the caller
            // can re-execute the same id later.
            warn!(
                proposal = id,
                external_id,
                expected = proposal.proposed_price,
                "Read-back price mismatch, sync unverified"
            );
        }

        info!(proposal = id, external_id, verified, "Proposal executed");

        Ok(ExecutionResult {
            proposal_id: id,
            success: true,
            updated_days: 1,
            verified,
            error: None,
            executed_at,
        })
    }

    /// Execute a batch of proposals strictly sequentially, pausing
    /// between items. One result per id, in input order; a failing
    /// item never aborts its siblings.
    pub async fn execute_batch(&self, ids: &[i64]) -> Vec<ExecutionResult> {
        let batch_id = Uuid::new_v4();
        info!(batch = %batch_id, count = ids.len(), "Executing proposal batch");

        let mut results = Vec::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            let result = match self.execute_proposal(id).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(batch = %batch_id, proposal = id, error = %e, "Execution attempt failed");
                    ExecutionResult::failure(id, e.to_string())
                }
            };
            results.push(result);

            if i + 1 < ids.len() {
                tokio::time::sleep(Duration::from_millis(self.cfg.batch_delay_ms)).await;
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            batch = %batch_id,
            succeeded,
            failed = results.len() - succeeded,
            "Batch execution complete"
        );
        results
    }

    /// Rollback is unsupported: the calendar retains no prior price
    /// once a sync overwrites it.
    pub fn rollback_proposal(&self, id: i64) -> ExecutionResult {
        warn!(proposal = id, "Rollback requested but unsupported");
        ExecutionResult::failure(
            id,
            "Rollback is not supported: prior prices are not retained once overwritten",
        )
    }

    async fn write_local_calendar(&self, proposal: &crate::types::PriceProposal) -> Result<()> {
        self.calendar
            .upsert(
                proposal.listing_id,
                proposal.date,
                CalendarUpdateFields {
                    price: Some(proposal.proposed_price),
                    status: None,
                },
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
