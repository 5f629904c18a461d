//! Guardrail reviewer.
//!
//! Applies bulk approve/reject decisions to pending proposals. Status
//! is the only thing that moves here — prices never change during
//! review, and a rejected proposal never comes back.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::stores::{ProposalStore, TransitionOutcome};
use crate::types::{ProposalStatus, ReviewDecision};

pub struct GuardrailReviewer {
    proposals: Arc<dyn ProposalStore>,
}

impl GuardrailReviewer {
    pub fn new(proposals: Arc<dyn ProposalStore>) -> Self {
        Self { proposals }
    }

    /// Apply a decision to a batch of proposal ids.
    ///
    /// Pending proposals transition to the decision's target state.
    /// Ids already in the target state are idempotent no-ops; ids in
    /// the opposite terminal state are left untouched; unknown ids are
    /// skipped. Returns the count of ids actually transitioned.
    pub async fn review_bulk(&self, ids: &[i64], decision: ReviewDecision) -> Result<usize> {
        let target = decision.target_status();
        let mut transitioned = 0;

        for &id in ids {
            match self
                .proposals
                .transition(id, ProposalStatus::Pending, target)
                .await?
            {
                TransitionOutcome::Applied => transitioned += 1,
                TransitionOutcome::AlreadyTarget => {
                    debug!(proposal = id, %decision, "Already in target state");
                }
                TransitionOutcome::Refused => {
                    debug!(proposal = id, %decision, "Not pending, left untouched");
                }
                TransitionOutcome::NotFound => {
                    warn!(proposal = id, %decision, "Unknown proposal id, skipped");
                }
            }
        }

        info!(
            %decision,
            requested = ids.len(),
            transitioned,
            "Bulk review applied"
        );
        Ok(transitioned)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
