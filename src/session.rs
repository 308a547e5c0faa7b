//! In-memory tracker for each principal's conversational intent.
//!
//! The shop walks a buyer through a short funnel:
//!
//! ```text
//! (idle) -> ProductSelected -> AwaitingEvidence -> (idle)
//! (idle) -> TopUpSelected   -> AwaitingEvidence -> (idle)
//! ```
//!
//! with `/cancel` dropping back to idle from anywhere. Intents live
//! only in memory; a restart simply asks everyone to start over.
//!
//! Handlers that consume an intent MUST use [`SessionTracker::take`]:
//! the removal is atomic, so a duplicated event (double tap, retried
//! delivery) finds no intent the second time and cannot double-spend.

use dashmap::DashMap;

use crate::models::key::Tier;
use crate::models::transaction::TxId;
use crate::models::user::PrincipalId;

/// What a payment is for, carried from product pick to evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Purchase(Tier),
    TopUp,
}

/// Where a principal currently is in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Picked a product; waiting on a payment method.
    ProductSelected { tier: Tier, price: i64 },
    /// Picked a top-up amount; waiting on a payment method.
    TopUpSelected { amount: i64 },
    /// Asked for a custom top-up; next text message is the amount.
    AwaitingTopUpAmount,
    /// Chose a method; next photo is the payment evidence.
    AwaitingEvidence {
        purpose: Purpose,
        method: String,
        amount: i64,
    },
    /// Admin flow: next text message is the rejection reason.
    AwaitingRejectReason { tx_id: TxId },
    /// Admin flow: next photo becomes a payment method's QR.
    AwaitingQrPhoto { method: String },
}

/// Concurrent map of principal -> current intent.
pub struct SessionTracker {
    intents: DashMap<PrincipalId, Intent>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            intents: DashMap::new(),
        }
    }

    /// Set (or replace) the principal's intent.
    pub fn begin(&self, principal: PrincipalId, intent: Intent) {
        self.intents.insert(principal, intent);
    }

    /// Atomically remove and return the intent. The second of two
    /// racing consumers gets `None`.
    pub fn take(&self, principal: PrincipalId) -> Option<Intent> {
        self.intents.remove(&principal).map(|(_, intent)| intent)
    }

    /// Read the intent without consuming it. For dispatch decisions
    /// and validation paths that must leave the intent in place.
    pub fn peek(&self, principal: PrincipalId) -> Option<Intent> {
        self.intents
            .get(&principal)
            .map(|entry| entry.value().clone())
    }

    /// Drop any in-flight intent. Returns whether there was one.
    pub fn cancel(&self, principal: PrincipalId) -> bool {
        self.intents.remove(&principal).is_some()
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_exactly_once() {
        let tracker = SessionTracker::new();
        let principal = PrincipalId(7);

        tracker.begin(principal, Intent::AwaitingTopUpAmount);

        assert_eq!(tracker.take(principal), Some(Intent::AwaitingTopUpAmount));
        assert_eq!(tracker.take(principal), None);
    }

    #[test]
    fn peek_leaves_intent_in_place() {
        let tracker = SessionTracker::new();
        let principal = PrincipalId(7);

        tracker.begin(
            principal,
            Intent::ProductSelected {
                tier: Tier::ThreeDay,
                price: 280,
            },
        );

        assert!(tracker.peek(principal).is_some());
        assert!(tracker.peek(principal).is_some());
        assert!(tracker.take(principal).is_some());
        assert!(tracker.peek(principal).is_none());
    }

    #[test]
    fn cancel_reports_whether_anything_was_dropped() {
        let tracker = SessionTracker::new();
        let principal = PrincipalId(7);

        assert!(!tracker.cancel(principal));

        tracker.begin(principal, Intent::AwaitingTopUpAmount);
        assert!(tracker.cancel(principal));
        assert!(!tracker.cancel(principal));
    }

    #[test]
    fn begin_replaces_previous_intent() {
        let tracker = SessionTracker::new();
        let principal = PrincipalId(7);

        tracker.begin(
            principal,
            Intent::ProductSelected {
                tier: Tier::ThreeDay,
                price: 280,
            },
        );
        tracker.begin(principal, Intent::TopUpSelected { amount: 500 });

        assert_eq!(
            tracker.take(principal),
            Some(Intent::TopUpSelected { amount: 500 })
        );
    }
}
