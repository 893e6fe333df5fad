use super::registry::StatusRegistry;
use super::status::OrderStatus;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the order status history.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Fulfillment view of an order.
///
/// `current_status` only moves through [`Order::advanced`], which checks the
/// registry graph and bumps `version`. Stores use `version` for optimistic
/// concurrency.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: u32,
    pub customer_id: u32,
    pub current_status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub payment_attempt_id: Option<u64>,
    pub version: u64,
}

impl Order {
    pub fn new(id: u32, customer_id: u32, at: DateTime<Utc>) -> Self {
        Self::seeded(id, customer_id, OrderStatus::OrderReceived, at)
    }

    /// Creates an order directly at `status`. Only used when migrating
    /// orders that were persisted with a legacy status.
    pub fn seeded(id: u32, customer_id: u32, status: OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            current_status: status,
            status_history: vec![StatusChange { status, at }],
            payment_attempt_id: None,
            version: 0,
        }
    }

    /// Returns a copy moved to `to`, or `InvalidTransition` if the graph has
    /// no such edge. `self` is never modified.
    pub fn advanced(
        &self,
        registry: &StatusRegistry,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        if !registry.can_transition(self.current_status, to) {
            return Err(PaymentError::InvalidTransition {
                from: self.current_status,
                to,
            });
        }
        let mut next = self.clone();
        next.current_status = to;
        next.status_history.push(StatusChange { status: to, at });
        next.version += 1;
        Ok(next)
    }

    /// Whether the recorded history is a legal walk of the graph.
    pub fn history_is_valid_walk(&self, registry: &StatusRegistry) -> bool {
        self.status_history
            .windows(2)
            .all(|pair| registry.can_transition(pair[0].status, pair[1].status))
            && self.status_history.last().map(|c| c.status) == Some(self.current_status)
    }
}
