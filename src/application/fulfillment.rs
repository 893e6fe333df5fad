use crate::domain::order::Order;
use crate::domain::ports::OrderStore;
use crate::domain::registry::StatusRegistry;
use crate::domain::status::{LegacyStatus, OrderStatus, StatusCategory};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

/// An order before and after one applied transition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Transition {
    pub before: Order,
    pub after: Order,
}

/// Order status state machine backed by the validated registry.
///
/// Lookups (`can_transition_to`, `category`, ...) are pure. Writes to one
/// order are serialized by a per-order lock, which the review engine also
/// holds while it decides attempts for that order. The store write itself is
/// an optimistic compare-and-swap, so a writer that bypasses this type still
/// makes the loser observe `ConcurrencyConflict`.
pub struct OrderStateMachine {
    registry: Arc<StatusRegistry>,
    orders: Arc<dyn OrderStore>,
    order_locks: Mutex<HashMap<u32, Arc<Mutex<()>>>>,
}

impl OrderStateMachine {
    pub fn new(registry: Arc<StatusRegistry>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            registry,
            orders,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Exclusive access to one order for the lifetime of the guard. Not
    /// reentrant: `advance` takes it, `authorize_payment` expects the caller
    /// to hold it.
    pub(crate) async fn lock_order(&self, order_id: u32) -> OwnedMutexGuard<()> {
        let lock = self
            .order_locks
            .lock()
            .await
            .entry(order_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn can_transition_to(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.registry.can_transition(from, to)
    }

    pub fn next_statuses(&self, from: OrderStatus) -> &'static [OrderStatus] {
        self.registry.next_statuses(from)
    }

    pub fn is_milestone(&self, status: OrderStatus) -> bool {
        self.registry.is_milestone(status)
    }

    pub fn category(&self, status: OrderStatus) -> StatusCategory {
        self.registry.category(status)
    }

    pub fn detailed_to_legacy(&self, status: OrderStatus) -> LegacyStatus {
        self.registry.to_legacy(status)
    }

    pub fn legacy_to_detailed(&self, value: &str) -> Result<OrderStatus> {
        self.registry.legacy_to_detailed(value)
    }

    pub async fn create_order(&self, order_id: u32, customer_id: u32) -> Result<Order> {
        let order = Order::new(order_id, customer_id, Utc::now());
        self.orders.insert(order.clone()).await?;
        info!(order_id, "order registered");
        Ok(order)
    }

    /// Creates an order at the canonical code of a legacy status value.
    pub async fn seed_from_legacy(
        &self,
        order_id: u32,
        customer_id: u32,
        legacy_value: &str,
    ) -> Result<Order> {
        let status = self.legacy_to_detailed(legacy_value)?;
        let order = Order::seeded(order_id, customer_id, status, Utc::now());
        self.orders.insert(order.clone()).await?;
        info!(order_id, %status, legacy = legacy_value, "order seeded from legacy status");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: u32) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.orders.all().await
    }

    pub async fn advance(&self, order_id: u32, to: OrderStatus) -> Result<Order> {
        let _guard = self.lock_order(order_id).await;
        let transition = self.apply(order_id, to, None).await?;
        Ok(transition.after)
    }

    /// Moves the order to PAYMENT_AUTHORIZED and links the approved attempt.
    /// The caller must hold the order lock.
    pub(crate) async fn authorize_payment(
        &self,
        order_id: u32,
        attempt_id: u64,
    ) -> Result<Transition> {
        self.apply(order_id, OrderStatus::PaymentAuthorized, Some(attempt_id))
            .await
    }

    /// Puts back the order state from before `transition`, under a new
    /// version. Used when the decision that justified a payment
    /// authorization could not be recorded. The caller must hold the order
    /// lock.
    pub(crate) async fn undo(&self, transition: &Transition) -> Result<Order> {
        let order_id = transition.after.id;
        let mut restored = transition.before.clone();
        restored.version = transition.after.version + 1;
        if !self
            .orders
            .compare_and_swap(transition.after.version, restored.clone())
            .await?
        {
            error!(order_id, "order changed before a failed authorization could be undone");
            return Err(PaymentError::ConcurrencyConflict { order_id });
        }
        warn!(
            order_id,
            from = %transition.after.current_status,
            to = %restored.current_status,
            "payment authorization undone"
        );
        Ok(restored)
    }

    async fn apply(
        &self,
        order_id: u32,
        to: OrderStatus,
        attempt_id: Option<u64>,
    ) -> Result<Transition> {
        let current = self.get_order(order_id).await?;
        let mut next = match current.advanced(&self.registry, to, Utc::now()) {
            Ok(next) => next,
            Err(err) => {
                warn!(order_id, from = %current.current_status, %to, "transition rejected");
                return Err(err);
            }
        };
        if attempt_id.is_some() {
            next.payment_attempt_id = attempt_id;
        }

        if !self.orders.compare_and_swap(current.version, next.clone()).await? {
            warn!(order_id, %to, "lost concurrent update on order");
            return Err(PaymentError::ConcurrencyConflict { order_id });
        }
        info!(
            order_id,
            from = %current.current_status,
            %to,
            milestone = self.registry.is_milestone(to),
            "order status advanced"
        );
        Ok(Transition {
            before: current,
            after: next,
        })
    }
}
