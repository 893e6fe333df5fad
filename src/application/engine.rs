use super::fulfillment::OrderStateMachine;
use super::gate::SecurityPolicyGate;
use super::queue::{Page, QueueFilter, VerificationQueue};
use super::review::{Approval, ReviewDecisionEngine};
use super::stats::{AttemptStats, StatsAggregator, StatsPeriod};
use crate::config::Config;
use crate::domain::attempt::{AttemptRequest, DecisionAudit, PaymentAttempt};
use crate::domain::order::Order;
use crate::domain::ports::{AttemptStore, AttemptStoreBox, OrderStoreBox};
use crate::domain::registry::StatusRegistry;
use crate::domain::status::{LegacyStatus, OrderStatus, StatusCategory};
use crate::error::{PaymentError, Result};
use std::sync::Arc;

/// The main entry point of the payment verification core.
///
/// `PaymentEngine` wires the security policy gate, verification queue,
/// review decision engine, order state machine and stats aggregator over a
/// pair of storage backends. It exposes the operations used by the admin
/// dashboard (queue, decisions, stats) and by order fulfillment (status
/// transitions and lookups).
pub struct PaymentEngine {
    attempts: Arc<dyn AttemptStore>,
    gate: SecurityPolicyGate,
    queue: VerificationQueue,
    review: ReviewDecisionEngine,
    fulfillment: Arc<OrderStateMachine>,
    stats: StatsAggregator,
    system_reviewer: String,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine`.
    ///
    /// Builds and validates the status registry; an inconsistent graph is
    /// reported here instead of on a later transition.
    ///
    /// # Arguments
    ///
    /// * `attempt_store` - The append-only payment attempt ledger.
    /// * `order_store` - The store for order status and history.
    /// * `config` - Policy, queue and review settings.
    pub fn new(
        attempt_store: AttemptStoreBox,
        order_store: OrderStoreBox,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(StatusRegistry::standard()?);
        let attempts: Arc<dyn AttemptStore> = Arc::from(attempt_store);
        let fulfillment = Arc::new(OrderStateMachine::new(registry, Arc::from(order_store)));

        Ok(Self {
            gate: SecurityPolicyGate::new(config.policy, attempts.clone()),
            queue: VerificationQueue::new(attempts.clone(), config.queue.page_size),
            review: ReviewDecisionEngine::new(
                attempts.clone(),
                fulfillment.clone(),
                config.review.advance_retries,
            ),
            stats: StatsAggregator::new(attempts.clone()),
            fulfillment,
            attempts,
            system_reviewer: config.review.system_reviewer.clone(),
        })
    }

    /// Checkout submission: validates and records a stamped attempt.
    pub async fn submit_attempt(&self, request: AttemptRequest) -> Result<PaymentAttempt> {
        self.gate.submit(request).await
    }

    pub async fn list_pending(&self, filter: &QueueFilter) -> Result<Page<PaymentAttempt>> {
        self.queue.list_pending(filter).await
    }

    pub async fn approve(&self, attempt_id: u64, reviewer: &str) -> Result<Approval> {
        self.review.approve(attempt_id, reviewer, None).await
    }

    pub async fn approve_with_notes(
        &self,
        attempt_id: u64,
        reviewer: &str,
        notes: &str,
    ) -> Result<Approval> {
        self.review
            .approve(attempt_id, reviewer, Some(notes.to_string()))
            .await
    }

    pub async fn reject(&self, attempt_id: u64, reviewer: &str, reason: &str) -> Result<PaymentAttempt> {
        self.review.reject(attempt_id, reviewer, reason, None).await
    }

    pub async fn reject_with_notes(
        &self,
        attempt_id: u64,
        reviewer: &str,
        reason: &str,
        notes: &str,
    ) -> Result<PaymentAttempt> {
        self.review
            .reject(attempt_id, reviewer, reason, Some(notes.to_string()))
            .await
    }

    /// Rejection issued by an automated sweep under the configured system
    /// reviewer id.
    pub async fn reject_as_system(&self, attempt_id: u64, reason: &str) -> Result<PaymentAttempt> {
        self.review
            .reject(attempt_id, &self.system_reviewer, reason, None)
            .await
    }

    pub async fn get_stats(&self, period: StatsPeriod) -> Result<AttemptStats> {
        self.stats.get_stats(period).await
    }

    pub async fn get_attempt(&self, attempt_id: u64) -> Result<PaymentAttempt> {
        self.attempts
            .get(attempt_id)
            .await?
            .ok_or(PaymentError::AttemptNotFound(attempt_id))
    }

    pub async fn attempts(&self) -> Result<Vec<PaymentAttempt>> {
        self.attempts.all().await
    }

    pub async fn audit_trail(&self, attempt_id: u64) -> Result<Vec<DecisionAudit>> {
        self.attempts.audit_trail(attempt_id).await
    }

    pub async fn create_order(&self, order_id: u32, customer_id: u32) -> Result<Order> {
        self.fulfillment.create_order(order_id, customer_id).await
    }

    pub async fn seed_order_from_legacy(
        &self,
        order_id: u32,
        customer_id: u32,
        legacy_value: &str,
    ) -> Result<Order> {
        self.fulfillment
            .seed_from_legacy(order_id, customer_id, legacy_value)
            .await
    }

    pub async fn advance_status(&self, order_id: u32, to: OrderStatus) -> Result<Order> {
        self.fulfillment.advance(order_id, to).await
    }

    pub async fn get_order(&self, order_id: u32) -> Result<Order> {
        self.fulfillment.get_order(order_id).await
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.fulfillment.orders().await
    }

    pub fn next_statuses(&self, from: OrderStatus) -> &'static [OrderStatus] {
        self.fulfillment.next_statuses(from)
    }

    pub fn can_transition_to(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.fulfillment.can_transition_to(from, to)
    }

    pub fn is_milestone(&self, status: OrderStatus) -> bool {
        self.fulfillment.is_milestone(status)
    }

    pub fn category(&self, status: OrderStatus) -> StatusCategory {
        self.fulfillment.category(status)
    }

    pub fn detailed_to_legacy(&self, status: OrderStatus) -> LegacyStatus {
        self.fulfillment.detailed_to_legacy(status)
    }

    pub fn legacy_to_detailed(&self, value: &str) -> Result<OrderStatus> {
        self.fulfillment.legacy_to_detailed(value)
    }

    pub fn registry(&self) -> &StatusRegistry {
        self.fulfillment.registry()
    }
}
