use super::fulfillment::{OrderStateMachine, Transition};
use crate::domain::attempt::{DecisionAudit, PaymentAttempt};
use crate::domain::order::Order;
use crate::domain::ports::AttemptStore;
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

/// Result of a successful approval: the decided attempt and the order after
/// it moved to PAYMENT_AUTHORIZED.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub attempt: PaymentAttempt,
    pub order: Order,
}

/// Applies admin decisions to pending attempts, exactly once per attempt.
pub struct ReviewDecisionEngine {
    attempts: Arc<dyn AttemptStore>,
    fulfillment: Arc<OrderStateMachine>,
    advance_retries: u32,
}

impl ReviewDecisionEngine {
    pub fn new(
        attempts: Arc<dyn AttemptStore>,
        fulfillment: Arc<OrderStateMachine>,
        advance_retries: u32,
    ) -> Self {
        Self {
            attempts,
            fulfillment,
            advance_retries,
        }
    }

    async fn load(&self, attempt_id: u64) -> Result<PaymentAttempt> {
        self.attempts
            .get(attempt_id)
            .await?
            .ok_or(PaymentError::AttemptNotFound(attempt_id))
    }

    /// Loads the attempt again after taking its order's lock, so every
    /// decision on that order sees the ledger as the previous one left it.
    async fn load_locked(&self, attempt_id: u64) -> Result<(OwnedMutexGuard<()>, PaymentAttempt)> {
        let order_id = self.load(attempt_id).await?.order_id;
        let guard = self.fulfillment.lock_order(order_id).await;
        Ok((guard, self.load(attempt_id).await?))
    }

    /// Approves a pending attempt and authorizes payment on its order.
    ///
    /// The order is moved to PAYMENT_AUTHORIZED before the decision is
    /// recorded. If the order cannot take a payment the attempt stays
    /// pending and the error is returned. If the decision then fails to
    /// record, the authorization is undone. An `Ok` therefore means both
    /// writes happened, and an `Err` means neither did.
    pub async fn approve(
        &self,
        attempt_id: u64,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<Approval> {
        let (_guard, attempt) = self.load_locked(attempt_id).await?;
        let decided = attempt.approved(reviewer, notes, Utc::now())?;

        let transition = self.authorize_order(&decided).await?;
        if let Err(err) = self.record(&attempt, decided.clone()).await {
            self.fulfillment.undo(&transition).await?;
            return Err(err);
        }
        Ok(Approval {
            attempt: decided,
            order: transition.after,
        })
    }

    /// Rejects a pending attempt. The linked order is left where it is.
    pub async fn reject(
        &self,
        attempt_id: u64,
        reviewer: &str,
        reason: &str,
        notes: Option<String>,
    ) -> Result<PaymentAttempt> {
        let (_guard, attempt) = self.load_locked(attempt_id).await?;
        let decided = attempt.rejected(reviewer, reason, notes, Utc::now())?;
        self.record(&attempt, decided.clone()).await?;
        Ok(decided)
    }

    async fn record(&self, previous: &PaymentAttempt, decided: PaymentAttempt) -> Result<()> {
        let audit = DecisionAudit::between(previous, &decided);
        if let Err(err) = self.attempts.decide(decided.clone(), audit).await {
            if let PaymentError::AlreadyDecided { status, .. } = &err {
                warn!(attempt_id = decided.id, %status, "decision lost to an earlier reviewer");
            }
            return Err(err);
        }
        info!(
            attempt_id = decided.id,
            order_id = decided.order_id,
            decision = %decided.status,
            reviewer = decided.reviewed_by.as_deref().unwrap_or_default(),
            manual_override = decided.manual_override,
            "payment decision recorded"
        );
        Ok(())
    }

    /// Retries only lost races; nothing has been recorded yet, so giving up
    /// leaves the attempt pending.
    async fn authorize_order(&self, decided: &PaymentAttempt) -> Result<Transition> {
        let mut attempt_no = 0;
        loop {
            match self
                .fulfillment
                .authorize_payment(decided.order_id, decided.id)
                .await
            {
                Err(err) if err.is_retryable() && attempt_no < self.advance_retries => {
                    attempt_no += 1;
                    debug!(order_id = decided.order_id, attempt_no, "retrying payment authorization");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::fixtures::{attempt, card_payload, paypal_payload};
    use crate::domain::attempt::AttemptStatus;
    use crate::domain::ports::OrderStore;
    use crate::domain::registry::StatusRegistry;
    use crate::domain::status::OrderStatus;
    use crate::infrastructure::in_memory::{InMemoryAttemptStore, InMemoryOrderStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Cancels the order behind the reader's back right after the first read.
    struct CancelAfterFirstRead {
        inner: InMemoryOrderStore,
        registry: StatusRegistry,
        fired: AtomicBool,
    }

    #[async_trait]
    impl OrderStore for CancelAfterFirstRead {
        async fn insert(&self, order: Order) -> Result<()> {
            self.inner.insert(order).await
        }

        async fn get(&self, order_id: u32) -> Result<Option<Order>> {
            let order = self.inner.get(order_id).await?;
            if let Some(seen) = &order {
                if !self.fired.swap(true, Ordering::SeqCst) {
                    let cancelled =
                        seen.advanced(&self.registry, OrderStatus::Cancelled, Utc::now())?;
                    self.inner.compare_and_swap(seen.version, cancelled).await?;
                }
            }
            Ok(order)
        }

        async fn all(&self) -> Result<Vec<Order>> {
            self.inner.all().await
        }

        async fn compare_and_swap(&self, expected_version: u64, updated: Order) -> Result<bool> {
            self.inner.compare_and_swap(expected_version, updated).await
        }
    }

    /// Every compare-and-swap loses.
    struct AlwaysStale {
        inner: InMemoryOrderStore,
        swaps: AtomicU32,
    }

    #[async_trait]
    impl OrderStore for AlwaysStale {
        async fn insert(&self, order: Order) -> Result<()> {
            self.inner.insert(order).await
        }

        async fn get(&self, order_id: u32) -> Result<Option<Order>> {
            self.inner.get(order_id).await
        }

        async fn all(&self) -> Result<Vec<Order>> {
            self.inner.all().await
        }

        async fn compare_and_swap(&self, _expected_version: u64, _updated: Order) -> Result<bool> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    /// A ledger whose decision writes fail.
    struct BrokenLedger {
        inner: InMemoryAttemptStore,
    }

    #[async_trait]
    impl AttemptStore for BrokenLedger {
        async fn insert_new(&self, attempt: PaymentAttempt) -> Result<PaymentAttempt> {
            self.inner.insert_new(attempt).await
        }

        async fn get(&self, attempt_id: u64) -> Result<Option<PaymentAttempt>> {
            self.inner.get(attempt_id).await
        }

        async fn all(&self) -> Result<Vec<PaymentAttempt>> {
            self.inner.all().await
        }

        async fn decide(&self, _decided: PaymentAttempt, _audit: DecisionAudit) -> Result<()> {
            Err(PaymentError::InternalError(Box::new(std::io::Error::other(
                "ledger unavailable",
            ))))
        }

        async fn audit_trail(&self, attempt_id: u64) -> Result<Vec<DecisionAudit>> {
            self.inner.audit_trail(attempt_id).await
        }
    }

    async fn engine_over(
        attempts: Arc<dyn AttemptStore>,
        orders: Arc<dyn OrderStore>,
    ) -> (ReviewDecisionEngine, Arc<OrderStateMachine>) {
        let fulfillment = Arc::new(OrderStateMachine::new(
            Arc::new(StatusRegistry::standard().unwrap()),
            orders,
        ));
        fulfillment.create_order(1, 7).await.unwrap();
        (
            ReviewDecisionEngine::new(attempts, fulfillment.clone(), 3),
            fulfillment,
        )
    }

    async fn setup() -> (ReviewDecisionEngine, Arc<OrderStateMachine>, Arc<InMemoryAttemptStore>) {
        let attempts = Arc::new(InMemoryAttemptStore::new());
        let fulfillment = Arc::new(OrderStateMachine::new(
            Arc::new(StatusRegistry::standard().unwrap()),
            Arc::new(InMemoryOrderStore::new()),
        ));
        fulfillment.create_order(10, 7).await.unwrap();
        let engine = ReviewDecisionEngine::new(attempts.clone(), fulfillment.clone(), 3);
        (engine, fulfillment, attempts)
    }

    #[tokio::test]
    async fn test_approve_paypal_authorizes_order() {
        let (engine, fulfillment, attempts) = setup().await;
        let pending = attempts
            .insert_new(attempt(0, 10, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();

        let approval = engine.approve(pending.id, "admin1", None).await.unwrap();
        assert_eq!(approval.attempt.status, AttemptStatus::Verified);
        assert_eq!(approval.order.current_status, OrderStatus::PaymentAuthorized);
        assert_eq!(approval.order.payment_attempt_id, Some(pending.id));

        let order = fulfillment.get_order(10).await.unwrap();
        assert_eq!(order.current_status, OrderStatus::PaymentAuthorized);
    }

    #[tokio::test]
    async fn test_approve_card_sets_manual_override() {
        let (engine, _, attempts) = setup().await;
        let pending = attempts
            .insert_new(attempt(0, 10, card_payload(), AttemptStatus::PendingRejection))
            .await
            .unwrap();
        let approval = engine.approve(pending.id, "admin1", None).await.unwrap();
        assert_eq!(approval.attempt.status, AttemptStatus::ManuallyApproved);
        assert!(approval.attempt.manual_override);
    }

    #[tokio::test]
    async fn test_reject_then_approve_is_already_decided() {
        let (engine, fulfillment, attempts) = setup().await;
        let pending = attempts
            .insert_new(attempt(0, 10, card_payload(), AttemptStatus::PendingRejection))
            .await
            .unwrap();

        let rejected = engine
            .reject(pending.id, "admin1", "card declined", None)
            .await
            .unwrap();
        let result = engine.approve(pending.id, "admin2", None).await;
        assert!(matches!(
            result,
            Err(PaymentError::AlreadyDecided { status: AttemptStatus::Rejected, .. })
        ));
        let stored = attempts.get(pending.id).await.unwrap().unwrap();
        assert_eq!(stored.reviewed_by.as_deref(), Some("admin1"));
        assert_eq!(stored.reviewed_at, rejected.reviewed_at);

        // rejection does not move the order
        let order = fulfillment.get_order(10).await.unwrap();
        assert_eq!(order.current_status, OrderStatus::OrderReceived);
    }

    #[tokio::test]
    async fn test_approve_for_cancelled_order_keeps_attempt_pending() {
        let (engine, fulfillment, attempts) = setup().await;
        fulfillment.advance(10, OrderStatus::Cancelled).await.unwrap();
        let pending = attempts
            .insert_new(attempt(0, 10, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();
        assert!(matches!(
            engine.approve(pending.id, "admin1", None).await,
            Err(PaymentError::InvalidTransition { from: OrderStatus::Cancelled, .. })
        ));
        let stored = attempts.get(pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_unknown_attempt() {
        let (engine, _, _) = setup().await;
        assert!(matches!(
            engine.reject(404, "admin1", "fraud", None).await,
            Err(PaymentError::AttemptNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_order_cancelled_mid_approval_leaves_attempt_pending() {
        let attempts = Arc::new(InMemoryAttemptStore::new());
        let orders = Arc::new(CancelAfterFirstRead {
            inner: InMemoryOrderStore::new(),
            registry: StatusRegistry::standard().unwrap(),
            fired: AtomicBool::new(false),
        });
        let (engine, fulfillment) = engine_over(attempts.clone(), orders).await;
        let pending = attempts
            .insert_new(attempt(0, 1, card_payload(), AttemptStatus::PendingRejection))
            .await
            .unwrap();

        let result = engine.approve(pending.id, "admin1", None).await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::PaymentAuthorized
            })
        ));

        let stored = attempts.get(pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::PendingRejection);
        assert!(!stored.manual_override);
        assert!(attempts.audit_trail(pending.id).await.unwrap().is_empty());
        let order = fulfillment.get_order(1).await.unwrap();
        assert_eq!(order.current_status, OrderStatus::Cancelled);
        assert_eq!(order.payment_attempt_id, None);
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_nothing() {
        let attempts = Arc::new(InMemoryAttemptStore::new());
        let orders = Arc::new(AlwaysStale {
            inner: InMemoryOrderStore::new(),
            swaps: AtomicU32::new(0),
        });
        let (engine, _) = engine_over(attempts.clone(), orders.clone()).await;
        let pending = attempts
            .insert_new(attempt(0, 1, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();

        assert!(matches!(
            engine.approve(pending.id, "admin1", None).await,
            Err(PaymentError::ConcurrencyConflict { order_id: 1 })
        ));
        // first try plus three retries
        assert_eq!(orders.swaps.load(Ordering::SeqCst), 4);
        let stored = attempts.get(pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::PendingReview);
        assert!(attempts.audit_trail(pending.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_decision_undoes_authorization() {
        let ledger = Arc::new(BrokenLedger {
            inner: InMemoryAttemptStore::new(),
        });
        let (engine, fulfillment) =
            engine_over(ledger.clone(), Arc::new(InMemoryOrderStore::new())).await;
        let pending = ledger
            .insert_new(attempt(0, 1, paypal_payload(), AttemptStatus::PendingReview))
            .await
            .unwrap();

        assert!(matches!(
            engine.approve(pending.id, "admin1", None).await,
            Err(PaymentError::InternalError(_))
        ));
        let order = fulfillment.get_order(1).await.unwrap();
        assert_eq!(order.current_status, OrderStatus::OrderReceived);
        assert_eq!(order.payment_attempt_id, None);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(
            ledger.get(pending.id).await.unwrap().unwrap().status,
            AttemptStatus::PendingReview
        );
    }
}
