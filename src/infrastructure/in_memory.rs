use crate::domain::attempt::{DecisionAudit, PaymentAttempt, check_decision, check_new_attempt};
use crate::domain::order::Order;
use crate::domain::ports::{AttemptStore, OrderStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    attempts: BTreeMap<u64, PaymentAttempt>,
    audit: Vec<DecisionAudit>,
    next_id: u64,
}

/// A thread-safe in-memory payment attempt ledger.
///
/// A single write lock covers the rule check and the write, which is what
/// makes `insert_new` and `decide` atomic.
#[derive(Default, Clone)]
pub struct InMemoryAttemptStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryAttemptStore {
    /// Creates a new, empty in-memory attempt store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn insert_new(&self, mut attempt: PaymentAttempt) -> Result<PaymentAttempt> {
        let mut ledger = self.ledger.write().await;
        check_new_attempt(ledger.attempts.values(), attempt.order_id, attempt.method)?;
        ledger.next_id += 1;
        attempt.id = ledger.next_id;
        ledger.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn get(&self, attempt_id: u64) -> Result<Option<PaymentAttempt>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.attempts.get(&attempt_id).cloned())
    }

    async fn all(&self) -> Result<Vec<PaymentAttempt>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.attempts.values().cloned().collect())
    }

    async fn decide(&self, decided: PaymentAttempt, audit: DecisionAudit) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let current = ledger
            .attempts
            .get(&decided.id)
            .ok_or(PaymentError::AttemptNotFound(decided.id))?;
        check_decision(ledger.attempts.values(), current, &decided)?;
        ledger.attempts.insert(decided.id, decided);
        ledger.audit.push(audit);
        Ok(())
    }

    async fn audit_trail(&self, attempt_id: u64) -> Result<Vec<DecisionAudit>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .audit
            .iter()
            .filter(|record| record.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory order store with versioned compare-and-swap.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<u32, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(PaymentError::OrderExists(order.id));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: u32) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.id);
        Ok(all)
    }

    async fn compare_and_swap(&self, expected_version: u64, updated: Order) -> Result<bool> {
        let mut orders = self.orders.write().await;
        match orders.get(&updated.id) {
            Some(current) if current.version == expected_version => {
                orders.insert(updated.id, updated);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::OrderNotFound(updated.id)),
        }
    }
}
