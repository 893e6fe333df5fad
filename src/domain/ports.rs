use super::attempt::{DecisionAudit, PaymentAttempt};
use super::order::Order;
use crate::error::Result;
use async_trait::async_trait;

/// Append-only ledger of payment attempts.
///
/// Implementations must evaluate the ledger rules in
/// [`crate::domain::attempt`] inside the same critical section as the write,
/// so that concurrent callers cannot both pass a check.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Assigns the next id to `attempt` and records it, unless
    /// [`check_new_attempt`](crate::domain::attempt::check_new_attempt) fails.
    async fn insert_new(&self, attempt: PaymentAttempt) -> Result<PaymentAttempt>;
    async fn get(&self, attempt_id: u64) -> Result<Option<PaymentAttempt>>;
    async fn all(&self) -> Result<Vec<PaymentAttempt>>;
    /// Compare-and-swap on the attempt status: replaces the stored attempt
    /// with `decided` only while the stored one is still undecided, and
    /// appends `audit` in the same step. `decided` must pass
    /// [`check_decision`](crate::domain::attempt::check_decision), so only
    /// the review fields of a row ever change.
    async fn decide(&self, decided: PaymentAttempt, audit: DecisionAudit) -> Result<()>;
    async fn audit_trail(&self, attempt_id: u64) -> Result<Vec<DecisionAudit>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: u32) -> Result<Option<Order>>;
    async fn all(&self) -> Result<Vec<Order>>;
    /// Stores `updated` only if the stored version still equals
    /// `expected_version`. Returns whether the swap happened.
    async fn compare_and_swap(&self, expected_version: u64, updated: Order) -> Result<bool>;
}

pub type AttemptStoreBox = Box<dyn AttemptStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;

pub type AttemptStoreFactory = Box<dyn Fn() -> AttemptStoreBox + Send + Sync>;
pub type OrderStoreFactory = Box<dyn Fn() -> OrderStoreBox + Send + Sync>;
