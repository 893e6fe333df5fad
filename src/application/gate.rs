use crate::domain::attempt::{AttemptRequest, PaymentAttempt};
use crate::domain::money::{Amount, Currency};
use crate::domain::policy::SecurityPolicy;
use crate::domain::ports::AttemptStore;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Validates checkout submissions and writes them to the ledger with the
/// status the security policy assigns to their payment method.
pub struct SecurityPolicyGate {
    policy: SecurityPolicy,
    attempts: Arc<dyn AttemptStore>,
}

impl SecurityPolicyGate {
    pub fn new(policy: SecurityPolicy, attempts: Arc<dyn AttemptStore>) -> Self {
        Self { policy, attempts }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Builds the stamped, not yet persisted attempt. The id is assigned by
    /// the store.
    pub fn stamp(&self, request: AttemptRequest, at: DateTime<Utc>) -> Result<PaymentAttempt> {
        let amount = Amount::new(request.amount)?;
        let currency = Currency::new(&request.currency)?;
        request.payload.validate()?;

        let method = request.payload.method();
        Ok(PaymentAttempt {
            id: 0,
            order_id: request.order_id,
            customer_id: request.customer_id,
            method,
            amount,
            currency,
            payload: request.payload,
            status: self.policy.initial_status(method),
            created_at: at,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            admin_notes: None,
            manual_override: false,
        })
    }

    /// Validates, stamps and records a new attempt exactly once.
    pub async fn submit(&self, request: AttemptRequest) -> Result<PaymentAttempt> {
        let attempt = self.stamp(request, Utc::now())?;
        let attempt = self.attempts.insert_new(attempt).await?;
        info!(
            attempt_id = attempt.id,
            order_id = attempt.order_id,
            method = %attempt.method,
            status = %attempt.status,
            "payment attempt recorded"
        );
        Ok(attempt)
    }
}
