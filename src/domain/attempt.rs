use super::money::{Amount, Currency};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Paypal,
    Crypto,
    Bank,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Card,
        PaymentMethod::Paypal,
        PaymentMethod::Crypto,
        PaymentMethod::Bank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Crypto => "crypto",
            PaymentMethod::Bank => "bank",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PaymentError::UnknownMethod(s.to_string()))
    }
}

/// Evidence captured by the gateway adapter for a single attempt.
///
/// Only presence of the required fields is checked; authenticity is the
/// gateway's concern.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum MethodPayload {
    Card {
        token: String,
        brand: String,
        last4: String,
        expiry: String,
    },
    Paypal {
        email: String,
        transaction_id: String,
    },
    Crypto {
        address: String,
        tx_id: String,
        chain: String,
    },
    Bank {
        account: String,
        swift: String,
        proof_reference: String,
    },
}

impl MethodPayload {
    pub fn method(&self) -> PaymentMethod {
        match self {
            MethodPayload::Card { .. } => PaymentMethod::Card,
            MethodPayload::Paypal { .. } => PaymentMethod::Paypal,
            MethodPayload::Crypto { .. } => PaymentMethod::Crypto,
            MethodPayload::Bank { .. } => PaymentMethod::Bank,
        }
    }

    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            MethodPayload::Card {
                token,
                brand,
                last4,
                expiry,
            } => vec![
                ("token", token.as_str()),
                ("brand", brand.as_str()),
                ("last4", last4.as_str()),
                ("expiry", expiry.as_str()),
            ],
            MethodPayload::Paypal {
                email,
                transaction_id,
            } => vec![("email", email.as_str()), ("transaction_id", transaction_id.as_str())],
            MethodPayload::Crypto {
                address,
                tx_id,
                chain,
            } => vec![("address", address.as_str()), ("tx_id", tx_id.as_str()), ("chain", chain.as_str())],
            MethodPayload::Bank {
                account,
                swift,
                proof_reference,
            } => vec![
                ("account", account.as_str()),
                ("swift", swift.as_str()),
                ("proof_reference", proof_reference.as_str()),
            ],
        }
    }

    /// Fails on the first required field that is blank.
    pub fn validate(&self) -> Result<(), PaymentError> {
        match self.fields().into_iter().find(|(_, v)| v.trim().is_empty()) {
            Some((name, _)) => Err(PaymentError::ValidationError(format!(
                "{} payload is missing '{name}'",
                self.method()
            ))),
            None => Ok(()),
        }
    }

    /// Fields an operator may type into the review queue search box.
    /// Card tokens are deliberately excluded.
    pub fn search_terms(&self) -> Vec<&str> {
        match self {
            MethodPayload::Card { brand, last4, .. } => vec![brand.as_str(), last4.as_str()],
            MethodPayload::Paypal {
                email,
                transaction_id,
            } => vec![email.as_str(), transaction_id.as_str()],
            MethodPayload::Crypto { address, tx_id, .. } => vec![address.as_str(), tx_id.as_str()],
            MethodPayload::Bank {
                account,
                proof_reference,
                ..
            } => vec![account.as_str(), proof_reference.as_str()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    PendingReview,
    PendingRejection,
    Verified,
    ManuallyApproved,
    Rejected,
}

impl AttemptStatus {
    pub const ALL: [AttemptStatus; 5] = [
        AttemptStatus::PendingReview,
        AttemptStatus::PendingRejection,
        AttemptStatus::Verified,
        AttemptStatus::ManuallyApproved,
        AttemptStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::PendingReview => "pending_review",
            AttemptStatus::PendingRejection => "pending_rejection",
            AttemptStatus::Verified => "verified",
            AttemptStatus::ManuallyApproved => "manually_approved",
            AttemptStatus::Rejected => "rejected",
        }
    }

    /// Awaiting a human decision.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            AttemptStatus::PendingReview | AttemptStatus::PendingRejection
        )
    }

    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Verified | AttemptStatus::ManuallyApproved
        )
    }

    pub fn is_decided(&self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PaymentError::UnknownStatusCode(s.to_string()))
    }
}

/// Checkout submission as handed over by the order management collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRequest {
    pub order_id: u32,
    pub customer_id: u32,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub payload: MethodPayload,
}

/// One row of the append-only payment attempt ledger.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentAttempt {
    pub id: u64,
    pub order_id: u32,
    pub customer_id: u32,
    pub method: PaymentMethod,
    pub amount: Amount,
    pub currency: Currency,
    pub payload: MethodPayload,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
    pub manual_override: bool,
}

impl PaymentAttempt {
    /// Returns the approved copy of this attempt.
    ///
    /// Card approvals bypass the default-deny stamp and are therefore flagged
    /// as a manual override.
    pub fn approved(
        &self,
        reviewer: &str,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        self.ensure_undecided()?;
        let mut next = self.clone();
        if self.method == PaymentMethod::Card {
            next.status = AttemptStatus::ManuallyApproved;
            next.manual_override = true;
        } else {
            next.status = AttemptStatus::Verified;
        }
        next.stamp_review(reviewer, notes, at)?;
        Ok(next)
    }

    /// Returns the rejected copy of this attempt. `reason` must not be blank.
    pub fn rejected(
        &self,
        reviewer: &str,
        reason: &str,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        self.ensure_undecided()?;
        if reason.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Rejection reason is required".to_string(),
            ));
        }
        let mut next = self.clone();
        next.status = AttemptStatus::Rejected;
        next.rejection_reason = Some(reason.trim().to_string());
        next.stamp_review(reviewer, notes, at)?;
        Ok(next)
    }

    fn ensure_undecided(&self) -> Result<(), PaymentError> {
        if self.status.is_decided() {
            return Err(PaymentError::AlreadyDecided {
                attempt_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    fn stamp_review(
        &mut self,
        reviewer: &str,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if reviewer.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Reviewer id is required".to_string(),
            ));
        }
        self.reviewed_by = Some(reviewer.trim().to_string());
        self.reviewed_at = Some(at);
        self.admin_notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    /// Whether `other` is the same submission, ignoring the review fields a
    /// decision is allowed to set.
    pub fn same_submission(&self, other: &PaymentAttempt) -> bool {
        self.id == other.id
            && self.order_id == other.order_id
            && self.customer_id == other.customer_id
            && self.method == other.method
            && self.amount == other.amount
            && self.currency == other.currency
            && self.payload == other.payload
            && self.created_at == other.created_at
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let ids = [
            self.id.to_string(),
            self.order_id.to_string(),
            self.customer_id.to_string(),
        ];
        ids.iter()
            .map(String::as_str)
            .chain(self.payload.search_terms())
            .any(|term| term.to_lowercase().contains(&needle))
    }
}

/// Audit record appended alongside every recorded decision.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DecisionAudit {
    pub attempt_id: u64,
    pub order_id: u32,
    pub reviewer: String,
    pub previous: AttemptStatus,
    pub decision: AttemptStatus,
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionAudit {
    pub fn between(previous: &PaymentAttempt, decided: &PaymentAttempt) -> Self {
        Self {
            attempt_id: decided.id,
            order_id: decided.order_id,
            reviewer: decided.reviewed_by.clone().unwrap_or_default(),
            previous: previous.status,
            decision: decided.status,
            reason: decided.rejection_reason.clone(),
            decided_at: decided.reviewed_at.unwrap_or(decided.created_at),
        }
    }
}

/// Ledger rule for a new attempt, evaluated against every attempt already
/// recorded. Stores call this while holding their write lock.
pub fn check_new_attempt<'a>(
    existing: impl IntoIterator<Item = &'a PaymentAttempt>,
    order_id: u32,
    method: PaymentMethod,
) -> Result<(), PaymentError> {
    for attempt in existing.into_iter().filter(|a| a.order_id == order_id) {
        if attempt.status.is_approved() {
            return Err(PaymentError::duplicate(
                order_id,
                attempt.method,
                "order already has an approved attempt",
            ));
        }
        if attempt.status.is_pending() && attempt.method == method {
            return Err(PaymentError::duplicate(
                order_id,
                method,
                "an undecided attempt already exists",
            ));
        }
    }
    Ok(())
}

/// Compare-and-swap rule for a decision: the stored attempt must still be
/// undecided, `decided` must carry a decided status and differ from it only
/// in review fields, and an approval must not create a second approved
/// attempt for the same order.
pub fn check_decision<'a>(
    existing: impl IntoIterator<Item = &'a PaymentAttempt>,
    current: &PaymentAttempt,
    decided: &PaymentAttempt,
) -> Result<(), PaymentError> {
    if current.status.is_decided() {
        return Err(PaymentError::AlreadyDecided {
            attempt_id: current.id,
            status: current.status,
        });
    }
    if !decided.status.is_decided() {
        return Err(PaymentError::ValidationError(format!(
            "Decision for attempt {} must be approved or rejected, got {}",
            current.id, decided.status
        )));
    }
    if !current.same_submission(decided) {
        return Err(PaymentError::ValidationError(format!(
            "Decision for attempt {} may only change review fields",
            current.id
        )));
    }
    if decided.status.is_approved()
        && existing
            .into_iter()
            .any(|a| a.order_id == current.order_id && a.id != current.id && a.status.is_approved())
    {
        return Err(PaymentError::duplicate(
            current.order_id,
            current.method,
            "order already has an approved attempt",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn card_payload() -> MethodPayload {
        MethodPayload::Card {
            token: "tok_visa_4242".to_string(),
            brand: "visa".to_string(),
            last4: "4242".to_string(),
            expiry: "12/28".to_string(),
        }
    }

    pub fn paypal_payload() -> MethodPayload {
        MethodPayload::Paypal {
            email: "buyer@example.com".to_string(),
            transaction_id: "PP-7781".to_string(),
        }
    }

    pub fn attempt(id: u64, order_id: u32, payload: MethodPayload, status: AttemptStatus) -> PaymentAttempt {
        PaymentAttempt {
            id,
            order_id,
            customer_id: 7,
            method: payload.method(),
            amount: Amount::new(dec!(120.00)).unwrap(),
            currency: Currency::new("USD").unwrap(),
            payload,
            status,
            created_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            admin_notes: None,
            manual_override: false,
        }
    }
}
