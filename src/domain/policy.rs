use super::attempt::{AttemptStatus, PaymentMethod};
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

/// Initial status stamped on new attempts.
///
/// Card captures default to `pending_rejection`: they stay denied unless an
/// admin overrides them. Wallet, crypto and bank attempts carry external
/// evidence and start neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default = "default_card_status")]
    pub card_default: AttemptStatus,
}

fn default_card_status() -> AttemptStatus {
    AttemptStatus::PendingRejection
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            card_default: default_card_status(),
        }
    }
}

impl SecurityPolicy {
    pub fn new(card_default: AttemptStatus) -> Result<Self, PaymentError> {
        if !card_default.is_pending() {
            return Err(PaymentError::Config(format!(
                "card_default must be an undecided status, got '{card_default}'"
            )));
        }
        Ok(Self { card_default })
    }

    pub fn initial_status(&self, method: PaymentMethod) -> AttemptStatus {
        match method {
            PaymentMethod::Card => self.card_default,
            PaymentMethod::Paypal | PaymentMethod::Crypto | PaymentMethod::Bank => {
                AttemptStatus::PendingReview
            }
        }
    }
}
