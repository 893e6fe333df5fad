use crate::application::engine::PaymentEngine;
use crate::domain::attempt::{AttemptRequest, MethodPayload, PaymentMethod};
use crate::domain::status::OrderStatus;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Order,
    LegacyOrder,
    Submit,
    Approve,
    Reject,
    Advance,
}

/// One raw row of a command file. Which columns are required depends on
/// `type`; see [`Command::try_from`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub order: Option<u32>,
    pub customer: Option<u32>,
    pub attempt: Option<u64>,
    pub method: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub payload: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    CreateOrder {
        order_id: u32,
        customer_id: u32,
    },
    SeedLegacyOrder {
        order_id: u32,
        customer_id: u32,
        legacy: String,
    },
    Submit(AttemptRequest),
    Approve {
        attempt_id: u64,
        reviewer: String,
        notes: Option<String>,
    },
    Reject {
        attempt_id: u64,
        reviewer: String,
        reason: String,
        notes: Option<String>,
    },
    Advance {
        order_id: u32,
        to: OrderStatus,
    },
}

fn required<T>(value: Option<T>, column: &str) -> Result<T> {
    value.ok_or_else(|| PaymentError::ValidationError(format!("Missing '{column}' column")))
}

/// Parses `key=value;key=value` into the payload for `method`. Absent keys
/// become empty fields and are caught by payload validation.
pub fn parse_payload(method: PaymentMethod, raw: &str) -> Result<MethodPayload> {
    let mut fields = HashMap::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            PaymentError::ValidationError(format!("Malformed payload field '{pair}'"))
        })?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let payload = match method {
        PaymentMethod::Card => MethodPayload::Card {
            token: take("token"),
            brand: take("brand"),
            last4: take("last4"),
            expiry: take("expiry"),
        },
        PaymentMethod::Paypal => MethodPayload::Paypal {
            email: take("email"),
            transaction_id: take("transaction_id"),
        },
        PaymentMethod::Crypto => MethodPayload::Crypto {
            address: take("address"),
            tx_id: take("tx_id"),
            chain: take("chain"),
        },
        PaymentMethod::Bank => MethodPayload::Bank {
            account: take("account"),
            swift: take("swift"),
            proof_reference: take("proof_reference"),
        },
    };

    if let Some(unknown) = fields.keys().next() {
        return Err(PaymentError::ValidationError(format!(
            "Unknown {method} payload field '{unknown}'"
        )));
    }
    Ok(payload)
}

impl TryFrom<CommandRecord> for Command {
    type Error = PaymentError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        match record.r#type {
            CommandType::Order => Ok(Command::CreateOrder {
                order_id: required(record.order, "order")?,
                customer_id: required(record.customer, "customer")?,
            }),
            CommandType::LegacyOrder => Ok(Command::SeedLegacyOrder {
                order_id: required(record.order, "order")?,
                customer_id: required(record.customer, "customer")?,
                legacy: required(record.status, "status")?,
            }),
            CommandType::Submit => {
                let method: PaymentMethod = required(record.method, "method")?.parse()?;
                Ok(Command::Submit(AttemptRequest {
                    order_id: required(record.order, "order")?,
                    customer_id: required(record.customer, "customer")?,
                    amount: required(record.amount, "amount")?,
                    currency: required(record.currency, "currency")?,
                    payload: parse_payload(method, record.payload.as_deref().unwrap_or_default())?,
                }))
            }
            CommandType::Approve => Ok(Command::Approve {
                attempt_id: required(record.attempt, "attempt")?,
                reviewer: required(record.actor, "actor")?,
                notes: record.notes,
            }),
            CommandType::Reject => Ok(Command::Reject {
                attempt_id: required(record.attempt, "attempt")?,
                reviewer: required(record.actor, "actor")?,
                reason: required(record.reason, "reason")?,
                notes: record.notes,
            }),
            CommandType::Advance => Ok(Command::Advance {
                order_id: required(record.order, "order")?,
                to: required(record.status, "status")?.parse()?,
            }),
        }
    }
}

impl Command {
    pub async fn execute(self, engine: &PaymentEngine) -> Result<()> {
        match self {
            Command::CreateOrder {
                order_id,
                customer_id,
            } => {
                engine.create_order(order_id, customer_id).await?;
            }
            Command::SeedLegacyOrder {
                order_id,
                customer_id,
                legacy,
            } => {
                engine
                    .seed_order_from_legacy(order_id, customer_id, &legacy)
                    .await?;
            }
            Command::Submit(request) => {
                engine.submit_attempt(request).await?;
            }
            Command::Approve {
                attempt_id,
                reviewer,
                notes: Some(notes),
            } => {
                engine
                    .approve_with_notes(attempt_id, &reviewer, &notes)
                    .await?;
            }
            Command::Approve {
                attempt_id,
                reviewer,
                notes: None,
            } => {
                engine.approve(attempt_id, &reviewer).await?;
            }
            Command::Reject {
                attempt_id,
                reviewer,
                reason,
                notes: Some(notes),
            } => {
                engine
                    .reject_with_notes(attempt_id, &reviewer, &reason, &notes)
                    .await?;
            }
            Command::Reject {
                attempt_id,
                reviewer,
                reason,
                notes: None,
            } => {
                engine.reject(attempt_id, &reviewer, &reason).await?;
            }
            Command::Advance { order_id, to } => {
                engine.advance_status(order_id, to).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card_payload() {
        let payload = parse_payload(
            PaymentMethod::Card,
            "token=tok_1; brand=visa;last4=4242;expiry=01/29",
        )
        .unwrap();
        assert_eq!(
            payload,
            MethodPayload::Card {
                token: "tok_1".to_string(),
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                expiry: "01/29".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_payload_key_is_left_for_validation() {
        let payload = parse_payload(PaymentMethod::Paypal, "email=a@b.c").unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_unknown_or_malformed_payload_fields() {
        assert!(parse_payload(PaymentMethod::Bank, "iban=DE89").is_err());
        assert!(parse_payload(PaymentMethod::Bank, "account").is_err());
    }

    #[test]
    fn test_advance_requires_known_status() {
        let record = CommandRecord {
            r#type: CommandType::Advance,
            order: Some(1),
            customer: None,
            attempt: None,
            method: None,
            amount: None,
            currency: None,
            actor: None,
            reason: None,
            status: Some("SHIPPED_MAYBE".to_string()),
            payload: None,
            notes: None,
        };
        assert!(matches!(
            Command::try_from(record),
            Err(PaymentError::UnknownStatusCode(_))
        ));
    }

    #[test]
    fn test_notes_column_is_separate_from_reason() {
        let record = CommandRecord {
            r#type: CommandType::Reject,
            order: None,
            customer: None,
            attempt: Some(4),
            method: None,
            amount: None,
            currency: None,
            actor: Some("admin1".to_string()),
            reason: Some("card declined".to_string()),
            status: None,
            payload: None,
            notes: Some("customer notified".to_string()),
        };
        assert_eq!(
            Command::try_from(record).unwrap(),
            Command::Reject {
                attempt_id: 4,
                reviewer: "admin1".to_string(),
                reason: "card declined".to_string(),
                notes: Some("customer notified".to_string()),
            }
        );
    }
}
