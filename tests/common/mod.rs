#![allow(dead_code)]

use payverify::application::engine::PaymentEngine;
use payverify::config::Config;
use payverify::domain::attempt::{AttemptRequest, MethodPayload};
use payverify::infrastructure::in_memory::{InMemoryAttemptStore, InMemoryOrderStore};
use rust_decimal::Decimal;
use std::io::{Error, Write};
use tempfile::NamedTempFile;

pub const HEADER: &str =
    "type, order, customer, attempt, method, amount, currency, actor, reason, status, payload, notes";

pub fn engine() -> PaymentEngine {
    engine_with(&Config::default())
}

pub fn engine_with(config: &Config) -> PaymentEngine {
    PaymentEngine::new(
        Box::new(InMemoryAttemptStore::new()),
        Box::new(InMemoryOrderStore::new()),
        config,
    )
    .expect("standard registry and default config are valid")
}

pub fn card() -> MethodPayload {
    MethodPayload::Card {
        token: "tok_visa_4242".to_string(),
        brand: "visa".to_string(),
        last4: "4242".to_string(),
        expiry: "12/28".to_string(),
    }
}

pub fn paypal() -> MethodPayload {
    MethodPayload::Paypal {
        email: "buyer@example.com".to_string(),
        transaction_id: "PP-7781".to_string(),
    }
}

pub fn bank() -> MethodPayload {
    MethodPayload::Bank {
        account: "DE89370400440532013000".to_string(),
        swift: "COBADEFFXXX".to_string(),
        proof_reference: "WIRE-0042".to_string(),
    }
}

pub fn request(order_id: u32, amount: Decimal, payload: MethodPayload) -> AttemptRequest {
    AttemptRequest {
        order_id,
        customer_id: 7,
        amount,
        currency: "USD".to_string(),
        payload,
    }
}

/// Writes `rows` under the command header into a temporary file.
pub fn command_file(rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(file)
}
