//! Runtime configuration loaded from TOML.
//!
//! Every section is optional; a missing file or section yields the defaults,
//! which keep card attempts on the default-deny policy.

use crate::domain::policy::SecurityPolicy;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: SecurityPolicy,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Page size used when a queue filter does not set one.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Reviewer id recorded by automated sweeps (e.g. stale attempt expiry).
    #[serde(default = "default_system_reviewer")]
    pub system_reviewer: String,
    /// How many times the order advance after an approval is retried when it
    /// loses a race on the order.
    #[serde(default = "default_advance_retries")]
    pub advance_retries: u32,
}

fn default_page_size() -> usize {
    25
}

fn default_system_reviewer() -> String {
    "system".to_string()
}

fn default_advance_retries() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            system_reviewer: default_system_reviewer(),
            advance_retries: default_advance_retries(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| PaymentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        SecurityPolicy::new(self.policy.card_default)?;
        if self.queue.page_size == 0 || self.queue.page_size > MAX_PAGE_SIZE {
            return Err(PaymentError::Config(format!(
                "queue.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.review.system_reviewer.trim().is_empty() {
            return Err(PaymentError::Config(
                "review.system_reviewer must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
