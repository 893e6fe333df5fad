use crate::domain::attempt::AttemptStatus;
use crate::domain::ports::AttemptStore;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsPeriod {
    #[default]
    All,
    Today,
    Last7Days,
    Last30Days,
}

impl StatsPeriod {
    /// Earliest `created_at` counted for this period.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            StatsPeriod::All => None,
            StatsPeriod::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            StatsPeriod::Last7Days => Some(now - Duration::days(7)),
            StatsPeriod::Last30Days => Some(now - Duration::days(30)),
        }
    }
}

impl FromStr for StatsPeriod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(StatsPeriod::All),
            "today" => Ok(StatsPeriod::Today),
            "7d" => Ok(StatsPeriod::Last7Days),
            "30d" => Ok(StatsPeriod::Last30Days),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown stats period '{other}'"
            ))),
        }
    }
}

/// Attempt counts by review outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptStats {
    pub total: u64,
    pub pending: u64,
    pub rejected: u64,
    pub approved: u64,
}

impl AttemptStats {
    pub fn tally(&mut self, status: AttemptStatus) {
        self.total += 1;
        match status {
            AttemptStatus::PendingReview | AttemptStatus::PendingRejection => self.pending += 1,
            AttemptStatus::Verified | AttemptStatus::ManuallyApproved => self.approved += 1,
            AttemptStatus::Rejected => self.rejected += 1,
        }
    }
}

/// Full-scan aggregation over the ledger.
pub struct StatsAggregator {
    attempts: Arc<dyn AttemptStore>,
}

impl StatsAggregator {
    pub fn new(attempts: Arc<dyn AttemptStore>) -> Self {
        Self { attempts }
    }

    pub async fn get_stats(&self, period: StatsPeriod) -> Result<AttemptStats> {
        let since = period.since(Utc::now());
        Ok(self
            .attempts
            .all()
            .await?
            .iter()
            .filter(|a| since.is_none_or(|since| a.created_at >= since))
            .fold(AttemptStats::default(), |mut stats, a| {
                stats.tally(a.status);
                stats
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::fixtures::{attempt, card_payload, paypal_payload};
    use crate::infrastructure::in_memory::InMemoryAttemptStore;

    #[tokio::test]
    async fn test_counts_by_outcome() {
        let store = Arc::new(InMemoryAttemptStore::new());
        let rows = [
            (1, AttemptStatus::PendingRejection),
            (2, AttemptStatus::PendingReview),
            (3, AttemptStatus::Verified),
            (4, AttemptStatus::ManuallyApproved),
            (5, AttemptStatus::Rejected),
        ];
        for (order_id, status) in rows {
            store
                .insert_new(attempt(0, order_id, paypal_payload(), status))
                .await
                .unwrap();
        }
        let stats = StatsAggregator::new(store)
            .get_stats(StatsPeriod::All)
            .await
            .unwrap();
        assert_eq!(
            stats,
            AttemptStats {
                total: 5,
                pending: 2,
                rejected: 1,
                approved: 2
            }
        );
    }

    #[tokio::test]
    async fn test_period_excludes_old_attempts() {
        let store = Arc::new(InMemoryAttemptStore::new());
        let mut old = attempt(0, 1, card_payload(), AttemptStatus::Rejected);
        old.created_at = Utc::now() - Duration::days(45);
        store.insert_new(old).await.unwrap();
        store
            .insert_new(attempt(0, 2, card_payload(), AttemptStatus::PendingRejection))
            .await
            .unwrap();

        let aggregator = StatsAggregator::new(store);
        assert_eq!(aggregator.get_stats(StatsPeriod::All).await.unwrap().total, 2);
        let recent = aggregator.get_stats(StatsPeriod::Last30Days).await.unwrap();
        assert_eq!(recent.total, 1);
        assert_eq!(recent.pending, 1);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("7d".parse::<StatsPeriod>().unwrap(), StatsPeriod::Last7Days);
        assert!("week".parse::<StatsPeriod>().is_err());
        let now = Utc::now();
        assert!(StatsPeriod::Today.since(now).unwrap() <= now);
        assert!(StatsPeriod::All.since(now).is_none());
    }
}
