use crate::application::stats::AttemptStats;
use crate::domain::attempt::PaymentAttempt;
use crate::domain::order::Order;
use crate::domain::registry::StatusRegistry;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct AttemptRow<'a> {
    id: u64,
    order: u32,
    method: &'a str,
    amount: String,
    currency: &'a str,
    status: &'a str,
    reviewed_by: &'a str,
    manual_override: bool,
}

#[derive(Debug, Serialize)]
struct OrderRow {
    order: u32,
    status: &'static str,
    legacy: &'static str,
    category: &'static str,
    milestone: bool,
    transitions: usize,
}

/// Writes attempt, order and stats reports as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_attempts(&mut self, attempts: &[PaymentAttempt]) -> Result<()> {
        for attempt in attempts {
            self.writer.serialize(AttemptRow {
                id: attempt.id,
                order: attempt.order_id,
                method: attempt.method.as_str(),
                amount: attempt.amount.to_string(),
                currency: attempt.currency.code(),
                status: attempt.status.as_str(),
                reviewed_by: attempt.reviewed_by.as_deref().unwrap_or_default(),
                manual_override: attempt.manual_override,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_orders(&mut self, orders: &[Order], registry: &StatusRegistry) -> Result<()> {
        for order in orders {
            let status = order.current_status;
            self.writer.serialize(OrderRow {
                order: order.id,
                status: status.as_str(),
                legacy: registry.to_legacy(status).as_str(),
                category: registry.category(status).as_str(),
                milestone: registry.is_milestone(status),
                transitions: order.status_history.len().saturating_sub(1),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_stats(&mut self, stats: &AttemptStats) -> Result<()> {
        self.writer.serialize(stats)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::AttemptStatus;
    use crate::domain::attempt::fixtures::{attempt, card_payload};
    use chrono::Utc;

    #[test]
    fn test_attempt_report() {
        let pending = attempt(1, 10, card_payload(), AttemptStatus::PendingRejection);
        let approved = pending.approved("admin1", None, Utc::now()).unwrap();

        let mut out = Vec::new();
        ReportWriter::new(&mut out)
            .write_attempts(&[approved])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,order,method,amount,currency,status,reviewed_by,manual_override"));
        assert!(text.contains("1,10,card,120.00,USD,manually_approved,admin1,true"));
    }

    #[test]
    fn test_order_report() {
        let registry = StatusRegistry::standard().unwrap();
        let order = Order::new(3, 7, Utc::now());
        let mut out = Vec::new();
        ReportWriter::new(&mut out)
            .write_orders(&[order], &registry)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("order,status,legacy,category,milestone,transitions"));
        assert!(text.contains("3,ORDER_RECEIVED,pending,pre_shipment,true,0"));
    }

    #[test]
    fn test_stats_report() {
        let mut stats = AttemptStats::default();
        stats.tally(AttemptStatus::Rejected);
        let mut out = Vec::new();
        ReportWriter::new(&mut out).write_stats(&stats).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "total,pending,rejected,approved\n1,0,1,0\n");
    }
}
