//! Immutable order status registry.
//!
//! The registry is built once from a static table and validated before use:
//! every status is registered exactly once, every edge points at a registered
//! status, only terminal statuses are sinks, and the legacy mapping
//! round-trips for each canonical code. After construction it only exposes
//! read accessors.

use super::status::{LegacyStatus, OrderStatus, StatusCategory};
use crate::error::{PaymentError, Result};
use std::collections::HashMap;

use LegacyStatus as L;
use OrderStatus::*;
use StatusCategory as C;

/// One row of the registry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub category: StatusCategory,
    pub milestone: bool,
    pub legacy: LegacyStatus,
    pub next: &'static [OrderStatus],
}

const fn entry(
    status: OrderStatus,
    category: StatusCategory,
    milestone: bool,
    legacy: LegacyStatus,
    next: &'static [OrderStatus],
) -> StatusEntry {
    StatusEntry {
        status,
        category,
        milestone,
        legacy,
        next,
    }
}

pub const TERMINAL: [OrderStatus; 3] = [OrderCompleted, Cancelled, Returned];

pub const STATUS_TABLE: [StatusEntry; 27] = [
    entry(OrderReceived, C::PreShipment, true, L::Pending, &[PaymentAuthorized, Cancelled]),
    entry(PaymentAuthorized, C::PreShipment, false, L::Pending, &[OrderVerified, Cancelled]),
    entry(OrderVerified, C::PreShipment, false, L::Confirmed, &[OrderConfirmed, Cancelled]),
    entry(OrderConfirmed, C::PreShipment, true, L::Confirmed, &[Picking, Cancelled]),
    entry(Picking, C::Fulfillment, false, L::Processing, &[Packing, Cancelled]),
    entry(Packing, C::Fulfillment, false, L::Processing, &[QualityCheck, Cancelled]),
    entry(QualityCheck, C::Fulfillment, false, L::Processing, &[ReadyToShip, Cancelled]),
    entry(ReadyToShip, C::Fulfillment, true, L::Processing, &[LabelCreated, Cancelled]),
    entry(LabelCreated, C::Shipping, false, L::Shipped, &[PickedUpByCarrier]),
    entry(PickedUpByCarrier, C::Shipping, false, L::Shipped, &[Shipped]),
    entry(Shipped, C::Shipping, true, L::Shipped, &[InTransit, Delayed]),
    entry(
        InTransit,
        C::Shipping,
        false,
        L::Shipped,
        &[ArrivedAtHub, CustomsClearance, AtLocalFacility, Delayed, DamagedInTransit],
    ),
    entry(ArrivedAtHub, C::Shipping, false, L::Shipped, &[DepartedHub, Delayed]),
    entry(
        DepartedHub,
        C::Shipping,
        false,
        L::Shipped,
        &[CustomsClearance, AtLocalFacility, Delayed],
    ),
    entry(CustomsClearance, C::Shipping, false, L::Shipped, &[AtLocalFacility, Delayed]),
    entry(
        AtLocalFacility,
        C::Shipping,
        false,
        L::Shipped,
        &[OutForDelivery, Delayed, AddressIssue],
    ),
    entry(
        OutForDelivery,
        C::Shipping,
        true,
        L::Shipped,
        &[Delivered, DeliveryAttempted, AddressIssue, CustomerUnavailable],
    ),
    entry(
        DeliveryAttempted,
        C::Delivery,
        false,
        L::Shipped,
        &[OutForDelivery, CustomerUnavailable, Returned],
    ),
    entry(Delivered, C::Delivery, true, L::Delivered, &[OrderCompleted, ReturnRequested]),
    entry(OrderCompleted, C::Completion, true, L::Completed, &[]),
    entry(
        Delayed,
        C::Exception,
        false,
        L::Shipped,
        &[InTransit, AtLocalFacility, OutForDelivery],
    ),
    entry(
        AddressIssue,
        C::Exception,
        false,
        L::Shipped,
        &[OutForDelivery, AtLocalFacility, Returned],
    ),
    entry(
        CustomerUnavailable,
        C::Exception,
        false,
        L::Shipped,
        &[OutForDelivery, AtLocalFacility, Returned],
    ),
    entry(DamagedInTransit, C::Exception, false, L::Shipped, &[Returned]),
    entry(ReturnRequested, C::Exception, false, L::Delivered, &[Returned, OrderCompleted]),
    entry(Returned, C::Exception, true, L::Returned, &[]),
    entry(Cancelled, C::Exception, true, L::Cancelled, &[]),
];

/// Legacy value -> detailed code used when seeding migrated orders.
pub const LEGACY_CANONICAL: [(LegacyStatus, OrderStatus); 8] = [
    (L::Pending, OrderReceived),
    (L::Confirmed, OrderConfirmed),
    (L::Processing, Picking),
    (L::Shipped, Shipped),
    (L::Delivered, Delivered),
    (L::Completed, OrderCompleted),
    (L::Cancelled, Cancelled),
    (L::Returned, Returned),
];

#[derive(Debug, Clone)]
pub struct StatusRegistry {
    entries: HashMap<OrderStatus, StatusEntry>,
    canonical: HashMap<LegacyStatus, OrderStatus>,
}

impl StatusRegistry {
    /// Builds the registry from the built-in tables.
    pub fn standard() -> Result<Self> {
        Self::from_tables(&STATUS_TABLE, &LEGACY_CANONICAL)
    }

    pub fn from_tables(
        table: &[StatusEntry],
        canonical: &[(LegacyStatus, OrderStatus)],
    ) -> Result<Self> {
        let mut entries = HashMap::with_capacity(table.len());
        for row in table {
            if entries.insert(row.status, *row).is_some() {
                return Err(PaymentError::Registry(format!(
                    "{} is registered twice",
                    row.status
                )));
            }
        }

        for status in OrderStatus::ALL {
            if !entries.contains_key(&status) {
                return Err(PaymentError::Registry(format!("{status} is not registered")));
            }
        }

        for row in table {
            for (i, target) in row.next.iter().enumerate() {
                if !entries.contains_key(target) {
                    return Err(PaymentError::Registry(format!(
                        "{} -> {target} points at an unregistered status",
                        row.status
                    )));
                }
                if *target == row.status || row.next[..i].contains(target) {
                    return Err(PaymentError::Registry(format!(
                        "{} has a self or repeated edge to {target}",
                        row.status
                    )));
                }
            }
            let terminal = TERMINAL.contains(&row.status);
            if terminal && !row.next.is_empty() {
                return Err(PaymentError::Registry(format!(
                    "terminal status {} has outgoing transitions",
                    row.status
                )));
            }
            if !terminal && row.next.is_empty() {
                return Err(PaymentError::Registry(format!(
                    "{} is a dead end but not terminal",
                    row.status
                )));
            }
        }

        let mut canonical_map = HashMap::with_capacity(canonical.len());
        for (legacy, status) in canonical {
            let mapped_back = entries.get(status).map(|e| e.legacy);
            if mapped_back != Some(*legacy) {
                return Err(PaymentError::Registry(format!(
                    "canonical code {status} for '{legacy}' does not map back to it"
                )));
            }
            canonical_map.insert(*legacy, *status);
        }
        for legacy in LegacyStatus::ALL {
            if !canonical_map.contains_key(&legacy) {
                return Err(PaymentError::Registry(format!(
                    "legacy value '{legacy}' has no canonical code"
                )));
            }
        }

        Ok(Self {
            entries,
            canonical: canonical_map,
        })
    }

    fn entry(&self, status: OrderStatus) -> &StatusEntry {
        // Construction guarantees every variant is present.
        &self.entries[&status]
    }

    pub fn can_transition(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.entry(from).next.contains(&to)
    }

    pub fn next_statuses(&self, from: OrderStatus) -> &'static [OrderStatus] {
        self.entry(from).next
    }

    pub fn category(&self, status: OrderStatus) -> StatusCategory {
        self.entry(status).category
    }

    pub fn is_milestone(&self, status: OrderStatus) -> bool {
        self.entry(status).milestone
    }

    pub fn is_terminal(&self, status: OrderStatus) -> bool {
        self.entry(status).next.is_empty()
    }

    pub fn to_legacy(&self, status: OrderStatus) -> LegacyStatus {
        self.entry(status).legacy
    }

    pub fn canonical(&self, legacy: LegacyStatus) -> OrderStatus {
        self.canonical[&legacy]
    }

    /// Parses a legacy value and returns its canonical detailed code.
    pub fn legacy_to_detailed(&self, value: &str) -> Result<OrderStatus> {
        let legacy: LegacyStatus = value.parse()?;
        Ok(self.canonical(legacy))
    }

    pub fn statuses(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.values()
    }
}
