use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every detailed fulfillment state an order can be in.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    OrderReceived,
    PaymentAuthorized,
    OrderVerified,
    OrderConfirmed,
    Picking,
    Packing,
    QualityCheck,
    ReadyToShip,
    LabelCreated,
    PickedUpByCarrier,
    Shipped,
    InTransit,
    ArrivedAtHub,
    DepartedHub,
    CustomsClearance,
    AtLocalFacility,
    OutForDelivery,
    DeliveryAttempted,
    Delivered,
    OrderCompleted,
    Delayed,
    AddressIssue,
    CustomerUnavailable,
    DamagedInTransit,
    ReturnRequested,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 27] = [
        OrderStatus::OrderReceived,
        OrderStatus::PaymentAuthorized,
        OrderStatus::OrderVerified,
        OrderStatus::OrderConfirmed,
        OrderStatus::Picking,
        OrderStatus::Packing,
        OrderStatus::QualityCheck,
        OrderStatus::ReadyToShip,
        OrderStatus::LabelCreated,
        OrderStatus::PickedUpByCarrier,
        OrderStatus::Shipped,
        OrderStatus::InTransit,
        OrderStatus::ArrivedAtHub,
        OrderStatus::DepartedHub,
        OrderStatus::CustomsClearance,
        OrderStatus::AtLocalFacility,
        OrderStatus::OutForDelivery,
        OrderStatus::DeliveryAttempted,
        OrderStatus::Delivered,
        OrderStatus::OrderCompleted,
        OrderStatus::Delayed,
        OrderStatus::AddressIssue,
        OrderStatus::CustomerUnavailable,
        OrderStatus::DamagedInTransit,
        OrderStatus::ReturnRequested,
        OrderStatus::Returned,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrderReceived => "ORDER_RECEIVED",
            OrderStatus::PaymentAuthorized => "PAYMENT_AUTHORIZED",
            OrderStatus::OrderVerified => "ORDER_VERIFIED",
            OrderStatus::OrderConfirmed => "ORDER_CONFIRMED",
            OrderStatus::Picking => "PICKING",
            OrderStatus::Packing => "PACKING",
            OrderStatus::QualityCheck => "QUALITY_CHECK",
            OrderStatus::ReadyToShip => "READY_TO_SHIP",
            OrderStatus::LabelCreated => "LABEL_CREATED",
            OrderStatus::PickedUpByCarrier => "PICKED_UP_BY_CARRIER",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::ArrivedAtHub => "ARRIVED_AT_HUB",
            OrderStatus::DepartedHub => "DEPARTED_HUB",
            OrderStatus::CustomsClearance => "CUSTOMS_CLEARANCE",
            OrderStatus::AtLocalFacility => "AT_LOCAL_FACILITY",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::DeliveryAttempted => "DELIVERY_ATTEMPTED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::OrderCompleted => "ORDER_COMPLETED",
            OrderStatus::Delayed => "DELAYED",
            OrderStatus::AddressIssue => "ADDRESS_ISSUE",
            OrderStatus::CustomerUnavailable => "CUSTOMER_UNAVAILABLE",
            OrderStatus::DamagedInTransit => "DAMAGED_IN_TRANSIT",
            OrderStatus::ReturnRequested => "RETURN_REQUESTED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = PaymentError;

    /// Codes are matched exactly; there is no fallback status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PaymentError::UnknownStatusCode(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    PreShipment,
    Fulfillment,
    Shipping,
    Delivery,
    Completion,
    Exception,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::PreShipment => "pre_shipment",
            StatusCategory::Fulfillment => "fulfillment",
            StatusCategory::Shipping => "shipping",
            StatusCategory::Delivery => "delivery",
            StatusCategory::Completion => "completion",
            StatusCategory::Exception => "exception",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 8-value status vocabulary kept for older persistence and queries.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LegacyStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Returned,
}

impl LegacyStatus {
    pub const ALL: [LegacyStatus; 8] = [
        LegacyStatus::Pending,
        LegacyStatus::Confirmed,
        LegacyStatus::Processing,
        LegacyStatus::Shipped,
        LegacyStatus::Delivered,
        LegacyStatus::Completed,
        LegacyStatus::Cancelled,
        LegacyStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyStatus::Pending => "pending",
            LegacyStatus::Confirmed => "confirmed",
            LegacyStatus::Processing => "processing",
            LegacyStatus::Shipped => "shipped",
            LegacyStatus::Delivered => "delivered",
            LegacyStatus::Completed => "completed",
            LegacyStatus::Cancelled => "cancelled",
            LegacyStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for LegacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegacyStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PaymentError::UnknownStatusCode(s.to_string()))
    }
}
