//! Application layer containing the payment verification workflow.
//!
//! `PaymentEngine` is the primary entry point. The components it wires are
//! also usable on their own: the security policy gate, the verification
//! queue, the review decision engine, the order state machine and the stats
//! aggregator.

pub mod engine;
pub mod fulfillment;
pub mod gate;
pub mod queue;
pub mod review;
pub mod stats;
