//! Domain types and rules: the payment attempt ledger, the order status
//! graph, and the storage ports the application layer depends on.

pub mod attempt;
pub mod money;
pub mod order;
pub mod policy;
pub mod ports;
pub mod registry;
pub mod status;
