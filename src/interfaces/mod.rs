//! Batch CSV interface used by the command-line binary.

pub mod csv;
