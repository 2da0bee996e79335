//! Loan read models
//!
//! Everything here is derived from contract events and live contract reads
//! on each refresh. Nothing is persisted.

mod models;

pub use models::*;
