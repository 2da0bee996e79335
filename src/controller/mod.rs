//! API Controller modules
//!
//! Controllers organized by domain.

pub mod actions;
pub mod loans;
pub mod misc;
