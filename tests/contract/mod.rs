//! Behaviour every storage backend must share.
//!
//! Each function drives a connected, empty engine and is called from the
//! backend test crates.

pub mod links;
pub mod logs;
pub mod scenarios;
pub mod tasks;
pub mod team;
