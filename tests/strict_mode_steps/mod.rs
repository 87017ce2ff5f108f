//! Step definitions for strict completion gate scenarios.

pub mod given;
pub mod world;
