//! TracLine: task tracking with auditable completion gates.
//!
//! Tasks move through a configurable workflow. Before a task may enter
//! `DONE`, a per-project strict mode can demand confirmation that attached
//! documents were read, a newly attached file, and a logged piece of work.
//! Storage is either an embedded SQLite file or a PostgreSQL server, with
//! the same behaviour on both and missing schema repaired at run time.
//!
//! # Architecture
//!
//! - [`domain`]: entity records and their validation rules
//! - [`ports`]: the [`ports::PersistenceEngine`] storage contract
//! - [`adapters`]: SQLite and PostgreSQL engines on a shared SQL layer
//! - [`services`]: workflow, lifecycle, strict-mode gate and façades
//! - [`config`]: YAML configuration with environment overrides

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
