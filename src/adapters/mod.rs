//! Storage adapters implementing [`crate::ports::PersistenceEngine`].

pub mod factory;
pub mod postgres;
pub mod sql;
pub mod sqlite;
