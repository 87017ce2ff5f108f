//! Unit tests for the entity model.
