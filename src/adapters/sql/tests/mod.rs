//! Unit tests for statement rendering, schema description, column
//! conversions and engine recovery.
