//! Deterministic, pure logic shared by the builder.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! records and return deterministic outputs suitable for tests.

pub mod checks;
pub mod compare;
pub mod lints;
pub mod record;
pub mod signature;
pub mod verdict;
