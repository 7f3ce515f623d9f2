//! Deterministic, pure logic shared by the repair search.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values (oracle text, generator text, scores) and return deterministic
//! outputs suitable for tests.

pub mod extract;
pub mod score;
pub mod selector;
pub mod types;
pub mod verdict;
