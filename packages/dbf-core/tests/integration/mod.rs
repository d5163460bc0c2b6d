//! Integration test suite for the DBF engine.
//!
//! 1. Record lifecycle through the public API
//! 2. Schema documents and reopening files
//! 3. Index key ordering

pub mod helpers;
pub mod key_tests;
pub mod lifecycle_tests;
pub mod schema_tests;
