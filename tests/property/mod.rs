//! Property-based tests for tower-rest.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across the pipeline pieces.

pub mod chain;
pub mod dispatch;
pub mod request;
pub mod retry;
