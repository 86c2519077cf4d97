//! vocp integration test support
//!
//! Shared fixtures for the integration and property tests: local trees on
//! disk, seeded in-memory node stores and helpers that flatten a tree into a
//! comparable listing.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Common fixtures used across the test files so every test builds its
/// trees the same way.
pub mod test_utils;
