//! Common type definitions.
//!
//! Entity identifiers are 64-bit rowids wrapped in type aliases for
//! readability at call sites.

/// Service-client identifier
pub type ClientId = i64;

/// Usage-record identifier
pub type UsageId = i64;
