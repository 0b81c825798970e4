//! Transient verification codes.
//!
//! This module handles:
//! - Issuing short-lived 4-digit codes and emailing them out
//! - Verifying submitted codes against the outstanding challenge
//! - Per-identity issuance rate limiting
//!
//! ## Submodules
//!
//! - `issuer` - Code generation, delivery and verification
//! - `rate_limit` - The issuance rate-limit store

pub mod issuer;
pub mod rate_limit;

// Re-export commonly used items
pub use issuer::{
    CODE_TTL, ChallengeHandle, CodeIssuer, MAX_CODES_PER_WINDOW, MAX_SEND_ATTEMPTS,
    RATE_LIMIT_WINDOW,
};
pub use rate_limit::{
    InMemoryRateLimitStore, RateLimitDecision, RateLimitRecord, RateLimitStore,
};
