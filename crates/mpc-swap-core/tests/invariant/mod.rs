//! Invariant tests module
//!
//! This module contains tests that verify critical invariants:
//! - Both parties derive the same funding address
//! - The co-signed transaction recovers to the funding address

pub mod handshake_invariant;
