//! Fuzz tests module
//!
//! Property-based testing using proptest to find edge cases:
//! - Offer hashing
//! - Frame decoding
//! - Value policy

pub mod framing_fuzz;
pub mod offer_fuzz;
pub mod value_fuzz;
