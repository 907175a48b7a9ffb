//! Unit tests module
//!
//! This module contains unit tests for individual components:
//! - Framing and message channel
//! - Threshold engine and coordinators
//! - Trade primitives

pub mod trade_test;
