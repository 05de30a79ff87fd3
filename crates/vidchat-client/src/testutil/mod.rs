//! Test utilities for the gateway client
//!
//! This module provides mocks, fixtures, and a wired-up client harness.

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
