//! Account management functionality
//!
//! This module provides the derived wallet type and the per-chain registry
//! that allocates account indices and applies sync updates by wallet id.

mod registry;
mod wallet;

pub use registry::*;
pub use wallet::*;
