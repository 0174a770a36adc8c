//! Utilities Module
//!
//! Hashing/encoding helpers and structured logging.

pub mod crypto;
pub mod logging;

pub use crypto::*;
