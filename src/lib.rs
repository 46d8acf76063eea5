//! Solayer claim portal eligibility and vesting checker
//!
//! `core` holds the gRPC-Web codec, the per-wallet claim session and the
//! batch runner. `utils` holds configuration and shared helpers.

pub mod core;
pub mod utils;
