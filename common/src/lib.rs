//! Currencies Common Types
//!
//! This crate contains shared types used across the currencies service,
//! including currency codes, currency pairs, the failure taxonomy and
//! time helpers.

pub mod currency;
pub mod error;
pub mod time;

pub use currency::*;
pub use error::*;
pub use time::*;
