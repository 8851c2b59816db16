//! Utility functions for formatting.
//!
//! String helpers for hex prefixes and native value amounts.

pub mod formatting;

pub use formatting::{format_ether_amount, parse_ether_amount, without_0x_prefix};
