//! String formatting utilities.
//!
//! Provides hex prefix stripping and conversion between wei amounts and
//! human-readable ether strings.

use alloy_primitives::{
	utils::{format_ether, parse_ether},
	U256,
};

/// Removes "0x" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Formats a wei amount as ether for display, e.g. `1.000000000000000000`.
pub fn format_ether_amount(amount: U256) -> String {
	format_ether(amount)
}

/// Parses an ether amount such as "1.5" into wei.
pub fn parse_ether_amount(amount: &str) -> Result<U256, String> {
	parse_ether(amount.trim()).map_err(|e| format!("Invalid ether amount '{}': {}", amount, e))
}
