//! Common types module for the signature-authorized vault.
//!
//! This module defines the data types shared by every vault component: the
//! canonical authorization message and its digests, contract events, HTTP API
//! payloads and configuration validation primitives.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// The signed withdrawal authorization and its canonical encoding.
pub mod authorization;
/// Events emitted by the vault and the authorization manager.
pub mod events;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for private key material.
pub mod secret_string;
/// Utility functions for formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};

// Re-export all types for convenient access
pub use api::*;
pub use authorization::*;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{format_ether_amount, parse_ether_amount, without_0x_prefix};
pub use validation::*;
