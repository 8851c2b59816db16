//! Configuration module for the vault service.
//!
//! Configuration is read from TOML. Before parsing, `${VAR}` and
//! `${VAR:-default}` references are replaced with environment values so that
//! private keys never have to live in the file itself.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["signer.toml"]`. Each top-level
//! section must appear in exactly one file.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vault_types::{api::u256_serde, Address, U256};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Deployment parameters for the manager and the vault.
	pub vault: VaultConfig,
	/// Accounts credited when the ledger is created.
	#[serde(default)]
	pub genesis: Vec<GenesisAccount>,
	/// Off-chain signer used by the `sign` command and as the default trusted signer.
	pub signer: SignerConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Deployment parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
	/// Chain identifier bound into every authorization.
	pub chain_id: u64,
	/// Account that deploys both contracts and owns the authorization manager.
	pub deployer: Address,
	/// Seed trusted signer. Defaults to the configured signer's address.
	#[serde(default)]
	pub initial_signer: Option<Address>,
	/// Wei moved from the deployer into the vault right after deployment.
	#[serde(default, with = "optional_wei")]
	pub initial_deposit: Option<U256>,
}

/// A genesis balance allocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenesisAccount {
	pub address: Address,
	/// Balance in wei, as a decimal string.
	#[serde(with = "u256_serde")]
	pub balance: U256,
}

/// Configuration for off-chain signing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of signer implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

mod optional_wei {
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
	use vault_types::U256;

	pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.map(|v| v.to_string()).serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Option::<String>::deserialize(deserializer)?
			.map(|s| U256::from_str_radix(s.trim(), 10).map_err(D::Error::custom))
			.transpose()
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Bound the input so the regex cannot be fed pathological files
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Genesis balance configured for `address`, zero if none.
	pub fn genesis_balance(&self, address: &Address) -> U256 {
		self.genesis
			.iter()
			.filter(|account| account.address == *address)
			.map(|account| account.balance)
			.fold(U256::ZERO, |acc, balance| acc.saturating_add(balance))
	}

	/// Configuration of the primary signer implementation.
	pub fn primary_signer(&self) -> Option<&toml::Value> {
		self.signer.implementations.get(&self.signer.primary)
	}

	/// Checks the semantic constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.vault.chain_id == 0 {
			return Err(ConfigError::Validation(
				"vault.chain_id must be greater than 0".into(),
			));
		}
		if self.vault.deployer == Address::ZERO {
			return Err(ConfigError::Validation(
				"vault.deployer cannot be the zero address".into(),
			));
		}
		if self.vault.initial_signer == Some(Address::ZERO) {
			return Err(ConfigError::Validation(
				"vault.initial_signer cannot be the zero address".into(),
			));
		}

		let mut seen = HashSet::new();
		for account in &self.genesis {
			if !seen.insert(account.address) {
				return Err(ConfigError::Validation(format!(
					"Duplicate genesis account {}",
					account.address
				)));
			}
		}

		if let Some(deposit) = self.vault.initial_deposit {
			let available = self.genesis_balance(&self.vault.deployer);
			if deposit > available {
				return Err(ConfigError::Validation(format!(
					"vault.initial_deposit {} exceeds deployer genesis balance {}",
					deposit, available
				)));
			}
		}

		if self.signer.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Signer primary implementation cannot be empty".into(),
			));
		}
		if self.primary_signer().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary signer '{}' not found in implementations",
				self.signer.primary
			)));
		}

		Ok(())
	}
}

/// Parses a configuration string: resolves environment variables, deserializes
/// and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const BASE_CONFIG: &str = r#"
[vault]
chain_id = 31337
deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
initial_deposit = "10000000000000000000"

[[genesis]]
address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
balance = "10000000000000000000000"

[signer]
primary = "local"
[signer.implementations.local]
private_key = "${VAULT_TEST_UNSET_KEY:-0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80}"

[api]
enabled = true
port = 8080
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("VAULT_TEST_HOST", "localhost");
		std::env::set_var("VAULT_TEST_PORT", "5432");

		let input = "host = \"${VAULT_TEST_HOST}:${VAULT_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("VAULT_TEST_HOST");
		std::env::remove_var("VAULT_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${VAULT_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${VAULT_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.unwrap_err().to_string().contains("VAULT_MISSING_VAR"));
	}

	#[test]
	fn test_parse_full_config() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.vault.chain_id, 31337);
		assert_eq!(
			config.vault.initial_deposit,
			Some(U256::from(10_000_000_000_000_000_000u128))
		);
		assert!(config.vault.initial_signer.is_none());
		assert_eq!(
			config.genesis_balance(&config.vault.deployer),
			U256::from(10_000u64) * U256::from(1_000_000_000_000_000_000u64)
		);
		let local = config.primary_signer().unwrap();
		assert!(local
			.get("private_key")
			.and_then(|v| v.as_str())
			.unwrap()
			.starts_with("0xac09"));

		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let config_str = BASE_CONFIG.replace("chain_id = 31337", "chain_id = 0");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_zero_initial_signer_rejected() {
		let config_str = BASE_CONFIG.replace(
			"initial_deposit",
			"initial_signer = \"0x0000000000000000000000000000000000000000\"\ninitial_deposit",
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("initial_signer"));
	}

	#[test]
	fn test_deposit_above_genesis_rejected() {
		let config_str = BASE_CONFIG.replace(
			"initial_deposit = \"10000000000000000000\"",
			"initial_deposit = \"10000000000000000000001\"",
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("initial_deposit"));
	}

	#[test]
	fn test_unknown_primary_signer_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"local\"", "primary = \"kms\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("kms"));
	}
}
