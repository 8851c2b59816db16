//! Main entry point for the vault service.
//!
//! The binary deploys an authorization manager and a secure vault from a
//! configuration file and then either serves the HTTP API, prints the
//! deployment summary, or signs a withdrawal authorization with the
//! configured off-chain signer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use vault_config::Config;
use vault_core::{VaultBuilder, VaultService};
use vault_signer::{create_signer, AuthorizationSigner};
use vault_types::{format_ether_amount, parse_ether_amount, Address, U256};

mod apis;
mod server;

/// Command-line arguments for the vault service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, global = true, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Deploy the contracts and serve the HTTP API
	Serve {
		/// Path to configuration file
		#[arg(short, long, default_value = "config.toml")]
		config: PathBuf,
	},
	/// Deploy the contracts and print the deployment summary
	Deploy {
		/// Path to configuration file
		#[arg(short, long, default_value = "config.toml")]
		config: PathBuf,
	},
	/// Sign a withdrawal authorization with the configured signer
	Sign {
		/// Path to configuration file
		#[arg(short, long, default_value = "config.toml")]
		config: PathBuf,
		/// Address receiving the funds
		#[arg(long)]
		recipient: String,
		/// Amount in ether, e.g. "1.5"
		#[arg(long)]
		amount: String,
		/// Authorization nonce (decimal)
		#[arg(long)]
		nonce: String,
		/// Vault address; defaults to the vault deployed from the configuration
		#[arg(long)]
		vault: Option<String>,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	match args.command {
		Command::Serve { config } => serve(&config).await,
		Command::Deploy { config } => deploy(&config).await,
		Command::Sign {
			config,
			recipient,
			amount,
			nonce,
			vault,
		} => sign(&config, &recipient, &amount, &nonce, vault.as_deref()).await,
	}
}

async fn load_config(path: &std::path::Path) -> Result<Config, Box<dyn std::error::Error>> {
	let path = path
		.to_str()
		.ok_or_else(|| format!("Configuration path is not valid UTF-8: {}", path.display()))?;
	let config = Config::from_file(path).await?;
	tracing::info!(chain_id = config.vault.chain_id, "Loaded configuration");
	Ok(config)
}

/// Creates the primary signer named in the configuration.
fn build_signer(config: &Config) -> Result<AuthorizationSigner, Box<dyn std::error::Error>> {
	let signer_config = config
		.primary_signer()
		.ok_or_else(|| format!("Primary signer '{}' is not configured", config.signer.primary))?;
	let implementation = create_signer(&config.signer.primary, signer_config)?;
	tracing::info!(component = "signer", implementation = %config.signer.primary, "Loaded");
	Ok(AuthorizationSigner::new(implementation))
}

/// Deploys the manager and vault, seeding the manager with the configured
/// signer unless the configuration names another initial signer.
async fn build_deployment(
	config: Config,
	signer: &AuthorizationSigner,
) -> Result<VaultService, Box<dyn std::error::Error>> {
	let signer_address = signer.address().await?;
	Ok(VaultBuilder::new(config)
		.with_default_signer(signer_address)
		.build()?)
}

async fn serve(config_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(config_path).await?;
	let api_config = config
		.api
		.clone()
		.filter(|api| api.enabled)
		.ok_or("API server is not enabled in the configuration")?;

	let signer = build_signer(&config)?;
	let service = Arc::new(build_deployment(config, &signer).await?);

	tracing::info!("Started vault service");
	server::start_server(api_config, service).await?;
	tracing::info!("Stopped vault service");
	Ok(())
}

async fn deploy(config_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(config_path).await?;
	let deployer = config.vault.deployer;
	let signer = build_signer(&config)?;
	let service = build_deployment(config, &signer).await?;

	println!("Deployer:              {}", deployer);
	println!("AuthorizationManager:  {}", service.manager_address());
	println!("SecureVault:           {}", service.vault_address());
	println!("Chain ID:              {}", service.chain_id());
	println!(
		"Vault balance:         {} ETH",
		format_ether_amount(service.balance().await)
	);
	println!(
		"Trusted signers:       {}",
		service
			.manager()
			.signers()
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join(", ")
	);
	Ok(())
}

async fn sign(
	config_path: &std::path::Path,
	recipient: &str,
	amount: &str,
	nonce: &str,
	vault: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
	let recipient: Address = recipient
		.parse()
		.map_err(|_| format!("Invalid recipient address: {}", recipient))?;
	let amount = parse_ether_amount(amount)?;
	let nonce = U256::from_str_radix(nonce.trim(), 10)
		.map_err(|e| format!("Invalid nonce '{}': {}", nonce, e))?;

	let config = load_config(config_path).await?;
	let chain_id = config.vault.chain_id;
	let signer = build_signer(&config)?;

	let vault = match vault {
		Some(vault) => vault
			.parse::<Address>()
			.map_err(|_| format!("Invalid vault address: {}", vault))?,
		None => build_deployment(config, &signer).await?.vault_address(),
	};

	let request = signer
		.sign_withdrawal(vault, recipient, amount, nonce, chain_id)
		.await?;
	tracing::info!(%vault, %recipient, %amount, %nonce, "Signed authorization");
	println!("{}", alloy_primitives::hex::encode_prefixed(&request.signature));
	Ok(())
}
