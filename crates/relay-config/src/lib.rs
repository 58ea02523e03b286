//! Configuration module for the claim relay.
//!
//! Configuration is read once at process start, validated, and then passed
//! explicitly to the components that need it. It can come from a TOML file
//! (with `${VAR}` / `${VAR:-default}` environment substitution) or, for
//! serverless-style deployments, purely from the `MNEMONIC`, `PROVIDER_URL`
//! and `CONTRACT_ADDRESS` environment variables.

use alloy_primitives::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Name of the account implementation used by environment-only configuration.
pub const DEFAULT_ACCOUNT_IMPLEMENTATION: &str = "local";
/// Name of the ledger implementation used by environment-only configuration.
pub const DEFAULT_LEDGER_IMPLEMENTATION: &str = "evm_alloy";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this relay instance.
	pub relay: RelayConfig,
	/// Ledger endpoint and deployed contract.
	pub network: NetworkConfig,
	/// Relay account used to pay for submissions.
	pub account: AccountConfig,
	/// Ledger collaborator implementation.
	pub ledger: LedgerConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the relay instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Ledger endpoint and contract location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// Expected chain id. When absent the ledger reports its own.
	pub chain_id: Option<u64>,
	/// Address of the deployed Recover contract.
	pub contract_address: Address,
}

/// Account implementations, one of which is primary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Ledger implementations, one of which is primary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	64 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default`
/// for `${VAR_NAME:-default}` when the variable is unset. Comment lines are
/// copied untouched. Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	resolve_vars_with(input, |name| std::env::var(name).ok())
}

fn resolve_vars_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
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
	for line in input.split_inclusive('\n') {
		if line.trim_start().starts_with('#') {
			result.push_str(line);
			continue;
		}

		let mut last = 0;
		for cap in re.captures_iter(line) {
			let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
				continue;
			};
			let value = match lookup(name.as_str()) {
				Some(v) => v,
				None => match cap.get(2) {
					Some(default) => default.as_str().to_string(),
					None => {
						return Err(ConfigError::Validation(format!(
							"Environment variable '{}' not found",
							name.as_str()
						)))
					},
				},
			};
			result.push_str(&line[last..whole.start()]);
			result.push_str(&value);
			last = whole.end();
		}
		result.push_str(&line[last..]);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		tracing::debug!(path = %path.display(), "Read configuration file");
		content.parse()
	}

	/// Builds configuration from process environment variables.
	///
	/// Reads `MNEMONIC` (or `PRIVATE_KEY`), `PROVIDER_URL`, `CONTRACT_ADDRESS`
	/// and the optional `CHAIN_ID`, `RELAY_ID` and `ACCOUNT_INDEX`. The API
	/// server is left disabled.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Same as [`Config::from_env`] with an injectable variable source.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &str| {
			lookup(name).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
				ConfigError::Validation(format!("Environment variable '{}' not found", name))
			})
		};

		let mut account = toml::map::Map::new();
		match (lookup("MNEMONIC"), lookup("PRIVATE_KEY")) {
			(Some(mnemonic), _) if !mnemonic.trim().is_empty() => {
				account.insert("mnemonic".to_string(), toml::Value::String(mnemonic));
				if let Some(index) = lookup("ACCOUNT_INDEX") {
					let index = index.trim().parse::<i64>().map_err(|e| {
						ConfigError::Validation(format!("Invalid ACCOUNT_INDEX: {}", e))
					})?;
					account.insert("index".to_string(), toml::Value::Integer(index));
				}
			},
			(_, Some(key)) if !key.trim().is_empty() => {
				account.insert("private_key".to_string(), toml::Value::String(key));
			},
			_ => {
				return Err(ConfigError::Validation(
					"Environment variable 'MNEMONIC' not found".into(),
				))
			},
		}

		let contract_address = required("CONTRACT_ADDRESS")?
			.trim()
			.parse::<Address>()
			.map_err(|e| ConfigError::Validation(format!("Invalid CONTRACT_ADDRESS: {}", e)))?;

		let chain_id = match lookup("CHAIN_ID") {
			Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
				ConfigError::Validation(format!("Invalid CHAIN_ID: {}", e))
			})?),
			None => None,
		};

		let config = Config {
			relay: RelayConfig {
				id: lookup("RELAY_ID").unwrap_or_else(|| "recover-relay".to_string()),
			},
			network: NetworkConfig {
				rpc_url: required("PROVIDER_URL")?,
				chain_id,
				contract_address,
			},
			account: AccountConfig {
				primary: DEFAULT_ACCOUNT_IMPLEMENTATION.to_string(),
				implementations: HashMap::from([(
					DEFAULT_ACCOUNT_IMPLEMENTATION.to_string(),
					toml::Value::Table(account),
				)]),
			},
			ledger: LedgerConfig {
				primary: DEFAULT_LEDGER_IMPLEMENTATION.to_string(),
				implementations: HashMap::from([(
					DEFAULT_LEDGER_IMPLEMENTATION.to_string(),
					toml::Value::Table(toml::map::Map::new()),
				)]),
			},
			api: None,
		};
		config.validate()?;
		Ok(config)
	}

	/// Raw configuration of the primary account implementation.
	pub fn primary_account(&self) -> Option<&toml::Value> {
		self.account.implementations.get(&self.account.primary)
	}

	/// Raw configuration of the primary ledger implementation.
	pub fn primary_ledger(&self) -> Option<&toml::Value> {
		self.ledger.implementations.get(&self.ledger.primary)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.relay.id.trim().is_empty() {
			return Err(ConfigError::Validation("Relay ID cannot be empty".into()));
		}

		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("Network rpc_url cannot be empty".into()));
		}
		if self.network.contract_address.is_zero() {
			return Err(ConfigError::Validation(
				"Network contract_address cannot be the zero address".into(),
			));
		}
		if self.network.chain_id == Some(0) {
			return Err(ConfigError::Validation(
				"Network chain_id must be greater than 0".into(),
			));
		}

		if self.primary_account().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}
		if self.primary_ledger().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary ledger '{}' not found in implementations",
				self.ledger.primary
			)));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation(
					"API port must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses TOML, resolving environment variables first, and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
