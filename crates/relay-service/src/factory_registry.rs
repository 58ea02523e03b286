//! Factory registry for relay implementations.
//!
//! Collects every account and ledger implementation the workspace ships and
//! builds a [`RelayEngine`] from whichever ones the configuration names.

use relay_account::AccountFactory;
use relay_config::Config;
use relay_core::{RelayBuilder, RelayEngine, RelayFactories};
use relay_ledger::LedgerFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Registry of all implementation factories.
pub struct FactoryRegistry {
	pub account: HashMap<String, AccountFactory>,
	pub ledger: HashMap<String, LedgerFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			account: HashMap::new(),
			ledger: HashMap::new(),
		}
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_ledger(&mut self, name: impl Into<String>, factory: LedgerFactory) {
		self.ledger.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in relay_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in relay_ledger::get_all_implementations() {
			tracing::debug!("Registering ledger implementation: {}", name);
			registry.register_ledger(name, factory);
		}

		registry
	})
}

/// Picks the factories for every implementation named in the configuration.
///
/// Unknown names are an error listing what is available.
fn select<F: Copy>(
	available: &HashMap<String, F>,
	configured: &HashMap<String, toml::Value>,
	kind: &str,
) -> Result<HashMap<String, F>, String> {
	let mut selected = HashMap::new();
	for name in configured.keys() {
		match available.get(name) {
			Some(factory) => {
				selected.insert(name.clone(), *factory);
			},
			None => {
				let mut names: Vec<_> = available.keys().cloned().collect();
				names.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					kind,
					name,
					names.join(", ")
				));
			},
		}
	}
	Ok(selected)
}

/// Builds the relay engine using the registry and configuration.
pub async fn build_relay_from_config(
	config: Config,
) -> Result<RelayEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = RelayFactories {
		account_factories: select(&registry.account, &config.account.implementations, "account")?,
		ledger_factories: select(&registry.ledger, &config.ledger.implementations, "ledger")?,
	};

	Ok(RelayBuilder::new(config).build(factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registry_contains_all_implementations() {
		let registry = get_registry();
		assert!(registry.account.contains_key("local"));
		assert!(registry.ledger.contains_key("evm_alloy"));
		assert!(registry.ledger.contains_key("memory"));
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let configured = HashMap::from([(
			"kms".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		)]);
		let err = select(&get_registry().account, &configured, "account").unwrap_err();
		assert_eq!(err, "Unknown account implementation 'kms'. Available: [local]");
	}
}
