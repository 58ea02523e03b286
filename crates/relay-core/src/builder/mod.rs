//! Builder for constructing relay engines.
//!
//! Instantiates the configured account and ledger implementations through
//! factory maps keyed by implementation name, resolves the contract once, and
//! wires everything into a [`RelayEngine`].

use crate::engine::RelayEngine;
use crate::relay::ClaimRelay;
use alloy_signer_local::PrivateKeySigner;
use relay_account::{AccountError, AccountInterface, AccountService};
use relay_config::{Config, NetworkConfig};
use relay_ledger::{LedgerError, LedgerInterface, LedgerService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during relay engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
	/// The contract could not be resolved on the ledger.
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),
}

/// Factory functions for every pluggable component, keyed by implementation name.
pub struct RelayFactories<AF, LF> {
	pub account_factories: HashMap<String, AF>,
	pub ledger_factories: HashMap<String, LF>,
}

/// Builder for constructing a RelayEngine with pluggable implementations.
pub struct RelayBuilder {
	config: Config,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the RelayEngine using factories for each component type.
	pub async fn build<AF, LF>(
		self,
		factories: RelayFactories<AF, LF>,
	) -> Result<RelayEngine, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		LF: Fn(
			&toml::Value,
			&NetworkConfig,
			&PrivateKeySigner,
		) -> Result<Box<dyn LedgerInterface>, LedgerError>,
	{
		let account_impl = create_primary(
			"account",
			&self.config.account.primary,
			&self.config.account.implementations,
			&factories.account_factories,
			|factory, config| factory(config),
		)?;
		let account = AccountService::new(account_impl);

		let relay_address = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get relay address");
			BuilderError::Config(format!("Failed to get relay address: {}", e))
		})?;
		let signer = account.signer();

		let network = &self.config.network;
		let ledger_impl = create_primary(
			"ledger",
			&self.config.ledger.primary,
			&self.config.ledger.implementations,
			&factories.ledger_factories,
			|factory, config| factory(config, network, &signer),
		)?;
		let ledger = Arc::new(LedgerService::new(ledger_impl));

		let contract = ledger.lookup_contract(network.contract_address).await?;

		tracing::info!(
			relay_id = %self.config.relay.id,
			relay_address = %relay_address,
			contract = %contract.address,
			chain_id = contract.chain_id,
			"Relay ready"
		);

		let relay = ClaimRelay::new(ledger.clone(), relay_address, contract);
		Ok(RelayEngine::new(self.config, ledger, relay))
	}
}

/// Instantiates the primary implementation of one component.
///
/// Only the primary implementation is constructed; the others configured
/// alongside it are left untouched.
fn create_primary<F, T, E, C>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
	create: C,
) -> Result<T, BuilderError>
where
	E: std::fmt::Display,
	C: Fn(&F, &toml::Value) -> Result<T, E>,
{
	let config = implementations.get(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' not found in implementations",
			component, primary
		))
	})?;
	let factory = factories.get(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!("{} implementation '{}'", component, primary))
	})?;

	match create(factory, config) {
		Ok(implementation) => {
			tracing::info!(component = %component, implementation = %primary, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component = %component,
				implementation = %primary,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, primary, e
			)))
		},
	}
}
