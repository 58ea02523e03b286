//! Core relay logic for claim meta-transactions.
//!
//! A finder cannot pay for their own claim transaction, so the relay submits
//! it for them from its own funded account. [`ClaimRelay`] implements the
//! per-claim state machine, [`RelayEngine`] bundles it with the services it
//! needs, and [`RelayBuilder`] assembles both from configuration.

pub mod builder;
pub mod engine;
pub mod relay;

pub use builder::{BuilderError, RelayBuilder, RelayFactories};
pub use engine::RelayEngine;
pub use relay::{ClaimRelay, RelayError};
