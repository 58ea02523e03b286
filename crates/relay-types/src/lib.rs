//! Common types module for the claim relay.
//!
//! This module defines the data model shared by every relay component: the
//! claim request submitted by a finder, the outcome the relay produces, the
//! ledger-facing records, and the wire types used by the HTTP and event
//! entry points.

/// API types for HTTP endpoints and event envelopes.
pub mod api;
/// Claim request and signature types.
pub mod claim;
/// Ledger-facing types: contract references, claim events, transaction handles.
pub mod ledger;
/// Relay outcome classification.
pub mod outcome;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for mnemonics and private keys.
pub mod secret_string;
/// Utility functions for hex parsing and formatting.
pub mod utils;
/// Configuration validation types for implementation-specific TOML sections.
pub mod validation;

pub use alloy_primitives::{Address, B256};
pub use api::*;
pub use claim::*;
pub use ledger::*;
pub use outcome::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{parse_address, parse_b256, parse_item_id, truncate_id, without_0x_prefix};
pub use validation::*;
