//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable component (account, ledger) exposes a `Registry` per
/// implementation that names the configuration key it answers to and the
/// factory that builds it.
pub trait ImplementationRegistry {
	/// The key used under `implementations` in the configuration file, for
	/// example `"local"` for `[account.implementations.local]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
