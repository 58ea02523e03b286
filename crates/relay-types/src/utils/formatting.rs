//! String formatting utilities.
//!
//! Provides hex prefix stripping and id truncation for readable logs.

/// Utility function to truncate a hex string for display purposes.
///
/// Shows only the first 10 characters (the `0x` prefix plus four bytes)
/// followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}
