//! Utility functions for hex parsing and string formatting.
//!
//! Wire inputs arrive as loosely formatted hex strings; these helpers turn
//! them into fixed-width values and render values back for logs and responses.

pub mod conversion;
pub mod formatting;

pub use conversion::{parse_address, parse_b256, parse_item_id};
pub use formatting::{truncate_id, without_0x_prefix};
