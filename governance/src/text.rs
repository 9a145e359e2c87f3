//! Description helpers.

use alloy_primitives::{keccak256, B256};

/// The display headline of a proposal description: its first line, with a
/// leading markdown `# ` removed, upper-cased.
pub fn headline(description: &str) -> String {
    let first = description.lines().next().unwrap_or_default().trim();
    let first = first.strip_prefix("# ").unwrap_or(first);
    first.trim().to_uppercase()
}

/// `keccak256(description)`, the value governors hash proposals with.
pub fn description_hash(description: &str) -> B256 {
    keccak256(description.as_bytes())
}
