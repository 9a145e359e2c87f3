//! Pre-built [`tracing::Span`] constructors for engine operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! a board build with the log scans and ledger calls it issued.

use alloy_primitives::{Address, B256};
use govsync_types::ProposalId;
use tracing::{info_span, Span};

/// Span covering one full board build.
pub fn board_build_span(governor: &Address, from_block: Option<u64>) -> Span {
    info_span!("board_build", governor = %governor, from_block = ?from_block)
}

/// Span covering the refresh of a single proposal.
pub fn proposal_refresh_span(id: &ProposalId) -> Span {
    info_span!("proposal_refresh", id = %id)
}

/// Span covering a windowed scan of one event topic.
pub fn log_scan_span(topic: &B256, from: u64, head: u64) -> Span {
    info_span!("log_scan", topic = %topic, from = from, head = head)
}

/// Span covering a comment sweep.
pub fn comment_sweep_span(governor: &Address) -> Span {
    info_span!("comment_sweep", governor = %governor)
}
