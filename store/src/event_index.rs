//! Per-kind deduplicating event log index.

use alloy_primitives::B256;
use govsync_governance::GovernanceEvent;
use govsync_ledger::RawLog;
use govsync_types::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A decoded event together with its position on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub event: GovernanceEvent,
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: B256,
}

impl IndexedEvent {
    pub fn new(event: GovernanceEvent, log: &RawLog) -> Self {
        Self {
            event,
            block_number: log.block_number,
            log_index: log.log_index,
            transaction_hash: log.transaction_hash,
        }
    }

    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Append-only map of one event kind, keyed by transaction hash.
///
/// The first event seen for a transaction wins; replays of the same window
/// are absorbed silently.
#[derive(Clone, Debug)]
pub struct EventLogIndex {
    kind: EventKind,
    entries: HashMap<B256, IndexedEvent>,
}

impl EventLogIndex {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Insert unless the transaction is already indexed. Returns whether the
    /// event was new.
    pub fn insert(&mut self, event: IndexedEvent) -> bool {
        debug_assert_eq!(event.event.kind(), self.kind);
        if self.entries.contains_key(&event.transaction_hash) {
            return false;
        }
        self.entries.insert(event.transaction_hash, event);
        true
    }

    pub fn get(&self, transaction_hash: &B256) -> Option<&IndexedEvent> {
        self.entries.get(transaction_hash)
    }

    pub fn contains(&self, transaction_hash: &B256) -> bool {
        self.entries.contains_key(transaction_hash)
    }

    /// Every indexed event in chain order.
    pub fn events(&self) -> Vec<&IndexedEvent> {
        let mut events: Vec<&IndexedEvent> = self.entries.values().collect();
        events.sort_by_key(|e| e.position());
        events
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
