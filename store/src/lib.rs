//! In-memory indexes for governance synchronization.
//!
//! One [`GovernanceStore`] holds the per-kind event indexes and the canonical
//! proposal index of a single engine instance. Snapshots of the proposal index
//! can be written to disk and restored on the next start.

pub mod error;
pub mod event_index;
pub mod governance;

pub use error::StoreError;
pub use event_index::{EventLogIndex, IndexedEvent};
pub use governance::{GovernanceStore, StoreSnapshot};
