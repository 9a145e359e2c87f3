//! The governance store: per-kind event indexes plus the canonical proposal index.

use crate::event_index::{EventLogIndex, IndexedEvent};
use crate::StoreError;
use govsync_governance::{
    add_comment, add_vote, apply_lifecycle, apply_quorum, merge_proposal, proposal_from_created,
    GovernanceEvent,
};
use govsync_types::{EventKind, GovernanceStats, Proposal, ProposalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serializable view of the store: proposals plus the indexed events they
/// were folded from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Highest block covered by a completed scan.
    pub checkpoint: Option<u64>,
    pub proposals: Vec<Proposal>,
    /// Every indexed event, per kind in chain order.
    #[serde(default)]
    pub events: Vec<IndexedEvent>,
    /// Derived from `events`; informational only.
    pub stats: GovernanceStats,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let snapshot: Self =
            serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut seen = std::collections::BTreeSet::new();
        for p in &snapshot.proposals {
            if !seen.insert(p.id) {
                return Err(StoreError::Corruption(format!("duplicate proposal {}", p.id)));
            }
        }
        Ok(snapshot)
    }

    /// Write the snapshot atomically: a sibling temp file renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Owns every mutable index of one engine instance.
///
/// No internal locking: callers serialize access (one refresh at a time).
#[derive(Clone, Debug)]
pub struct GovernanceStore {
    created: EventLogIndex,
    votes: EventLogIndex,
    comments: EventLogIndex,
    lifecycle: EventLogIndex,
    proposals: BTreeMap<ProposalId, Proposal>,
    checkpoint: Option<u64>,
}

impl Default for GovernanceStore {
    fn default() -> Self {
        Self::create()
    }
}

impl GovernanceStore {
    /// A fresh, empty store.
    pub fn create() -> Self {
        Self {
            created: EventLogIndex::new(EventKind::Created),
            votes: EventLogIndex::new(EventKind::Vote),
            comments: EventLogIndex::new(EventKind::Comment),
            lifecycle: EventLogIndex::new(EventKind::Lifecycle),
            proposals: BTreeMap::new(),
            checkpoint: None,
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Events go back into their indexes without being folded again: the
    /// proposals already carry them. Later scans dedup against the restored
    /// indexes and `event_stats` covers the whole history.
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::create();
        store.checkpoint = snapshot.checkpoint;
        store.proposals = snapshot
            .proposals
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        for event in snapshot.events {
            store.index_mut(event.event.kind()).insert(event);
        }
        store
    }

    /// Drop everything, e.g. after an account or network switch.
    pub fn reset(&mut self) {
        *self = Self::create();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let events = [&self.created, &self.votes, &self.comments, &self.lifecycle]
            .into_iter()
            .flat_map(|index| index.events().into_iter().cloned())
            .collect();
        StoreSnapshot {
            checkpoint: self.checkpoint,
            proposals: self.proposals.values().cloned().collect(),
            events,
            stats: self.event_stats(),
        }
    }

    pub fn index(&self, kind: EventKind) -> &EventLogIndex {
        match kind {
            EventKind::Created => &self.created,
            EventKind::Vote => &self.votes,
            EventKind::Comment => &self.comments,
            EventKind::Lifecycle => &self.lifecycle,
        }
    }

    fn index_mut(&mut self, kind: EventKind) -> &mut EventLogIndex {
        match kind {
            EventKind::Created => &mut self.created,
            EventKind::Vote => &mut self.votes,
            EventKind::Comment => &mut self.comments,
            EventKind::Lifecycle => &mut self.lifecycle,
        }
    }

    /// Index an event and fold it into its proposal.
    ///
    /// Returns `false`, changing nothing, when the transaction was already
    /// indexed for this kind.
    pub fn ingest(&mut self, event: IndexedEvent) -> bool {
        let kind = event.event.kind();
        if !self.index_mut(kind).insert(event.clone()) {
            return false;
        }

        let id = event.event.proposal_id();
        match event.event {
            GovernanceEvent::Created(created) => {
                let fresh = proposal_from_created(&created);
                let merged = match self.proposals.get(&id) {
                    Some(existing) => merge_proposal(existing, &fresh),
                    None => fresh,
                };
                self.proposals.insert(id, merged);
            }
            GovernanceEvent::Vote { detail, .. } => {
                add_vote(self.entry(id), detail);
            }
            GovernanceEvent::Comment(comment) => {
                add_comment(self.entry(id), comment);
            }
            GovernanceEvent::Lifecycle(change) => {
                apply_lifecycle(self.entry(id), &change);
            }
        }
        true
    }

    fn entry(&mut self, id: ProposalId) -> &mut Proposal {
        self.proposals
            .entry(id)
            .or_insert_with(|| Proposal::new(id))
    }

    /// Merge a refreshed delta into the index and recompute derived fields.
    pub fn merge(&mut self, delta: &Proposal) -> &Proposal {
        let merged = match self.proposals.get(&delta.id) {
            Some(existing) => merge_proposal(existing, delta),
            None => delta.clone(),
        };
        let slot = self.proposals.entry(delta.id).or_insert_with(|| Proposal::new(delta.id));
        *slot = merged;
        apply_quorum(slot);
        slot
    }

    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn proposal_mut(&mut self, id: &ProposalId) -> Option<&mut Proposal> {
        self.proposals.get_mut(id)
    }

    /// All proposals ordered by id.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn checkpoint(&self) -> Option<u64> {
        self.checkpoint
    }

    /// Advance the checkpoint. It never moves backwards.
    pub fn advance_checkpoint(&mut self, block: u64) {
        self.checkpoint = Some(self.checkpoint.map_or(block, |c| c.max(block)));
    }

    /// Aggregate statistics over the event indexes.
    pub fn event_stats(&self) -> GovernanceStats {
        let mut stats = GovernanceStats::default();
        for indexed in self.created.events() {
            if let GovernanceEvent::Created(created) = &indexed.event {
                stats
                    .proposals_per_proposer
                    .entry(created.proposer)
                    .or_default()
                    .push(created.proposal_id);
                stats.total_proposals += 1;
            }
        }
        for indexed in self.votes.events() {
            if let GovernanceEvent::Vote { detail, .. } = &indexed.event {
                stats.unique_voters.insert(detail.voter);
                *stats.votes_per_voter.entry(detail.voter).or_default() += 1;
                stats.total_votes += 1;
            }
        }
        stats.total_comments = self.comments.len();
        stats
    }
}
