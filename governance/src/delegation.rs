//! Delegation book rebuilt from `DelegateChanged` logs.
//!
//! The token keeps only the current delegate per account; history lives in its
//! logs. Replaying them in chain order yields the current forward map plus a
//! reverse index of who delegates to whom.

use crate::abi::IVotesToken;
use crate::error::GovernanceError;
use alloy_primitives::{Address, B256};
use alloy_sol_types::SolEvent;
use govsync_ledger::RawLog;
use govsync_types::Delegator;
use std::collections::{BTreeMap, BTreeSet};

/// `topic0` of `DelegateChanged`.
pub const DELEGATE_CHANGED_TOPIC: B256 = IVotesToken::DelegateChanged::SIGNATURE_HASH;

/// Decode one `DelegateChanged` log.
pub fn decode_delegate_changed(log: &RawLog) -> Result<Delegator, GovernanceError> {
    let ev = IVotesToken::DelegateChanged::decode_raw_log(log.topics.iter().copied(), &log.data, true)
        .map_err(|e| GovernanceError::LogDecode {
            event: "DelegateChanged",
            reason: e.to_string(),
        })?;
    Ok(Delegator {
        delegator: ev.delegator,
        delegate: ev.toDelegate,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    })
}

/// Current delegations keyed by delegator, with a reverse index.
#[derive(Debug, Default)]
pub struct DelegationBook {
    /// delegator → latest delegation record.
    delegations: BTreeMap<Address, Delegator>,
    /// delegate → direct delegators.
    reverse: BTreeMap<Address, BTreeSet<Address>>,
}

impl DelegationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay logs. Input must be in chain order; later records win.
    pub fn from_logs(logs: &[RawLog]) -> Result<Self, GovernanceError> {
        let mut book = Self::new();
        for log in logs {
            book.apply(decode_delegate_changed(log)?);
        }
        Ok(book)
    }

    /// Record a delegation change. Delegating to the zero address clears it.
    pub fn apply(&mut self, record: Delegator) {
        if let Some(old) = self.delegations.remove(&record.delegator) {
            if let Some(set) = self.reverse.get_mut(&old.delegate) {
                set.remove(&record.delegator);
                if set.is_empty() {
                    self.reverse.remove(&old.delegate);
                }
            }
        }
        if record.delegate == Address::ZERO {
            return;
        }
        self.reverse
            .entry(record.delegate)
            .or_default()
            .insert(record.delegator);
        self.delegations.insert(record.delegator, record);
    }

    pub fn delegate_of(&self, delegator: &Address) -> Option<Address> {
        self.delegations.get(delegator).map(|d| d.delegate)
    }

    /// Accounts currently delegating to `delegate`, self-delegation included.
    pub fn delegators_of(&self, delegate: &Address) -> Vec<Address> {
        self.reverse
            .get(delegate)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All live delegations, ordered by delegator address.
    pub fn all(&self) -> Vec<Delegator> {
        self.delegations.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.delegations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(delegator: u8, from: u8, to: u8, block: u64) -> RawLog {
        let ev = IVotesToken::DelegateChanged {
            delegator: Address::repeat_byte(delegator),
            fromDelegate: Address::repeat_byte(from),
            toDelegate: Address::repeat_byte(to),
        };
        let data = ev.encode_log_data();
        RawLog {
            address: Address::repeat_byte(0x70),
            topics: data.topics().to_vec(),
            data: data.data.clone(),
            block_number: block,
            transaction_hash: B256::with_last_byte(block as u8),
            log_index: 0,
        }
    }

    #[test]
    fn redelegation_moves_reverse_entry() {
        let book = DelegationBook::from_logs(&[
            changed(1, 0, 2, 1),
            changed(3, 0, 2, 2),
            changed(1, 2, 4, 3),
        ])
        .unwrap();
        assert_eq!(book.delegate_of(&Address::repeat_byte(1)), Some(Address::repeat_byte(4)));
        assert_eq!(book.delegators_of(&Address::repeat_byte(2)), vec![Address::repeat_byte(3)]);
        assert_eq!(book.delegators_of(&Address::repeat_byte(4)), vec![Address::repeat_byte(1)]);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn delegating_to_zero_clears() {
        let book = DelegationBook::from_logs(&[changed(1, 0, 2, 1), changed(1, 2, 0, 2)]).unwrap();
        assert!(book.is_empty());
        assert!(book.delegators_of(&Address::repeat_byte(2)).is_empty());
    }

    #[test]
    fn self_delegation_is_kept() {
        let book = DelegationBook::from_logs(&[changed(5, 0, 5, 1)]).unwrap();
        assert_eq!(book.delegators_of(&Address::repeat_byte(5)), vec![Address::repeat_byte(5)]);
        assert_eq!(book.all()[0].block_number, 1);
    }
}
