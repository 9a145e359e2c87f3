//! Contract capability sniffing over deployed bytecode.
//!
//! This is a heuristic. A contract is classified by searching its runtime
//! bytecode for the 4-byte selectors of a fixed function set, the way a
//! dispatcher table embeds them as `PUSH4` immediates. All selectors of a set
//! must be present. Nothing is disassembled, so unrelated data that happens to
//! contain the same bytes produces a false positive, and proxies (whose runtime
//! code only delegates) are never recognised.

use crate::abi::{IDaoRegistry, IGovernor, ITimelock, IVotesToken};
use alloy_sol_types::SolCall;
use govsync_types::ContractKind;

const GOVERNOR_SELECTORS: [[u8; 4]; 5] = [
    IGovernor::stateCall::SELECTOR,
    IGovernor::proposalSnapshotCall::SELECTOR,
    IGovernor::proposalDeadlineCall::SELECTOR,
    IGovernor::hashProposalCall::SELECTOR,
    IGovernor::castVoteCall::SELECTOR,
];

const TIMELOCK_SELECTORS: [[u8; 4]; 4] = [
    ITimelock::getMinDelayCall::SELECTOR,
    ITimelock::hashOperationCall::SELECTOR,
    ITimelock::scheduleCall::SELECTOR,
    ITimelock::executeCall::SELECTOR,
];

const ERC20_SELECTORS: [[u8; 4]; 6] = [
    IVotesToken::totalSupplyCall::SELECTOR,
    IVotesToken::balanceOfCall::SELECTOR,
    IVotesToken::transferCall::SELECTOR,
    IVotesToken::allowanceCall::SELECTOR,
    IVotesToken::approveCall::SELECTOR,
    IVotesToken::transferFromCall::SELECTOR,
];

const DAO_REGISTRY_SELECTORS: [[u8; 4]; 3] = [
    IDaoRegistry::daoCountCall::SELECTOR,
    IDaoRegistry::daoAtCall::SELECTOR,
    IDaoRegistry::registerDaoCall::SELECTOR,
];

/// Whether `needle` occurs anywhere in `code`.
pub fn has_selector(code: &[u8], needle: [u8; 4]) -> bool {
    code.windows(4).any(|w| w == needle)
}

fn has_all(code: &[u8], selectors: &[[u8; 4]]) -> bool {
    selectors.iter().all(|s| has_selector(code, *s))
}

pub fn is_governor(code: &[u8]) -> bool {
    has_all(code, &GOVERNOR_SELECTORS)
}

pub fn is_timelock(code: &[u8]) -> bool {
    has_all(code, &TIMELOCK_SELECTORS)
}

pub fn is_erc20(code: &[u8]) -> bool {
    has_all(code, &ERC20_SELECTORS)
}

pub fn is_dao_registry(code: &[u8]) -> bool {
    has_all(code, &DAO_REGISTRY_SELECTORS)
}

/// Whether the token exposes `owner()`; gates the optional owner read.
pub fn has_owner(code: &[u8]) -> bool {
    has_selector(code, IVotesToken::ownerCall::SELECTOR)
}

/// First matching kind, checked from the most specific set down.
pub fn detect_contract_kind(code: &[u8]) -> ContractKind {
    if is_governor(code) {
        ContractKind::Governor
    } else if is_timelock(code) {
        ContractKind::Timelock
    } else if is_dao_registry(code) {
        ContractKind::DaoRegistry
    } else if is_erc20(code) {
        ContractKind::Erc20
    } else {
        ContractKind::Unknown
    }
}

/// Fake runtime code: a `PUSH4 <selector>` per entry, framed by filler bytes.
#[cfg(test)]
pub(crate) fn code_with(selectors: &[[u8; 4]]) -> Vec<u8> {
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for s in selectors {
        code.push(0x63);
        code.extend_from_slice(s);
        code.extend_from_slice(&[0x14, 0x61, 0x00, 0x00, 0x57]);
    }
    code.push(0x00);
    code
}
