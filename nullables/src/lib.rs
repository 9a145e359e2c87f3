//! Nullable infrastructure for deterministic testing.
//!
//! The ledger is the engine's only external dependency and sits behind the
//! `LedgerReader` trait. This crate provides an in-memory implementation that:
//! - Returns deterministic blocks, hashes and timestamps
//! - Can be scripted programmatically (logs, contract handlers, failures)
//! - Records every query for assertions
//! - Never touches the network
//!
//! Usage: deploy a [`SimulatedGovernor`] on a [`NullLedger`] and hand the ledger
//! to the engine in place of a JSON-RPC reader.

pub mod governor;
pub mod ledger;

pub use governor::{role_hash, SimulatedGovernor, GOVERNOR, MULTICALL, TIMELOCK, TOKEN};
pub use ledger::{block_hash, fake_code, CallHandler, NullLedger, BLOCK_TIME, GENESIS_TIME};
