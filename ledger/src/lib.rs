//! Read-only ledger access for the governance synchronization engine.
//!
//! The engine never talks to a node directly. It sees the chain only through
//! [`LedgerReader`]: head height, bytecode, block headers, ranged log queries
//! and read-only calls. [`JsonRpcReader`] implements it over HTTP JSON-RPC;
//! tests use the in-memory ledger from `govsync-nullables`.

pub mod error;
pub mod jsonrpc;
pub mod reader;

pub use error::LedgerError;
pub use jsonrpc::JsonRpcReader;
pub use reader::{BlockHeader, BlockId, LedgerReader, LogFilter, RawLog};
