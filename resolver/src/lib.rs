//! Batch resolver: many independent contract reads in one aggregator round
//! trip, demultiplexed back into typed results, with caller-side fallback to
//! sequential single calls.

pub mod batch;
pub mod call;
pub mod error;
pub mod queries;

pub use batch::{fetch_single, BatchOperation, BatchResolver, BatchResult};
pub use call::{CallValue, ReadCall};
pub use error::ResolverError;
pub use queries::{FallbackObserver, Mode, Resolver, BOARD_FIELDS, REFRESH_FIELDS};
