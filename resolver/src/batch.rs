//! Batching independent reads into one aggregator round trip.

use crate::call::{CallValue, ReadCall};
use crate::error::ResolverError;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use govsync_governance::abi::IMulticall;
use govsync_ledger::LedgerReader;

/// One queued read: target contract, call, and its position in the batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOperation {
    pub index: usize,
    pub target: Address,
    pub call: ReadCall,
}

/// The demultiplexed result of one [`BatchOperation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResult {
    pub index: usize,
    pub target: Address,
    pub value: CallValue,
    pub call: ReadCall,
    pub signature: &'static str,
}

/// Accumulates reads and submits them as a single `aggregate` call.
///
/// A resolver is consumed by [`BatchResolver::aggregate`], so its operations
/// belong to exactly one round trip. It holds no retry logic: when the
/// aggregate fails, callers re-run the same semantic query with
/// [`fetch_single`].
#[derive(Debug)]
pub struct BatchResolver {
    multicall: Address,
    ops: Vec<BatchOperation>,
}

impl BatchResolver {
    pub fn new(multicall: Address) -> Self {
        Self {
            multicall,
            ops: Vec::new(),
        }
    }

    /// Queue one read. Performs no I/O. Returns the operation's index.
    pub fn add_operation(&mut self, target: Address, call: ReadCall) -> usize {
        let index = self.ops.len();
        self.ops.push(BatchOperation {
            index,
            target,
            call,
        });
        index
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Call data for the aggregator.
    pub fn encode(&self) -> Bytes {
        let calls = self
            .ops
            .iter()
            .map(|op| IMulticall::Call {
                target: op.target,
                callData: op.call.encode(),
            })
            .collect();
        Bytes::from(IMulticall::aggregateCall { calls }.abi_encode())
    }

    /// Submit every queued read in one call and decode the results.
    ///
    /// The result list is in enqueue order: `results[i].index == i`.
    pub async fn aggregate<R>(self, reader: &R) -> Result<Vec<BatchResult>, ResolverError>
    where
        R: LedgerReader + ?Sized,
    {
        if self.ops.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(calls = self.ops.len(), multicall = %self.multicall, "aggregate");
        let raw = reader.call(self.multicall, self.encode()).await?;
        let decoded = IMulticall::aggregateCall::abi_decode_returns(&raw, true).map_err(|e| {
            ResolverError::Decode {
                signature: IMulticall::aggregateCall::SIGNATURE,
                reason: e.to_string(),
            }
        })?;

        if decoded.returnData.len() != self.ops.len() {
            return Err(ResolverError::LengthMismatch {
                expected: self.ops.len(),
                actual: decoded.returnData.len(),
            });
        }

        self.ops
            .into_iter()
            .zip(decoded.returnData)
            .map(|(op, data)| {
                let value = op.call.decode(&data)?;
                Ok(BatchResult {
                    index: op.index,
                    target: op.target,
                    signature: op.call.signature(),
                    value,
                    call: op.call,
                })
            })
            .collect()
    }
}

/// Execute one read directly against its target.
pub async fn fetch_single<R>(
    reader: &R,
    target: Address,
    call: &ReadCall,
) -> Result<CallValue, ResolverError>
where
    R: LedgerReader + ?Sized,
{
    let raw = reader.call(target, call.encode()).await?;
    call.decode(&raw)
}
