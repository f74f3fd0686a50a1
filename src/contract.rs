use crate::{
    abi::{
        self,
        ContractEvent,
    },
    rpc::{
        ChainReader,
        RpcError,
        TransactionReceipt,
        parse_data,
    },
};
use std::future::Future;
use tracing::warn;

pub const DEFAULT_RANDOMNESS_CONTRACT: &str = "0x59035F178a8029A9bd39883802a91B5523cfF53F";

/// The two read-only randomness primitives the remote draw path uses.
pub trait RandomnessSource {
    fn random_number(
        &self,
        min: u64,
        max: u64,
    ) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn select_item(
        &self,
        items: &[&str],
    ) -> impl Future<Output = Result<String, RpcError>> + Send;
}

#[derive(Clone)]
pub struct RandomnessContract<C> {
    reader: C,
    address: String,
}

impl<C: ChainReader + Sync> RandomnessContract<C> {
    pub fn new(reader: C, address: impl Into<String>) -> Self {
        Self {
            reader,
            address: address.into(),
        }
    }

    /// Fetches a transaction receipt and decodes this contract's events from
    /// it. Failures are logged and reported as `None`.
    pub async fn transaction_events(
        &self,
        tx_hash: &str,
    ) -> Option<(TransactionReceipt, Vec<ContractEvent>)> {
        let receipt = match self.reader.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => return None,
            Err(err) => {
                warn!(?err, %tx_hash, "failed to get transaction events");
                return None;
            }
        };
        if !receipt.succeeded() {
            warn!(%tx_hash, status = ?receipt.status, "transaction did not succeed");
        }
        let events = receipt
            .logs
            .iter()
            .filter_map(|log| {
                let data = parse_data(&log.data).ok()?;
                abi::decode_event(&log.topics, &data)
            })
            .collect();
        Some((receipt, events))
    }
}

impl<C: ChainReader + Sync> RandomnessSource for RandomnessContract<C> {
    async fn random_number(&self, min: u64, max: u64) -> Result<u64, RpcError> {
        let data = abi::encode_get_random_number(min, max);
        let out = self.reader.call(&self.address, &data).await?;
        abi::decode_uint64(&out, 0).map_err(|e| RpcError::Decode(e.to_string()))
    }

    async fn select_item(&self, items: &[&str]) -> Result<String, RpcError> {
        let data = abi::encode_select_random_item(items);
        let out = self.reader.call(&self.address, &data).await?;
        abi::decode_string(&out, 0).map_err(|e| RpcError::Decode(e.to_string()))
    }
}
