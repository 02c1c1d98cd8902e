//! JSON-RPC implementation of [`ChainClient`] for Ethereum-style endpoints.
//!
//! Broadcasting goes through `eth_sendTransaction` (the node holds the
//! operator account); confirmation polls `eth_getTransactionReceipt` on a
//! constant interval. Retry policy for transient failures lives here so the
//! orchestrator never has to reason about it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy_core::primitives::{Address, Bytes};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::chain::{ChainClient, ChainError, TxHash, TxIntent, TxReceipt};

/// Timeout for a single RPC request.
const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between receipt polls.
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Receipt polls before a confirmation is declared timed out.
const CONFIRMATION_POLL_ATTEMPTS: usize = 150;

/// [`ChainClient`] backed by an Ethereum JSON-RPC endpoint.
pub struct RpcChainClient {
    http: reqwest::Client,
    url: Url,
    /// Broadcast cache keyed by intent content digest: re-broadcasting the
    /// same intent returns the already-known hash instead of submitting a
    /// duplicate transaction.
    broadcasts: Mutex<HashMap<String, TxHash>>,
}

impl RpcChainClient {
    pub fn new(url: Url) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            broadcasts: Mutex::new(HashMap::new()),
        })
    }

    /// Make a JSON-RPC call and deserialize the result.
    async fn json_rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, ChainError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to send {method} request: {e}")))?;

        let result: Value = response
            .json()
            .await
            .map_err(|e| ChainError::Malformed(format!("failed to parse {method} response: {e}")))?;

        if let Some(error) = result.get("error") {
            return Err(ChainError::Rpc(format!(
                "{method}: {}",
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
            )));
        }

        let result_value = result
            .get("result")
            .ok_or_else(|| ChainError::Malformed(format!("no result in {method} response")))?
            .clone();

        serde_json::from_value(result_value)
            .map_err(|e| ChainError::Malformed(format!("failed to deserialize {method} result: {e}")))
    }

    /// One receipt poll: `Pending` while the transaction is not yet included.
    async fn receipt_once(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        let raw: Option<RawReceipt> = self
            .json_rpc_call("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await?;

        match raw {
            Some(raw) => Ok(raw.into()),
            None => Err(ChainError::Pending(tx_hash)),
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn broadcast(&self, intent: &TxIntent) -> Result<TxHash, ChainError> {
        let digest = intent.digest();
        let known = self
            .broadcasts
            .lock()
            .expect("broadcast cache lock poisoned")
            .get(&digest)
            .copied();
        if let Some(tx_hash) = known {
            tracing::debug!(%tx_hash, "Intent already broadcast, reusing transaction hash");
            return Ok(tx_hash);
        }

        let params = serde_json::to_value(intent)
            .map_err(|e| ChainError::Malformed(format!("failed to encode intent: {e}")))?;
        let tx_hash: TxHash = self.json_rpc_call("eth_sendTransaction", vec![params]).await?;

        self.broadcasts
            .lock()
            .expect("broadcast cache lock poisoned")
            .insert(digest, tx_hash);

        tracing::debug!(%tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        (|| async { self.receipt_once(tx_hash).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(CONFIRMATION_POLL_INTERVAL)
                    .with_max_times(CONFIRMATION_POLL_ATTEMPTS),
            )
            .when(|e| matches!(e, ChainError::Pending(_) | ChainError::Transport(_)))
            .notify(|error, after| {
                tracing::trace!(%error, ?after, "Transaction not confirmed yet, retrying...");
            })
            .await
            .map_err(|e| match e {
                ChainError::Pending(hash) => ChainError::ConfirmationTimeout(hash),
                other => other,
            })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.json_rpc_call(
            "eth_call",
            vec![
                serde_json::json!({ "to": to, "data": data }),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
        self.json_rpc_call(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }
}

/// Receipt shape returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    status: u64,
    contract_address: Option<Address>,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
}

impl From<RawReceipt> for TxReceipt {
    fn from(raw: RawReceipt) -> Self {
        TxReceipt {
            tx_hash: raw.transaction_hash,
            ok: raw.status == 1,
            contract_address: raw.contract_address,
            block_number: raw.block_number,
        }
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deployment_receipt() {
        let raw: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x1",
            "contractAddress": "0x2222222222222222222222222222222222222222",
            "blockNumber": "0x10"
        }))
        .expect("receipt should parse");

        let receipt: TxReceipt = raw.into();
        assert!(receipt.ok);
        assert_eq!(receipt.contract_address, Some(Address::repeat_byte(0x22)));
        assert_eq!(receipt.block_number, 16);
    }

    #[test]
    fn test_parse_reverted_receipt() {
        let raw: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x0",
            "contractAddress": null,
            "blockNumber": "0xff"
        }))
        .expect("receipt should parse");

        let receipt: TxReceipt = raw.into();
        assert!(!receipt.ok);
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.block_number, 255);
    }

    #[test]
    fn test_deserialize_u64_from_hex_rejects_garbage() {
        #[derive(Debug, Deserialize)]
        struct Wrapper(#[serde(deserialize_with = "deserialize_u64_from_hex")] u64);

        assert!(serde_json::from_value::<Wrapper>(serde_json::json!("0xzz")).is_err());
        let parsed: Wrapper = serde_json::from_value(serde_json::json!("0x2a")).unwrap();
        assert_eq!(parsed.0, 42);
    }
}
