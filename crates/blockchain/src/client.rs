use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::config::SolanaConfig;
use shared::models::{SolBalance, TokenHolding, TransactionSummary};
use shared::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::types::{
    KeyedTokenAccount, RpcContextValue, RpcRequest, RpcResponse, SignatureInfo, JSONRPC_VERSION,
    SPL_TOKEN_PROGRAM_ID,
};

/// Read-only view of a Solana node, as consumed by the wallet tracker.
///
/// Every call is a single request/response with no retry. Failures are
/// returned to the caller unchanged.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// SOL balance of `address` at the configured commitment
    async fn get_balance(&self, address: &str) -> Result<SolBalance>;

    /// All SPL token accounts owned by `address`, in node order
    async fn get_token_accounts(&self, address: &str) -> Result<Vec<TokenHolding>>;

    /// At most `limit` most recent signatures touching `address`
    async fn get_transaction_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>>;

    /// Raw `getTransaction` result, `Value::Null` if the node has none
    async fn get_transaction(&self, signature: &str) -> Result<Value>;

    /// Raw `getAccountInfo` result
    async fn get_account_info(&self, address: &str) -> Result<Value>;
}

/// JSON-RPC 2.0 client bound to a single Solana endpoint
pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
    commitment: String,
    request_id: AtomicU64,
}

impl SolanaRpcClient {
    /// Create a new client for `rpc_url` using `confirmed` commitment
    pub fn new(rpc_url: String) -> Self {
        Self::from_config(&SolanaConfig {
            rpc_url,
            ..SolanaConfig::default()
        })
    }

    pub fn from_config(config: &SolanaConfig) -> Self {
        info!("Initializing Solana RPC client for {}", config.rpc_url);

        Self {
            client: Client::new(),
            rpc_url: config.rpc_url.clone(),
            commitment: config.commitment.clone(),
            request_id: AtomicU64::new(0),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Issue one JSON-RPC call and decode its `result` into `T`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_request_id(),
            method,
            params,
        };

        debug!("RPC {} (id {}) -> {}", method, request.id, self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("RPC call {} failed to send: {}", method, e);
                Error::SolanaRpc(format!("{} request failed: {}", method, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("RPC call {} returned HTTP {}", method, status);
            return Err(Error::SolanaRpc(format!(
                "{} request failed: HTTP {}",
                method, status
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            Error::SolanaRpc(format!("{} returned an unreadable body: {}", method, e))
        })?;

        if let Some(err) = body.error {
            warn!("RPC call {} returned error {}: {}", method, err.code, err.message);
            return Err(Error::SolanaRpc(format!(
                "{} failed with code {}: {}",
                method, err.code, err.message
            )));
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null)).map_err(|e| {
            Error::SolanaRpc(format!("{} returned an unexpected result: {}", method, e))
        })
    }
}

/// UI amount derived from the raw integer amount, so that
/// `ui_amount == raw / 10^decimals` holds for every holding.
fn ui_amount(raw_amount: &str, decimals: u8, reported: Option<f64>) -> f64 {
    shared::format::format_token_amount(raw_amount, decimals)
        .or(reported)
        .unwrap_or(0.0)
}

#[async_trait]
impl SolanaRpc for SolanaRpcClient {
    async fn get_balance(&self, address: &str) -> Result<SolBalance> {
        debug!("Fetching SOL balance for address: {}", address);

        let result: RpcContextValue<u64> = self
            .call(
                "getBalance",
                vec![json!(address), json!({ "commitment": self.commitment })],
            )
            .await?;

        Ok(SolBalance::from_lamports(result.value))
    }

    async fn get_token_accounts(&self, address: &str) -> Result<Vec<TokenHolding>> {
        debug!("Fetching token accounts for address: {}", address);

        let result: RpcContextValue<Vec<KeyedTokenAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                vec![
                    json!(address),
                    json!({ "programId": SPL_TOKEN_PROGRAM_ID }),
                    json!({ "encoding": "jsonParsed" }),
                ],
            )
            .await?;

        let holdings = result
            .value
            .into_iter()
            .map(|keyed| {
                let info = keyed.account.data.parsed.info;
                let amount = info.token_amount;
                TokenHolding {
                    account_address: keyed.pubkey,
                    mint: info.mint,
                    owner_address: info.owner,
                    ui_amount: ui_amount(&amount.amount, amount.decimals, amount.ui_amount),
                    raw_amount: amount.amount,
                    decimals: amount.decimals,
                }
            })
            .collect::<Vec<_>>();

        debug!("Found {} token accounts for {}", holdings.len(), address);
        Ok(holdings)
    }

    async fn get_transaction_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>> {
        debug!("Fetching up to {} signatures for address: {}", limit, address);

        let result: Vec<SignatureInfo> = self
            .call(
                "getSignaturesForAddress",
                vec![json!(address), json!({ "limit": limit })],
            )
            .await?;

        Ok(result
            .into_iter()
            .take(limit)
            .map(|sig| TransactionSummary {
                signature: sig.signature,
                slot: sig.slot,
                block_time: sig.block_time,
                err: sig.err,
                memo: sig.memo.filter(|m| !m.is_empty()),
            })
            .collect())
    }

    async fn get_transaction(&self, signature: &str) -> Result<Value> {
        self.call(
            "getTransaction",
            vec![
                json!(signature),
                json!({ "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }),
            ],
        )
        .await
    }

    async fn get_account_info(&self, address: &str) -> Result<Value> {
        self.call(
            "getAccountInfo",
            vec![json!(address), json!({ "encoding": "jsonParsed" })],
        )
        .await
    }
}
