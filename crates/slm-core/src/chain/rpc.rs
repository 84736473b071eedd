//! Ethereum JSON-RPC client over HTTP

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::abi;
use super::LicenseChain;
use crate::network::NetworkConfig;
use crate::royalty::{decode_legacy_history, ManagerSnapshot};
use crate::rules::is_valid_address;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    network_name: String,
}

impl RpcClient {
    pub fn new(url: &str, network_name: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))?;
        Ok(RpcClient {
            client,
            url: url.to_string(),
            network_name: network_name.to_string(),
        })
    }

    pub fn from_network(config: &NetworkConfig) -> Result<Self> {
        Self::new(config.require_rpc_url()?, &config.name, DEFAULT_TIMEOUT)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a JSON-RPC request and return the `result` field
    pub async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                Error::ConnectivityError(format!("{} ({}): {}", self.network_name, self.url, reason))
            })?;

        if !resp.status().is_success() {
            return Err(Error::ConnectivityError(format!(
                "{} ({}): HTTP {}",
                self.network_name,
                self.url,
                resp.status()
            )));
        }

        let json: Value = resp.json().await.map_err(|e| {
            Error::ConnectivityError(format!(
                "{}: invalid JSON-RPC response: {}",
                self.network_name, e
            ))
        })?;

        if let Some(error) = json.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(Error::ContractCallError {
                method: method.to_string(),
                address: self.url.clone(),
                reason: msg.to_string(),
            });
        }

        json.get("result").cloned().ok_or_else(|| {
            Error::ConnectivityError(format!(
                "{}: JSON-RPC response missing 'result' field",
                self.network_name
            ))
        })
    }

    /// `eth_call` of an argument-less view function; returns the raw return data
    pub async fn call(&self, address: &str, signature: &str) -> Result<Vec<u8>> {
        if !is_valid_address(address) {
            return Err(Error::ContractCallError {
                method: signature.to_string(),
                address: address.to_string(),
                reason: "invalid contract address".into(),
            });
        }
        let params = serde_json::json!([
            { "to": address, "data": abi::encode_call(signature) },
            "latest"
        ]);
        let result = self.rpc_call("eth_call", params).await.map_err(|e| match e {
            Error::ContractCallError { reason, .. } => Error::ContractCallError {
                method: signature.to_string(),
                address: address.to_string(),
                reason,
            },
            other => other,
        })?;

        let data = result
            .as_str()
            .ok_or_else(|| call_error(signature, address, "result is not a hex string"))
            .and_then(abi::decode_hex)?;
        if data.is_empty() {
            // Calls to an address without code return 0x
            return Err(call_error(signature, address, "empty return data (no contract at address?)"));
        }
        Ok(data)
    }

    async fn call_decoded<T>(
        &self,
        address: &str,
        signature: &str,
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        let data = self.call(address, signature).await?;
        decode(&data).map_err(|e| call_error(signature, address, &e.to_string()))
    }
}

fn call_error(method: &str, address: &str, reason: &str) -> Error {
    Error::ContractCallError {
        method: method.to_string(),
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_quantity(value: &Value) -> Result<u64> {
    value
        .as_str()
        .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
        .ok_or_else(|| Error::ParseError(format!("invalid hex quantity: {}", value)))
}

#[async_trait]
impl LicenseChain for RpcClient {
    async fn block_number(&self) -> Result<u64> {
        let value = self.rpc_call("eth_blockNumber", serde_json::json!([])).await?;
        parse_quantity(&value)
    }

    async fn accounts(&self) -> Result<Vec<String>> {
        let value = self.rpc_call("eth_accounts", serde_json::json!([])).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn active_licensee_licenses(&self, entity: &str) -> Result<Vec<String>> {
        self.call_decoded(entity, "getActiveLicenseeSLs()", abi::decode_address_array)
            .await
    }

    async fn manager_snapshot(&self, manager: &str) -> Result<ManagerSnapshot> {
        let licensee = self
            .call_decoded(manager, "getLicensee()", abi::decode_address)
            .await?;
        let licensor = self
            .call_decoded(manager, "getLicensor()", abi::decode_address)
            .await?;
        let is_active = self
            .call_decoded(manager, "isActive()", abi::decode_bool)
            .await?;
        let history = self
            .call_decoded(
                manager,
                "getRoyaltyHistoryLegacyDapp()",
                abi::decode_uint_array,
            )
            .await?;
        let royalties = decode_legacy_history(&history)
            .map_err(|e| call_error("getRoyaltyHistoryLegacyDapp()", manager, &e.to_string()))?;

        Ok(ManagerSnapshot {
            manager_address: manager.to_string(),
            licensor,
            licensee,
            is_active,
            royalties,
        })
    }

    async fn entity_name(&self, entity: &str) -> Result<String> {
        self.call_decoded(entity, "name()", abi::decode_string).await
    }
}
