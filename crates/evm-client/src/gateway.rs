//! `ChainGateway` implementation over JSON-RPC endpoints

use std::collections::HashMap;
use std::time::Instant;

use alloy_primitives::Bytes;
use async_trait::async_trait;
use serde_json::{json, Value};
use surety_core::{
    AppConfig, ChainGateway, ChainId, ContractCall, Error, ReceiptStatus, RpcError,
    SimulationOutcome, TxHash, TxReceipt,
};
use tokio::sync::RwLock;

use crate::revert::decode_revert;
use crate::rpc::{parse_hex_bytes, parse_hex_u64, JsonRpcClient};

/// Result of probing one configured endpoint
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub chain_id: ChainId,
    pub block_number: u64,
    pub latency_ms: u64,
}

/// Gateway routing calls to one JSON-RPC endpoint per configured chain.
///
/// The active chain mirrors the connected wallet and is set by the surface
/// when the wallet reports a switch; flows read it fresh on every
/// chain-sensitive step.
pub struct RpcGateway {
    clients: HashMap<ChainId, JsonRpcClient>,
    active: RwLock<ChainId>,
}

impl RpcGateway {
    /// Build from configuration. The first configured chain starts active.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let first = config
            .chains
            .first()
            .ok_or_else(|| Error::Config("at least one chain must be configured".into()))?;

        let clients = config
            .chains
            .iter()
            .map(|c| (c.chain_id, JsonRpcClient::new(&c.rpc_url)))
            .collect();

        Ok(Self {
            clients,
            active: RwLock::new(first.chain_id),
        })
    }

    /// Record a wallet network switch.
    pub async fn set_active_chain(&self, chain_id: ChainId) -> Result<(), RpcError> {
        if !self.clients.contains_key(&chain_id) {
            return Err(RpcError::ChainNotConfigured { chain_id });
        }
        let mut active = self.active.write().await;
        if *active != chain_id {
            tracing::info!(from = %active, to = %chain_id, "active chain switched");
        }
        *active = chain_id;
        Ok(())
    }

    /// Check an endpoint answers for the chain it is configured as.
    pub async fn probe(&self, chain_id: ChainId) -> Result<ProbeResult, RpcError> {
        let client = self.client(chain_id)?;
        let start = Instant::now();

        let reported: String = client.request("eth_chainId", json!([])).await?;
        let reported = parse_hex_u64(&reported)?;
        if reported != chain_id.as_u64() {
            return Err(RpcError::ParseError(format!(
                "endpoint {} answers for chain {} but is configured as {}",
                client.url(),
                reported,
                chain_id
            )));
        }

        let block: String = client.request("eth_blockNumber", json!([])).await?;
        Ok(ProbeResult {
            chain_id,
            block_number: parse_hex_u64(&block)?,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn client(&self, chain_id: ChainId) -> Result<&JsonRpcClient, RpcError> {
        self.clients
            .get(&chain_id)
            .ok_or(RpcError::ChainNotConfigured { chain_id })
    }
}

/// Wire shape of a call for `eth_call` / `eth_sendTransaction`
fn call_object(call: &ContractCall) -> Value {
    json!({
        "from": call.from,
        "to": call.to,
        "value": format!("{:#x}", call.value),
        "data": call.data.to_string(),
    })
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn call(&self, call: &ContractCall) -> Result<Bytes, RpcError> {
        let client = self.client(call.chain_id)?;
        let raw: String = client
            .request("eth_call", json!([call_object(call), "latest"]))
            .await?;
        Ok(Bytes::from(parse_hex_bytes(&raw)?))
    }

    async fn simulate(&self, call: &ContractCall) -> Result<SimulationOutcome, RpcError> {
        let client = self.client(call.chain_id)?;
        let outcome = client
            .request::<String>("eth_call", json!([call_object(call), "latest"]))
            .await;

        match outcome {
            Ok(_) => Ok(SimulationOutcome::Pass),
            // The node refusing the call is the simulation's answer, not a
            // transport failure
            Err(RpcError::ApiError { message, data, .. }) => {
                let payload = data.as_deref().and_then(|d| parse_hex_bytes(d).ok());
                Ok(SimulationOutcome::Reverted(decode_revert(
                    payload.as_deref(),
                    &message,
                )))
            }
            Err(other) => Err(other),
        }
    }

    async fn submit(&self, call: &ContractCall) -> Result<TxHash, RpcError> {
        let client = self.client(call.chain_id)?;
        let hash: String = client
            .request("eth_sendTransaction", json!([call_object(call)]))
            .await?;
        tracing::info!(chain = %call.chain_id, to = %call.to, tx = %hash, "transaction submitted");
        Ok(TxHash::new(hash))
    }

    async fn receipt(
        &self,
        chain_id: ChainId,
        tx: &TxHash,
    ) -> Result<Option<TxReceipt>, RpcError> {
        let client = self.client(chain_id)?;
        let raw: Option<Value> = client
            .request("eth_getTransactionReceipt", json!([tx.as_str()]))
            .await?;

        match raw {
            None => Ok(None),
            Some(value) => parse_receipt(&value).map(Some),
        }
    }

    async fn connected_chain_id(&self) -> Result<ChainId, RpcError> {
        Ok(*self.active.read().await)
    }
}

fn parse_receipt(value: &Value) -> Result<TxReceipt, RpcError> {
    let tx_hash = value["transactionHash"]
        .as_str()
        .ok_or_else(|| RpcError::ParseError("receipt missing transactionHash".into()))?;
    let block_number = value["blockNumber"]
        .as_str()
        .ok_or_else(|| RpcError::ParseError("receipt missing blockNumber".into()))?;
    let status = value["status"]
        .as_str()
        .ok_or_else(|| RpcError::ParseError("receipt missing status".into()))?;

    let status = match parse_hex_u64(status)? {
        1 => ReceiptStatus::Success,
        _ => ReceiptStatus::Reverted,
    };

    Ok(TxReceipt {
        tx_hash: TxHash::new(tx_hash),
        block_number: parse_hex_u64(block_number)?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use surety_core::ChainConfig;

    #[test]
    fn test_from_config_requires_a_chain() {
        let empty = AppConfig {
            chains: vec![],
            confirm_poll_secs: 4,
        };
        assert!(RpcGateway::from_config(&empty).is_err());
        assert!(RpcGateway::from_config(&AppConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_active_chain_tracks_wallet_switches() {
        let config = AppConfig {
            chains: vec![
                ChainConfig::new(ChainId::new(1), "http://localhost:8545"),
                ChainConfig::new(ChainId::new(8453), "http://localhost:8546"),
            ],
            confirm_poll_secs: 4,
        };
        let gateway = RpcGateway::from_config(&config).unwrap();

        assert_eq!(gateway.connected_chain_id().await.unwrap(), ChainId::new(1));
        gateway.set_active_chain(ChainId::new(8453)).await.unwrap();
        assert_eq!(
            gateway.connected_chain_id().await.unwrap(),
            ChainId::new(8453)
        );

        let unknown = gateway.set_active_chain(ChainId::new(10)).await;
        assert!(matches!(
            unknown,
            Err(RpcError::ChainNotConfigured { .. })
        ));
    }

    #[test]
    fn test_call_object_wire_shape() {
        let call = ContractCall::new(
            ChainId::new(1),
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            Bytes::from(vec![0xde, 0xad]),
        );
        let wire = call_object(&call);
        assert_eq!(wire["data"], "0xdead");
        assert_eq!(wire["value"], "0x0");
    }

    #[test]
    fn test_parse_receipt() {
        let value = serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1",
        });
        let receipt = parse_receipt(&value).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.status, ReceiptStatus::Success);

        let reverted = serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x0",
        });
        assert_eq!(
            parse_receipt(&reverted).unwrap().status,
            ReceiptStatus::Reverted
        );
    }
}
