//! Confirmation tracking
//!
//! Polls for a receipt until the transaction is mined. There is deliberately
//! no deadline: a submitted transaction stays pending until the chain or the
//! user's wallet resolves it, and transport hiccups must not abandon the
//! wait. Transient errors are logged and retried; only permanent errors
//! (unparseable responses, unconfigured chains) end the wait early.

use std::time::Duration;

use surety_core::{ChainGateway, ChainId, RpcError, TxHash, TxReceipt};

/// Poll until the transaction is mined and return its receipt.
pub async fn wait_mined(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    tx: &TxHash,
    poll: Duration,
) -> Result<TxReceipt, RpcError> {
    let mut polls: u64 = 0;
    loop {
        match gateway.receipt(chain_id, tx).await {
            Ok(Some(receipt)) => {
                tracing::info!(tx = %tx, block = receipt.block_number, status = ?receipt.status, "transaction mined");
                return Ok(receipt);
            }
            Ok(None) => {
                polls += 1;
                if polls % 15 == 0 {
                    tracing::debug!(tx = %tx, polls, "still waiting for confirmation");
                }
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(tx = %tx, error = %e, "receipt poll failed, retrying");
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use surety_core::{ContractCall, ReceiptStatus, SimulationOutcome};

    /// Gateway that replays a scripted sequence of receipt responses
    struct ScriptedReceipts {
        responses: Mutex<VecDeque<Result<Option<TxReceipt>, RpcError>>>,
    }

    #[async_trait]
    impl ChainGateway for ScriptedReceipts {
        async fn call(&self, _call: &ContractCall) -> Result<Bytes, RpcError> {
            unimplemented!("not used")
        }

        async fn simulate(&self, _call: &ContractCall) -> Result<SimulationOutcome, RpcError> {
            unimplemented!("not used")
        }

        async fn submit(&self, _call: &ContractCall) -> Result<TxHash, RpcError> {
            unimplemented!("not used")
        }

        async fn receipt(
            &self,
            _chain_id: ChainId,
            _tx: &TxHash,
        ) -> Result<Option<TxReceipt>, RpcError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn connected_chain_id(&self) -> Result<ChainId, RpcError> {
            Ok(ChainId::new(1))
        }
    }

    fn mined(block: u64) -> TxReceipt {
        TxReceipt {
            tx_hash: TxHash::new("0xabc"),
            block_number: block,
            status: ReceiptStatus::Success,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_through_pending_polls() {
        let gateway = ScriptedReceipts {
            responses: Mutex::new(VecDeque::from([Ok(None), Ok(None), Ok(Some(mined(77)))])),
        };

        let receipt = wait_mined(
            &gateway,
            ChainId::new(1),
            &TxHash::new("0xabc"),
            Duration::from_secs(4),
        )
        .await
        .unwrap();
        assert_eq!(receipt.block_number, 77);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_through_transport_errors() {
        let gateway = ScriptedReceipts {
            responses: Mutex::new(VecDeque::from([
                Err(RpcError::Timeout {
                    method: "eth_getTransactionReceipt".into(),
                }),
                Ok(Some(mined(12))),
            ])),
        };

        let receipt = wait_mined(
            &gateway,
            ChainId::new(1),
            &TxHash::new("0xabc"),
            Duration::from_secs(4),
        )
        .await
        .unwrap();
        assert_eq!(receipt.block_number, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_ends_wait() {
        let gateway = ScriptedReceipts {
            responses: Mutex::new(VecDeque::from([Err(RpcError::ParseError(
                "bad receipt".into(),
            ))])),
        };

        let result = wait_mined(
            &gateway,
            ChainId::new(1),
            &TxHash::new("0xabc"),
            Duration::from_secs(4),
        )
        .await;
        assert!(matches!(result, Err(RpcError::ParseError(_))));
    }
}
