//! Drives flows through approve-confirm-act

use std::sync::Arc;
use std::time::Duration;

use evm_client::receipts;
use surety_core::{
    ChainGateway, ContractCall, DecodedError, MarketError, ReceiptStatus, SimulationOutcome,
    TxHash, TxReceipt,
};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::FlowError;
use crate::flow::ApprovalThenAction;
use crate::state::TransactionState;

/// One approval plus one re-check. A confirmed approval that still leaves
/// the allowance short means the token is rewriting approvals; looping on
/// it would burn fees forever.
pub const MAX_APPROVAL_ROUNDS: usize = 2;

/// How long `Success` stays observable before the machine returns to idle,
/// so the user can actually read the confirmation.
pub const SUCCESS_LINGER_SECS: u64 = 3;

/// Runs [`ApprovalThenAction`] flows and publishes [`TransactionState`]
/// over a watch channel for surfaces to observe.
///
/// Each flow instance owns its own engine; there is no shared mutable
/// state between concurrent marketplace actions.
pub struct FlowEngine {
    gateway: Arc<dyn ChainGateway>,
    state_tx: watch::Sender<TransactionState>,
    poll: Duration,
}

impl FlowEngine {
    pub fn new(gateway: Arc<dyn ChainGateway>, poll: Duration) -> Self {
        let (state_tx, _) = watch::channel(TransactionState::Idle);
        Self {
            gateway,
            state_tx,
            poll,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> TransactionState {
        self.state_tx.borrow().clone()
    }

    /// Return to `Idle` from a settled state. In-flight attempts cannot be
    /// cancelled; a broadcast transaction is out of our hands.
    pub fn reset(&self) {
        self.state_tx.send_if_modified(|state| {
            if state.is_busy() {
                warn!(%state, "ignoring reset while a transaction is in flight");
                return false;
            }
            if *state == TransactionState::Idle {
                return false;
            }
            *state = TransactionState::Idle;
            true
        });
    }

    /// Run one attempt to completion. The returned receipt is the confirmed
    /// economic action, never the approval.
    pub async fn run(&self, flow: &dyn ApprovalThenAction) -> Result<TxReceipt, FlowError> {
        let attempt = Uuid::new_v4();
        let span = info_span!("flow", %attempt, action = %flow.describe());
        self.run_inner(flow).instrument(span).await
    }

    async fn run_inner(&self, flow: &dyn ApprovalThenAction) -> Result<TxReceipt, FlowError> {
        if self.state().is_busy() {
            return Err(FlowError::Blocked(MarketError::ActionNotAllowed {
                reason: "another transaction is already in flight".to_string(),
            }));
        }

        // A tripped guard never starts the machine; the surface shows the
        // reason next to a disabled submit control and we stay idle.
        flow.preflight().await?;

        let mut rounds = 0;
        loop {
            let need = match flow.allowance_shortfall().await {
                Ok(None) => break,
                Ok(Some(need)) => need,
                Err(err) => return Err(self.fail(err)),
            };
            if rounds == MAX_APPROVAL_ROUNDS {
                return Err(self.fail(FlowError::AllowanceUnchanged));
            }
            rounds += 1;

            self.set(TransactionState::Approving);
            info!(
                token = %need.token,
                spender = %need.spender,
                required = %need.required,
                current = %need.current,
                "allowance short, approving"
            );
            let call = match flow.approval_call(&need).await {
                Ok(call) => call,
                Err(err) => return Err(self.fail(err)),
            };
            let tx = match self.simulate_then_submit(&call).await {
                Ok(tx) => tx,
                Err(err) => return Err(self.fail(err)),
            };

            self.set(TransactionState::Confirming);
            if let Err(err) = self.confirm(&call, &tx).await {
                return Err(self.fail(err));
            }
            // Back to the top: the allowance is re-fetched now that the
            // approval has landed, rather than assumed.
        }

        self.set(TransactionState::Creating);
        let call = match flow.action_call().await {
            Ok(call) => call,
            Err(err) => return Err(self.fail(err)),
        };
        let tx = match self.simulate_then_submit(&call).await {
            Ok(tx) => tx,
            Err(err) => return Err(self.fail(err)),
        };
        let receipt = match self.confirm(&call, &tx).await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(err)),
        };

        self.set(TransactionState::Success);
        self.schedule_idle_after_linger();
        Ok(receipt)
    }

    /// Dry-run, then broadcast the very same call value. Anything the
    /// simulation rejects is never submitted.
    async fn simulate_then_submit(&self, call: &ContractCall) -> Result<TxHash, FlowError> {
        match self.gateway.simulate(call).await? {
            SimulationOutcome::Pass => {}
            SimulationOutcome::Reverted(decoded) => {
                warn!(to = %call.to, reason = %decoded, "dry run rejected the transaction");
                return Err(FlowError::SimulationRejected(decoded));
            }
        }
        let tx = self.gateway.submit(call).await?;
        info!(%tx, to = %call.to, "transaction submitted");
        Ok(tx)
    }

    /// Wait for the transaction to land. There is no deadline; the user or
    /// their wallet abandons stuck transactions, not this client.
    async fn confirm(&self, call: &ContractCall, tx: &TxHash) -> Result<TxReceipt, FlowError> {
        let receipt =
            receipts::wait_mined(self.gateway.as_ref(), call.chain_id, tx, self.poll).await?;
        if receipt.status == ReceiptStatus::Reverted {
            // Re-run the simulation once to salvage a readable reason for
            // the revert; the receipt itself carries none.
            let reason = match self.gateway.simulate(call).await {
                Ok(SimulationOutcome::Reverted(decoded)) => decoded,
                _ => DecodedError::Unknown {
                    raw: format!("transaction {} reverted on chain", tx),
                },
            };
            return Err(FlowError::Reverted(reason));
        }
        info!(%tx, block = receipt.block_number, "transaction confirmed");
        Ok(receipt)
    }

    fn fail(&self, err: FlowError) -> FlowError {
        if err.resets_to_idle() {
            info!(error = %err, "attempt abandoned in the wallet");
            self.set(TransactionState::Idle);
        } else {
            warn!(error = %err, "flow failed");
            self.set(TransactionState::failed(err.to_string()));
        }
        err
    }

    fn set(&self, state: TransactionState) {
        debug!(%state, "state transition");
        self.state_tx.send_replace(state);
    }

    fn schedule_idle_after_linger(&self) {
        let sender = self.state_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(SUCCESS_LINGER_SECS)).await;
            sender.send_if_modified(|state| {
                if *state == TransactionState::Success {
                    *state = TransactionState::Idle;
                    return true;
                }
                false
            });
        });
    }
}
