use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Recipient-side handler invoked when value is transferred to an account.
///
/// A handler may call back into the ledger. Returning an error rejects the
/// transfer, which aborts the paying operation.
#[async_trait]
pub trait ValueReceiver: Send + Sync {
    async fn on_receive(&self, amount: u64) -> Result<()>;
}

/// Custodies staked value and performs outbound transfers.
///
/// The treasury never initiates a transfer on its own; it moves value only on
/// explicit instruction from the ledger.
#[derive(Default)]
pub struct Treasury {
    held: Mutex<u64>,
    accounts: Mutex<BTreeMap<Uuid, u64>>,
    receivers: RwLock<HashMap<Uuid, Arc<dyn ValueReceiver>>>,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records value arriving with a call.
    pub(crate) fn deposit(&self, amount: u64) -> Result<()> {
        let mut held = self.held.lock();
        *held = held
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("held balance overflow"))?;
        Ok(())
    }

    /// Returns value that arrived with a call that is now aborting.
    pub(crate) fn release(&self, amount: u64) -> Result<()> {
        let mut held = self.held.lock();
        *held = held
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::internal("held balance underflow"))?;
        Ok(())
    }

    /// Value currently in custody.
    pub fn held(&self) -> u64 {
        *self.held.lock()
    }

    /// Value credited to an external account so far.
    pub fn balance_of(&self, account: Uuid) -> u64 {
        self.accounts.lock().get(&account).copied().unwrap_or(0)
    }

    pub fn register_receiver(&self, account: Uuid, receiver: Arc<dyn ValueReceiver>) {
        self.receivers.write().insert(account, receiver);
    }

    pub fn remove_receiver(&self, account: Uuid) {
        self.receivers.write().remove(&account);
    }

    /// Moves `amount` out of custody to `recipient`.
    ///
    /// The recipient's handler runs before any balance changes, so a rejected
    /// transfer leaves custody untouched.
    pub(crate) async fn transfer(&self, recipient: Uuid, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let held = self.held();
        if held < amount {
            return Err(LedgerError::internal(format!(
                "treasury holds {held} but owes {amount}"
            )));
        }

        let receiver = self.receivers.read().get(&recipient).cloned();
        if let Some(receiver) = receiver {
            receiver
                .on_receive(amount)
                .await
                .map_err(|err| LedgerError::TransferFailed {
                    recipient,
                    amount,
                    reason: err.to_string(),
                })?;
        }

        self.release(amount)?;
        let mut accounts = self.accounts.lock();
        let entry = accounts.entry(recipient).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("recipient balance overflow"))?;

        tracing::debug!("transferred {} to {}", amount, recipient);
        Ok(())
    }
}
