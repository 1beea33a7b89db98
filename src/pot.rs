use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Snapshot of the eligible voters for one outstanding distribution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDistribution {
    pub request_id: u64,
    /// (voter, cumulative stake) pairs in deterministic window order.
    pub snapshot: Vec<(Uuid, u64)>,
    pub total_stake: u64,
}

impl PendingDistribution {
    /// Maps a random word into the snapshot's cumulative-weight buckets.
    /// Returns `None` when the snapshot holds no stake.
    pub fn select(&self, word: u64) -> Option<Uuid> {
        if self.total_stake == 0 {
            return None;
        }
        let mut target = word % self.total_stake;
        for (voter, stake) in &self.snapshot {
            if target < *stake {
                return Some(*voter);
            }
            target -= stake;
        }
        None
    }
}

/// Pot custody bookkeeping: the shared balance, the winner counter, the idle
/// timer, and the accumulation window feeding the next distribution snapshot.
#[derive(Debug)]
pub struct PotBook {
    pot: u64,
    winner_counter: u32,
    window: BTreeMap<Uuid, u64>,
    pending: Option<PendingDistribution>,
    last_activity: DateTime<Utc>,
}

impl PotBook {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            pot: 0,
            winner_counter: 0,
            window: BTreeMap::new(),
            pending: None,
            last_activity: now,
        }
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn winner_counter(&self) -> u32 {
        self.winner_counter
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn pending(&self) -> Option<&PendingDistribution> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self, request_id: u64) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |pending| pending.request_id == request_id)
    }

    pub(crate) fn credit(&mut self, amount: u64) -> Result<()> {
        self.pot = self
            .pot
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("pot overflow"))?;
        Ok(())
    }

    /// Adds a voter's stake to the current accumulation window.
    pub(crate) fn record_contribution(&mut self, voter: Uuid, amount: u64) -> Result<()> {
        let entry = self.window.entry(voter).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("window stake overflow"))?;
        Ok(())
    }

    pub(crate) fn count_winner(&mut self) -> u32 {
        self.winner_counter += 1;
        self.winner_counter
    }

    pub(crate) fn reset_counter(&mut self) {
        self.winner_counter = 0;
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Drains the accumulation window into a pending request snapshot.
    /// Returns the snapshot size and total stake.
    pub(crate) fn open_request(&mut self, request_id: u64) -> Result<(usize, u64)> {
        let mut total: u64 = 0;
        for stake in self.window.values() {
            total = total
                .checked_add(*stake)
                .ok_or_else(|| LedgerError::internal("snapshot stake overflow"))?;
        }
        let snapshot: Vec<(Uuid, u64)> = std::mem::take(&mut self.window).into_iter().collect();
        let entries = snapshot.len();
        self.pending = Some(PendingDistribution {
            request_id,
            snapshot,
            total_stake: total,
        });
        Ok((entries, total))
    }

    pub(crate) fn clear_request(&mut self) -> Option<PendingDistribution> {
        self.pending.take()
    }

    /// Empties the pot, returning the drained amount.
    pub(crate) fn drain_pot(&mut self) -> u64 {
        std::mem::take(&mut self.pot)
    }
}
