use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

const BPS_DENOMINATOR: u64 = 10_000;

/// Ledger parameters. Defaults mirror the reference deployment: 3-hour
/// submission and voting windows, a 100-winner distribution threshold, and a
/// 1-day idle timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Minimum stake to submit a prompt, in base units.
    pub prompt_fee: u64,
    /// Minimum stake to vote on a prompt.
    pub vote_fee: u64,
    /// Minimum stake to post a shout-out.
    pub shout_fee: u64,
    /// Share of each vote and shout-out paid to the owner at call time, in
    /// basis points.
    pub dev_fee_bps: u64,
    /// Share of a round's collected value kept for the pot at finalization,
    /// in basis points.
    pub pot_fee_bps: u64,
    pub submission_window_secs: i64,
    pub voting_window_secs: i64,
    pub idle_timeout_secs: i64,
    /// Finalized winners between pot distribution requests.
    pub distribution_threshold: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            prompt_fee: 100_000,
            vote_fee: 50_000,
            shout_fee: 10_000,
            dev_fee_bps: 500,
            pot_fee_bps: 1_000,
            submission_window_secs: 3 * 3600,
            voting_window_secs: 3 * 3600,
            idle_timeout_secs: 24 * 3600,
            distribution_threshold: 100,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.submission_window_secs <= 0 || self.voting_window_secs <= 0 {
            return Err(LedgerError::config("phase windows must be positive"));
        }
        if self.idle_timeout_secs <= 0 {
            return Err(LedgerError::config("idle timeout must be positive"));
        }
        if self.distribution_threshold == 0 {
            return Err(LedgerError::config(
                "distribution threshold must be at least 1",
            ));
        }
        if self.dev_fee_bps > BPS_DENOMINATOR || self.pot_fee_bps > BPS_DENOMINATOR {
            return Err(LedgerError::config("fee shares cannot exceed 10000 bps"));
        }
        Ok(())
    }

    pub fn submission_window(&self) -> Duration {
        Duration::seconds(self.submission_window_secs)
    }

    pub fn voting_window(&self) -> Duration {
        Duration::seconds(self.voting_window_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::seconds(self.idle_timeout_secs)
    }

    /// Owner's immediate cut of a vote or shout-out stake.
    pub fn dev_cut(&self, amount: u64) -> u64 {
        share(amount, self.dev_fee_bps)
    }

    /// Pot's cut of a round's collected value.
    pub fn pot_cut(&self, amount: u64) -> u64 {
        share(amount, self.pot_fee_bps)
    }
}

fn share(amount: u64, bps: u64) -> u64 {
    ((amount as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        LedgerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_excessive_fee_share() {
        let config = LedgerConfig {
            dev_fee_bps: 10_001,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_threshold() {
        let config = LedgerConfig {
            distribution_threshold: 0,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn fee_shares_round_down() {
        let config = LedgerConfig::default();
        assert_eq!(config.dev_cut(200_000), 10_000);
        assert_eq!(config.pot_cut(290_000), 29_000);
        assert_eq!(config.dev_cut(3), 0);
    }
}
