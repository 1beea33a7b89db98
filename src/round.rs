use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Lifecycle of a round. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Submission,
    Voting,
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Submission => "Submission",
            Phase::Voting => "Voting",
            Phase::Finalized => "Finalized",
        };
        f.write_str(name)
    }
}

/// A text contribution competing for a round's payout.
///
/// Prompt ids are 0-based and assigned in submission order. `total_stake` and
/// the per-voter map carry gross vote amounts and are only mutated while the
/// round is in the Voting phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: u32,
    pub author: Uuid,
    pub text: String,
    pub total_stake: u64,
    pub voter_stakes: BTreeMap<Uuid, u64>,
}

impl Prompt {
    fn new(id: u32, author: Uuid, text: String) -> Self {
        Self {
            id,
            author,
            text,
            total_stake: 0,
            voter_stakes: BTreeMap::new(),
        }
    }

    pub(crate) fn add_vote(&mut self, voter: Uuid, amount: u64) -> Result<()> {
        self.total_stake = self
            .total_stake
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("prompt stake overflow"))?;
        let entry = self.voter_stakes.entry(voter).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::internal("voter stake overflow"))?;
        Ok(())
    }
}

/// One submission → voting → finalization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    pub phase: Phase,
    pub submission_deadline: DateTime<Utc>,
    pub voting_deadline: Option<DateTime<Utc>>,
    pub prompts: Vec<Prompt>,
    /// Net value custodied for this round: prompt stakes plus vote stakes
    /// minus the owner cuts already paid out.
    pub collected: u64,
    pub winning_prompt: Option<u32>,
}

impl Round {
    pub(crate) fn open(id: u64, now: DateTime<Utc>, submission_window: Duration) -> Self {
        Self {
            id,
            phase: Phase::Submission,
            submission_deadline: now + submission_window,
            voting_deadline: None,
            prompts: Vec::new(),
            collected: 0,
            winning_prompt: None,
        }
    }

    pub(crate) fn add_prompt(&mut self, author: Uuid, text: String) -> u32 {
        let id = self.prompts.len() as u32;
        self.prompts.push(Prompt::new(id, author, text));
        id
    }

    pub(crate) fn prompt_mut(&mut self, prompt_id: u32) -> Result<&mut Prompt> {
        let round_id = self.id;
        self.prompts
            .get_mut(prompt_id as usize)
            .ok_or(LedgerError::UnknownPrompt {
                round_id,
                prompt_id,
            })
    }

    /// Highest total stake wins; the earliest submitted prompt wins ties.
    pub fn leading_prompt(&self) -> Option<&Prompt> {
        let mut best: Option<&Prompt> = None;
        for prompt in &self.prompts {
            match best {
                Some(current) if prompt.total_stake <= current.total_stake => {}
                _ => best = Some(prompt),
            }
        }
        best
    }

    pub fn info(&self) -> RoundInfo {
        RoundInfo {
            id: self.id,
            phase: self.phase,
            submission_deadline: self.submission_deadline,
            voting_deadline: self.voting_deadline,
            prompt_count: self.prompts.len(),
            collected: self.collected,
            winning_prompt: self.winning_prompt,
        }
    }
}

/// Read-only snapshot of a round for display and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfo {
    pub id: u64,
    pub phase: Phase,
    pub submission_deadline: DateTime<Utc>,
    pub voting_deadline: Option<DateTime<Utc>>,
    pub prompt_count: usize,
    pub collected: u64,
    pub winning_prompt: Option<u32>,
}
