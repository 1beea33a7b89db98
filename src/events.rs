use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observable side effects of ledger operations, recorded in emission order.
///
/// Vote and shout-out amounts are the gross stake attached to the call, before
/// the owner's cut is split off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PromptSubmitted {
        round_id: u64,
        prompt_id: u32,
        author: Uuid,
        text: String,
    },
    VoteCast {
        round_id: u64,
        prompt_id: u32,
        voter: Uuid,
        amount: u64,
    },
    RoundFinalized {
        round_id: u64,
        winning_prompt_id: u32,
        winning_text: String,
    },
    ShoutOut {
        author: Uuid,
        text: String,
        amount: u64,
    },
    DistributionRequested {
        request_id: u64,
        total_stake: u64,
    },
    PotDistributed {
        request_id: u64,
        recipient: Uuid,
        amount: u64,
    },
}
