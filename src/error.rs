use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("phase error: {0}")]
    Phase(String),

    #[error("Submission time ended")]
    SubmissionEnded,

    #[error("Voting time ended")]
    VotingEnded,

    #[error("deadline not reached: {0}")]
    DeadlineNotReached(String),

    #[error("insufficient stake: need {need}, have {have}")]
    InsufficientStake { need: u64, have: u64 },

    #[error("unknown prompt {prompt_id} in round {round_id}")]
    UnknownPrompt { round_id: u64, prompt_id: u32 },

    #[error("Nothing in pot")]
    EmptyPot,

    #[error("distribution request {request_id} already pending")]
    DistributionPending { request_id: u64 },

    #[error("ReentrancyGuard: reentrant call")]
    ReentrantCall,

    #[error("no pending distribution for request {request_id}")]
    RequestMismatch { request_id: u64 },

    #[error("transfer of {amount} to {recipient} rejected: {reason}")]
    TransferFailed {
        recipient: Uuid,
        amount: u64,
        reason: String,
    },

    #[error("pot {pot} exceeds held balance {held}")]
    PotOverdrawn { pot: u64, held: u64 },

    #[error("caller is not the owner")]
    NotOwner,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn phase(msg: impl Into<String>) -> Self {
        Self::Phase(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
