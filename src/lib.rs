//! Round-based collaborative story ledger.
//!
//! Participants stake value on text prompts, rounds move through submission
//! and voting phases, each finalization pays the winning author, and a shared
//! pot of accumulated fees is periodically handed to a randomly selected
//! voter by an external randomness service.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod guard;
pub mod pot;
pub mod round;
pub mod story;
pub mod treasury;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use events::LedgerEvent;
pub use gateway::{RandomnessGateway, SequentialCoordinator};
pub use pot::PendingDistribution;
pub use round::{Phase, Prompt, Round, RoundInfo};
pub use story::StoryLedger;
pub use treasury::{Treasury, ValueReceiver};
