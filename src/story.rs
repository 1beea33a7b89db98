use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::gateway::RandomnessGateway;
use crate::guard::ReentrancyGuard;
use crate::pot::PotBook;
use crate::round::{Phase, Round, RoundInfo};
use crate::treasury::{Treasury, ValueReceiver};

/// The round ledger.
///
/// One instance owns the current round, the finalized-round history, the pot,
/// and custody of all staked value. Entry points follow a fixed discipline:
/// acquire the reentrancy guard, validate under the state lock, perform any
/// outbound transfer with the lock released, then commit. A failed transfer
/// therefore aborts the call with no state change, and a recipient handler
/// that calls back in is stopped by the guard.
pub struct StoryLedger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn RandomnessGateway>,
    treasury: Treasury,
    guard: ReentrancyGuard,
    state: Mutex<LedgerState>,
    events: Mutex<Vec<LedgerEvent>>,
}

struct LedgerState {
    owner: Uuid,
    round: Round,
    history: Vec<Round>,
    pot: PotBook,
}

struct FinalizePlan {
    round_id: u64,
    /// (prompt id, author, text, payout) of the winning prompt, if any.
    winner: Option<(u32, Uuid, String, u64)>,
    pot_fee: u64,
    will_request: bool,
}

impl StoryLedger {
    pub fn new(
        config: LedgerConfig,
        owner: Uuid,
        gateway: Arc<dyn RandomnessGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        let state = LedgerState {
            owner,
            round: Round::open(1, now, config.submission_window()),
            history: Vec::new(),
            pot: PotBook::new(now),
        };

        tracing::info!("ledger created, round 1 open for submissions");
        Ok(Self {
            config,
            clock,
            gateway,
            treasury: Treasury::new(),
            guard: ReentrancyGuard::default(),
            state: Mutex::new(state),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Submits a prompt to the current round and returns its assigned id.
    pub async fn submit_prompt(
        &self,
        author: Uuid,
        text: impl Into<String>,
        stake: u64,
    ) -> Result<u32> {
        let _entry = self.guard.enter()?;
        let text = text.into();
        let now = self.clock.now();

        let (round_id, prompt_id) = {
            let mut state = self.state.lock();
            let round = &mut state.round;
            if round.phase != Phase::Submission {
                return Err(LedgerError::phase(format!(
                    "round {} is in {} phase, submissions are closed",
                    round.id, round.phase
                )));
            }
            if now >= round.submission_deadline {
                return Err(LedgerError::SubmissionEnded);
            }
            if stake < self.config.prompt_fee {
                return Err(LedgerError::InsufficientStake {
                    need: self.config.prompt_fee,
                    have: stake,
                });
            }

            let collected = round
                .collected
                .checked_add(stake)
                .ok_or_else(|| LedgerError::internal("round collected overflow"))?;
            self.treasury.deposit(stake)?;
            round.collected = collected;
            let prompt_id = round.add_prompt(author, text.clone());
            (round.id, prompt_id)
        };

        self.emit(LedgerEvent::PromptSubmitted {
            round_id,
            prompt_id,
            author,
            text,
        });
        tracing::info!("prompt {} submitted to round {}", prompt_id, round_id);
        Ok(prompt_id)
    }

    /// Moves the current round from Submission to Voting once the submission
    /// deadline has passed. Succeeds at most once per round.
    pub async fn advance_to_voting(&self) -> Result<()> {
        let _entry = self.guard.enter()?;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let round = &mut state.round;
        if round.phase != Phase::Submission {
            return Err(LedgerError::phase(format!(
                "round {} is in {} phase, cannot open voting",
                round.id, round.phase
            )));
        }
        if now < round.submission_deadline {
            return Err(LedgerError::phase(format!(
                "round {} submissions stay open until {}",
                round.id, round.submission_deadline
            )));
        }

        let voting_deadline = now + self.config.voting_window();
        round.phase = Phase::Voting;
        round.voting_deadline = Some(voting_deadline);
        tracing::info!("round {} voting open until {}", round.id, voting_deadline);
        Ok(())
    }

    /// Stakes a vote on a prompt in the current round. The owner's cut is
    /// paid out immediately; the remainder stays custodied for the round.
    pub async fn vote_on_prompt(&self, voter: Uuid, prompt_id: u32, stake: u64) -> Result<()> {
        let _entry = self.guard.enter()?;
        let now = self.clock.now();

        let (round_id, owner) = {
            let state = self.state.lock();
            let round = &state.round;
            if round.phase != Phase::Voting {
                return Err(LedgerError::phase(format!(
                    "round {} is in {} phase, voting is closed",
                    round.id, round.phase
                )));
            }
            let deadline = round
                .voting_deadline
                .ok_or_else(|| LedgerError::internal("voting phase without a deadline"))?;
            if now >= deadline {
                return Err(LedgerError::VotingEnded);
            }
            if stake < self.config.vote_fee {
                return Err(LedgerError::InsufficientStake {
                    need: self.config.vote_fee,
                    have: stake,
                });
            }
            if prompt_id as usize >= round.prompts.len() {
                return Err(LedgerError::UnknownPrompt {
                    round_id: round.id,
                    prompt_id,
                });
            }
            (round.id, state.owner)
        };

        let dev_cut = self.config.dev_cut(stake);
        self.treasury.deposit(stake)?;
        if let Err(err) = self.treasury.transfer(owner, dev_cut).await {
            self.treasury.release(stake)?;
            return Err(err);
        }

        {
            let mut state = self.state.lock();
            let round = &mut state.round;
            round.collected = round
                .collected
                .checked_add(stake - dev_cut)
                .ok_or_else(|| LedgerError::internal("round collected overflow"))?;
            round.prompt_mut(prompt_id)?.add_vote(voter, stake)?;
        }

        self.emit(LedgerEvent::VoteCast {
            round_id,
            prompt_id,
            voter,
            amount: stake,
        });
        tracing::info!(
            "vote of {} cast on prompt {} in round {}",
            stake,
            prompt_id,
            round_id
        );
        self.assert_pot_invariant()?;
        Ok(())
    }

    /// Finalizes the current round once the voting deadline has passed: pays
    /// the winning author, credits the pot fee, and opens the next round. On
    /// every winner-threshold hit (and only while no request is outstanding)
    /// the accumulated pot is handed to the randomness gateway.
    pub async fn finalize_round(&self) -> Result<()> {
        let _entry = self.guard.enter()?;
        let now = self.clock.now();

        let plan = {
            let state = self.state.lock();
            let round = &state.round;
            if round.phase != Phase::Voting {
                return Err(LedgerError::phase(format!(
                    "round {} is in {} phase, cannot finalize",
                    round.id, round.phase
                )));
            }
            let deadline = round
                .voting_deadline
                .ok_or_else(|| LedgerError::internal("voting phase without a deadline"))?;
            if now < deadline {
                return Err(LedgerError::DeadlineNotReached(format!(
                    "round {} voting stays open until {}",
                    round.id, deadline
                )));
            }

            match round.leading_prompt() {
                Some(winner) => {
                    let pot_fee = self.config.pot_cut(round.collected);
                    let payout = round.collected - pot_fee;
                    let will_request = state.pot.pending().is_none()
                        && state.pot.winner_counter() + 1 >= self.config.distribution_threshold;
                    FinalizePlan {
                        round_id: round.id,
                        winner: Some((winner.id, winner.author, winner.text.clone(), payout)),
                        pot_fee,
                        will_request,
                    }
                }
                None => FinalizePlan {
                    round_id: round.id,
                    winner: None,
                    pot_fee: 0,
                    will_request: false,
                },
            }
        };

        if let Some((_, author, _, payout)) = &plan.winner {
            self.treasury.transfer(*author, *payout).await?;
        }
        let request_id = if plan.will_request {
            Some(self.gateway.request_random_words(1).await)
        } else {
            None
        };

        let (finalized_event, request_event) = {
            let mut state = self.state.lock();
            let next_id = state.round.id + 1;
            let mut round = std::mem::replace(
                &mut state.round,
                Round::open(next_id, now, self.config.submission_window()),
            );
            round.phase = Phase::Finalized;

            let mut finalized_event = None;
            if let Some((prompt_id, _, text, _)) = plan.winner {
                round.winning_prompt = Some(prompt_id);
                state.pot.credit(plan.pot_fee)?;
                for prompt in &round.prompts {
                    for (voter, stake) in &prompt.voter_stakes {
                        state.pot.record_contribution(*voter, *stake)?;
                    }
                }
                state.pot.count_winner();
                finalized_event = Some(LedgerEvent::RoundFinalized {
                    round_id: plan.round_id,
                    winning_prompt_id: prompt_id,
                    winning_text: text,
                });
            }
            state.pot.touch(now);

            let mut request_event = None;
            if let Some(request_id) = request_id {
                let (entries, total_stake) = state.pot.open_request(request_id)?;
                state.pot.reset_counter();
                request_event = Some(LedgerEvent::DistributionRequested {
                    request_id,
                    total_stake,
                });
                tracing::info!(
                    "distribution request {} issued over {} voters",
                    request_id,
                    entries
                );
            }

            state.history.push(round);
            (finalized_event, request_event)
        };

        if let Some(event) = finalized_event {
            self.emit(event);
        }
        if let Some(event) = request_event {
            self.emit(event);
        }
        tracing::info!("round {} finalized", plan.round_id);
        self.assert_pot_invariant()?;
        Ok(())
    }

    /// Hands the accumulated pot to the randomness gateway after a full idle
    /// timeout, independent of the winner counter. Returns the request id.
    pub async fn distribute_idle_pot(&self) -> Result<u64> {
        let _entry = self.guard.enter()?;
        let now = self.clock.now();

        {
            let state = self.state.lock();
            if state.pot.pot() == 0 {
                return Err(LedgerError::EmptyPot);
            }
            if let Some(pending) = state.pot.pending() {
                return Err(LedgerError::DistributionPending {
                    request_id: pending.request_id,
                });
            }
            let idle_since = state.pot.last_activity();
            if now - idle_since < self.config.idle_timeout() {
                return Err(LedgerError::DeadlineNotReached(format!(
                    "pot has only been idle since {idle_since}"
                )));
            }
        }

        let request_id = self.gateway.request_random_words(1).await;

        let total_stake = {
            let mut state = self.state.lock();
            let (entries, total_stake) = state.pot.open_request(request_id)?;
            tracing::info!(
                "idle pot distribution request {} issued over {} voters",
                request_id,
                entries
            );
            total_stake
        };
        self.emit(LedgerEvent::DistributionRequested {
            request_id,
            total_stake,
        });
        Ok(request_id)
    }

    /// Gateway callback: pays the whole pot to a voter selected from the
    /// request's snapshot, weighted by cumulative stake. A request id that
    /// does not match the outstanding request is rejected without touching
    /// state. An empty snapshot clears the request and retains the pot.
    pub async fn deliver_randomness(&self, request_id: u64, random_words: &[u64]) -> Result<()> {
        let _entry = self.guard.enter()?;
        let now = self.clock.now();

        let (selected, amount) = {
            let state = self.state.lock();
            let pending = state
                .pot
                .pending()
                .ok_or(LedgerError::RequestMismatch { request_id })?;
            if pending.request_id != request_id {
                return Err(LedgerError::RequestMismatch { request_id });
            }
            let word = random_words
                .first()
                .ok_or_else(|| LedgerError::internal("randomness delivery carried no words"))?;
            (pending.select(*word), state.pot.pot())
        };

        let Some(recipient) = selected else {
            let mut state = self.state.lock();
            state.pot.clear_request();
            tracing::warn!(
                "request {} fulfilled with no eligible voters, pot of {} retained",
                request_id,
                amount
            );
            return Ok(());
        };

        self.treasury.transfer(recipient, amount).await?;

        {
            let mut state = self.state.lock();
            state.pot.drain_pot();
            state.pot.clear_request();
            state.pot.touch(now);
        }
        self.emit(LedgerEvent::PotDistributed {
            request_id,
            recipient,
            amount,
        });
        tracing::info!(
            "pot of {} distributed to {} for request {}",
            amount,
            recipient,
            request_id
        );
        self.assert_pot_invariant()?;
        Ok(())
    }

    /// Posts a shout-out. Accepted in any phase; the owner's cut is paid out
    /// immediately and the remainder lands in the pot.
    pub async fn post_shout_out(
        &self,
        author: Uuid,
        text: impl Into<String>,
        stake: u64,
    ) -> Result<()> {
        let _entry = self.guard.enter()?;
        let text = text.into();
        if stake < self.config.shout_fee {
            return Err(LedgerError::InsufficientStake {
                need: self.config.shout_fee,
                have: stake,
            });
        }

        let owner = self.state.lock().owner;
        let dev_cut = self.config.dev_cut(stake);
        self.treasury.deposit(stake)?;
        if let Err(err) = self.treasury.transfer(owner, dev_cut).await {
            self.treasury.release(stake)?;
            return Err(err);
        }

        self.state.lock().pot.credit(stake - dev_cut)?;
        self.emit(LedgerEvent::ShoutOut {
            author,
            text,
            amount: stake,
        });
        self.assert_pot_invariant()?;
        Ok(())
    }

    /// Default handler for value sent without an operation: everything lands
    /// in the pot.
    pub async fn donate(&self, amount: u64) -> Result<()> {
        let _entry = self.guard.enter()?;
        self.treasury.deposit(amount)?;
        self.state.lock().pot.credit(amount)?;
        self.assert_pot_invariant()?;
        Ok(())
    }

    pub async fn transfer_ownership(&self, caller: Uuid, new_owner: Uuid) -> Result<()> {
        let _entry = self.guard.enter()?;
        let mut state = self.state.lock();
        if state.owner != caller {
            return Err(LedgerError::NotOwner);
        }
        state.owner = new_owner;
        tracing::info!("ownership transferred to {}", new_owner);
        Ok(())
    }

    /// Wires a recipient-side handler for an account; payouts to that account
    /// run the handler before any balance changes.
    pub fn register_receiver(&self, account: Uuid, receiver: Arc<dyn ValueReceiver>) {
        self.treasury.register_receiver(account, receiver);
    }

    pub fn remove_receiver(&self, account: Uuid) {
        self.treasury.remove_receiver(account);
    }

    pub fn pot(&self) -> u64 {
        self.state.lock().pot.pot()
    }

    pub fn held_balance(&self) -> u64 {
        self.treasury.held()
    }

    /// Pot-balance invariant check: the pot never exceeds actual custody.
    pub fn verify_pot_balance(&self) -> bool {
        self.pot() <= self.held_balance()
    }

    pub fn is_distribution_pending(&self, request_id: u64) -> bool {
        self.state.lock().pot.is_pending(request_id)
    }

    pub fn winner_counter(&self) -> u32 {
        self.state.lock().pot.winner_counter()
    }

    pub fn owner(&self) -> Uuid {
        self.state.lock().owner
    }

    pub fn balance_of(&self, account: Uuid) -> u64 {
        self.treasury.balance_of(account)
    }

    pub fn current_round(&self) -> RoundInfo {
        self.state.lock().round.info()
    }

    /// Finalized rounds, oldest first. Retained for audit and read access.
    pub fn finalized_rounds(&self) -> Vec<RoundInfo> {
        self.state.lock().history.iter().map(Round::info).collect()
    }

    /// Events emitted so far, in order.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Drains and returns the event log.
    pub fn take_events(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn emit(&self, event: LedgerEvent) {
        self.events.lock().push(event);
    }

    fn assert_pot_invariant(&self) -> Result<()> {
        let pot = self.pot();
        let held = self.held_balance();
        if pot > held {
            return Err(LedgerError::PotOverdrawn { pot, held });
        }
        Ok(())
    }
}
