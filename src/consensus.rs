use log::{debug, info};
use rand::{prelude::StdRng, SeedableRng};

use crate::ledger::RoundLedger;
use crate::message::{Message, MessageKind};
use crate::tally::Tally;
use crate::{Error, NodeId, Result, Round, Value};

/// One node's consensus state machine.
///
/// The machine owns its round ledger and a seedable RNG for the tie-break
/// coin; everything it wants sent to the network comes back to the caller
/// as a [`HandleResponse::Broadcast`], so it never touches a socket
/// itself. Access must be serialized by the caller: one inbound message
/// at a time.
#[derive(Debug)]
pub struct Consensus {
    id: NodeId,
    n: usize,
    f: usize,
    round: Round,
    value: Value,
    decided: bool,
    killed: bool,
    started: bool,
    ledger: RoundLedger,
    rng: StdRng,
}

/// What the state machine wants done after handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleResponse {
    WaitingForMoreMessages,
    Broadcast(Message),
}

impl Consensus {
    pub fn new(id: NodeId, n: usize, f: usize, initial: Value) -> Result<Self> {
        Self::with_rng(id, n, f, initial, StdRng::from_entropy())
    }

    /// Same as [`Consensus::new`] but with a caller-provided RNG, so tests
    /// can seed the tie-break coin and reproduce exact decision sequences.
    pub fn with_rng(id: NodeId, n: usize, f: usize, initial: Value, rng: StdRng) -> Result<Self> {
        if f >= n {
            return Err(Error::FaultBoundExceeded { n, f });
        }
        Ok(Self {
            id,
            n,
            f,
            round: 0,
            value: initial,
            decided: false,
            killed: false,
            started: false,
            ledger: RoundLedger::new(),
            rng,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn current_value(&self) -> Value {
        self.value
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    /// Messages of one kind required before a round's rule may run.
    pub fn quorum(&self) -> usize {
        self.n - self.f
    }

    /// Matching votes required to decide. A count this high always
    /// contains at least one honest vote.
    pub fn decision_threshold(&self) -> usize {
        self.f + 1
    }

    /// Opens round 1 by proposing our initial value to the whole network.
    ///
    /// Starting a machine that is already running or killed is a no-op:
    /// re-broadcasting the initial proposal would double-count it at every
    /// peer.
    pub fn start(&mut self) -> Option<Message> {
        if self.started || self.killed {
            debug!("[BA-{}] ignoring start request", self.id);
            return None;
        }
        self.started = true;
        self.round = 1;
        self.decided = false;
        info!("[BA-{}] starting with initial value {:?}", self.id, self.value);
        Some(Message::proposal(self.round, self.value))
    }

    /// Kills the machine. Later messages are acknowledged upstream but no
    /// longer recorded, and nothing further is broadcast.
    pub fn stop(&mut self) {
        info!("[BA-{}] stopped at round {}", self.id, self.round);
        self.killed = true;
    }

    /// Handles one inbound protocol message.
    ///
    /// Killed machines swallow their input, and so do decided ones: once a
    /// value is final, nothing may overwrite it. Everything else is
    /// appended to the round ledger, and the first time a round's record
    /// of one kind reaches quorum the matching rule runs.
    pub fn handle_message(&mut self, msg: Message) -> Result<HandleResponse> {
        msg.validate()?;

        if self.killed || self.decided {
            debug!(
                "[BA-{}] dropping {} for round {}",
                self.id,
                msg.kind_str(),
                msg.round
            );
            return Ok(HandleResponse::WaitingForMoreMessages);
        }

        self.ledger.record(msg.kind, msg.round, msg.value);

        if !self.ledger.reached_quorum(msg.kind, msg.round, self.quorum()) {
            return Ok(HandleResponse::WaitingForMoreMessages);
        }

        let response = match msg.kind {
            MessageKind::Proposal => self.on_proposal_quorum(msg.round),
            MessageKind::Vote => self.on_vote_quorum(msg.round),
        };
        Ok(response)
    }

    // A quorum of proposals fixes this round's vote: the proposal majority,
    // or the coin when the field is split.
    fn on_proposal_quorum(&mut self, round: Round) -> HandleResponse {
        let tally = Tally::count(self.ledger.records(MessageKind::Proposal, round));
        let preferred = match tally.majority() {
            Some(value) => value,
            None => Value::coin_flip(&mut self.rng),
        };
        info!(
            "[BA-{}] proposal quorum for round {}, voting {:?}",
            self.id, round, preferred
        );
        HandleResponse::Broadcast(Message::vote(round, preferred))
    }

    // A quorum of votes either decides or advances us to the next round.
    fn on_vote_quorum(&mut self, round: Round) -> HandleResponse {
        let tally = Tally::count(self.ledger.records(MessageKind::Vote, round));

        if tally.zeros >= self.decision_threshold() {
            self.decide(Value::Zero, round);
            return HandleResponse::WaitingForMoreMessages;
        }
        if tally.ones >= self.decision_threshold() {
            self.decide(Value::One, round);
            return HandleResponse::WaitingForMoreMessages;
        }

        self.value = match tally.majority() {
            Some(value) => value,
            None => Value::coin_flip(&mut self.rng),
        };
        self.round += 1;
        info!(
            "[BA-{}] no decision on round {} votes, proposing {:?} for round {}",
            self.id, round, self.value, self.round
        );
        HandleResponse::Broadcast(Message::proposal(self.round, self.value))
    }

    fn decide(&mut self, value: Value, round: Round) {
        info!(
            "[BA-{}] decided {:?} on round {} votes",
            self.id, value, round
        );
        self.value = value;
        self.decided = true;
    }
}
