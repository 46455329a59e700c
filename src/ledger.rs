use std::collections::{BTreeMap, BTreeSet};

use crate::message::MessageKind;
use crate::{Round, Value};

/// Everything a node has received, keyed by round.
///
/// Records are append-only within a round and insertion order carries no
/// meaning: the decision rules only ever look at counts and tallies. The
/// ledger also remembers which rounds have already armed their quorum
/// rule, so a rule fires exactly once per round no matter how many
/// messages arrive after the threshold was crossed.
#[derive(Debug, Default)]
pub struct RoundLedger {
    proposals: BTreeMap<Round, Vec<Value>>,
    votes: BTreeMap<Round, Vec<Value>>,
    proposal_rule_armed: BTreeSet<Round>,
    vote_rule_armed: BTreeSet<Round>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: MessageKind, round: Round, value: Value) {
        self.records_mut(kind).entry(round).or_default().push(value);
    }

    pub fn records(&self, kind: MessageKind, round: Round) -> &[Value] {
        let by_round = match kind {
            MessageKind::Proposal => &self.proposals,
            MessageKind::Vote => &self.votes,
        };
        by_round.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true exactly once per `(kind, round)`: on the first call at
    /// which the accumulated record has reached `quorum` entries.
    pub fn reached_quorum(&mut self, kind: MessageKind, round: Round, quorum: usize) -> bool {
        if self.records(kind, round).len() < quorum {
            return false;
        }
        match kind {
            MessageKind::Proposal => self.proposal_rule_armed.insert(round),
            MessageKind::Vote => self.vote_rule_armed.insert(round),
        }
    }

    fn records_mut(&mut self, kind: MessageKind) -> &mut BTreeMap<Round, Vec<Value>> {
        match kind {
            MessageKind::Proposal => &mut self.proposals,
            MessageKind::Vote => &mut self.votes,
        }
    }
}
