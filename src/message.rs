use serde::{Deserialize, Serialize};

use crate::{Error, Result, Round, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Proposal,
    Vote,
}

/// A protocol message, addressed to every logical node in the network by
/// the sender's broadcast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Message {
    pub round: Round,
    pub value: Value,
    pub kind: MessageKind,
}

impl Message {
    pub fn proposal(round: Round, value: Value) -> Self {
        Self {
            round,
            value,
            kind: MessageKind::Proposal,
        }
    }

    pub fn vote(round: Round, value: Value) -> Self {
        Self {
            round,
            value,
            kind: MessageKind::Vote,
        }
    }

    pub fn kind_str(&self) -> &str {
        match self.kind {
            MessageKind::Proposal => "proposal",
            MessageKind::Vote => "vote",
        }
    }

    /// Rounds are 1-based once the protocol is running; a round-0 message
    /// can only be malformed and must be rejected before it reaches any
    /// ledger.
    pub fn validate(&self) -> Result<()> {
        if self.round == 0 {
            return Err(Error::InvalidRound { round: self.round });
        }
        Ok(())
    }
}
