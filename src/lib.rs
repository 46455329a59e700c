//! Ben-Or randomized binary consensus.
//!
//! A fixed-size network of `n` logical nodes agrees on a single bit even
//! though up to `f` of them are silently faulty. Each node runs an
//! independent [`Consensus`] state machine and exchanges round-tagged
//! proposal and vote messages through an injectable [`Transport`]: a
//! quorum of `n - f` same-kind messages drives each round forward, `f + 1`
//! matching votes decide, and split rounds fall back to a seedable random
//! coin.
//!
//! [`Node`] hosts a machine behind its actor boundary and implements the
//! per-node control surface (health, start, stop, state, deliver) over
//! whatever transport it is given. Start is gated on a [`ReadinessGate`]
//! so nobody proposes before the whole network can listen. Liveness is
//! conditional by design: a node that never accumulates a quorum for some
//! round simply stays in it.

pub mod consensus;
pub mod error;
pub mod ledger;
pub mod message;
pub mod node;
pub mod readiness;
pub mod tally;
pub mod transport;
pub mod value;

pub use crate::consensus::{Consensus, HandleResponse};
pub use crate::error::Error;
pub use crate::ledger::RoundLedger;
pub use crate::message::{Message, MessageKind};
pub use crate::node::{Health, Node, NodeState};
pub use crate::readiness::ReadinessGate;
pub use crate::tally::Tally;
pub use crate::transport::{NullTransport, Transport};
pub use crate::value::Value;

/// Logical identifier of a node, `0..n`. The transport maps it to an
/// actual address.
pub type NodeId = usize;

/// Protocol round counter. Round 0 is the pre-start state; the protocol
/// itself runs from round 1 and the counter never decreases.
pub type Round = u64;

pub type Result<T> = std::result::Result<T, Error>;
