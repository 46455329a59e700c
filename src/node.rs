use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use rand::prelude::StdRng;
use serde::{Deserialize, Serialize};

use crate::consensus::{Consensus, HandleResponse};
use crate::message::Message;
use crate::readiness::ReadinessGate;
use crate::transport::Transport;
use crate::{NodeId, Result, Round, Value};

/// What a liveness probe learns about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    Healthy,
    Degraded,
}

/// Point-in-time view of a node's protocol state.
///
/// The three `Option` fields are always `Some` for an honest node and
/// always `None` for a faulty one, which carries no protocol state at
/// all. `killed` is real either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub killed: bool,
    pub current_value: Option<Value>,
    pub decided: Option<bool>,
    pub round: Option<Round>,
}

/// One process of the network: a consensus machine behind its actor
/// boundary, wired to a transport.
///
/// The mutex serializes inbound messages, so the machine itself needs no
/// further locking; nodes share nothing else and interact only through
/// `T::send`. A faulty node is built without a machine and stays dormant
/// for its whole life: it registers with the readiness gate and
/// acknowledges every delivery so the broadcast fan-out keeps working,
/// but runs no protocol logic whatsoever.
pub struct Node<T: Transport> {
    id: NodeId,
    n: usize,
    machine: Option<Mutex<Consensus>>,
    killed: AtomicBool,
    transport: T,
    ready: Arc<ReadinessGate>,
}

impl<T: Transport> Node<T> {
    /// Builds the node and registers it with the readiness gate.
    ///
    /// `initial` is the value an honest node opens round 1 with; a faulty
    /// node ignores it.
    pub fn new(
        id: NodeId,
        n: usize,
        f: usize,
        initial: Value,
        faulty: bool,
        transport: T,
        ready: Arc<ReadinessGate>,
    ) -> Result<Self> {
        let machine = match faulty {
            true => None,
            false => Some(Mutex::new(Consensus::new(id, n, f, initial)?)),
        };
        Self::from_machine(id, n, machine, transport, ready)
    }

    /// Same as [`Node::new`] but with a caller-provided RNG for the
    /// machine's tie-break coin.
    pub fn with_rng(
        id: NodeId,
        n: usize,
        f: usize,
        initial: Value,
        faulty: bool,
        rng: StdRng,
        transport: T,
        ready: Arc<ReadinessGate>,
    ) -> Result<Self> {
        let machine = match faulty {
            true => None,
            false => Some(Mutex::new(Consensus::with_rng(id, n, f, initial, rng)?)),
        };
        Self::from_machine(id, n, machine, transport, ready)
    }

    fn from_machine(
        id: NodeId,
        n: usize,
        machine: Option<Mutex<Consensus>>,
        transport: T,
        ready: Arc<ReadinessGate>,
    ) -> Result<Self> {
        ready.mark_ready(id);
        Ok(Self {
            id,
            n,
            machine,
            killed: AtomicBool::new(false),
            transport,
            ready,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_faulty(&self) -> bool {
        self.machine.is_none()
    }

    pub fn health(&self) -> Health {
        match self.machine {
            Some(_) => Health::Healthy,
            None => Health::Degraded,
        }
    }

    /// Blocks until every node has registered with the gate, then opens
    /// round 1 and broadcasts the initial proposal.
    ///
    /// A faulty node waits like everyone else and then acks without
    /// starting anything. Honest nodes that were already started or
    /// stopped ack too; the machine treats the repeat as a no-op.
    pub fn start(&self) -> Result<()> {
        self.ready.wait_all_ready();

        let machine = match &self.machine {
            Some(machine) => machine,
            None => return Ok(()),
        };

        // take the proposal with the lock released before broadcasting:
        // the fan-out includes ourselves
        let proposal = {
            let mut machine = machine.lock().unwrap_or_else(PoisonError::into_inner);
            machine.start()
        };

        match proposal {
            Some(msg) => self.broadcast(&msg),
            None => Ok(()),
        }
    }

    /// Kills the node, effective immediately. Broadcasts already handed to
    /// the transport are not recalled.
    pub fn stop(&self) {
        self.killed.store(true, Ordering::SeqCst);
        if let Some(machine) = &self.machine {
            machine
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .stop();
        }
    }

    pub fn state(&self) -> NodeState {
        match &self.machine {
            Some(machine) => {
                let machine = machine.lock().unwrap_or_else(PoisonError::into_inner);
                NodeState {
                    killed: machine.is_killed(),
                    current_value: Some(machine.current_value()),
                    decided: Some(machine.is_decided()),
                    round: Some(machine.round()),
                }
            }
            None => NodeState {
                killed: self.killed.load(Ordering::SeqCst),
                current_value: None,
                decided: None,
                round: None,
            },
        }
    }

    /// Accepts one encoded message from the network.
    ///
    /// Receipt is acknowledged with `Ok` whether or not it changed
    /// anything: killed and faulty nodes swallow their input. A payload
    /// that does not decode to a well-formed message is the one rejection,
    /// and it happens before the ledger is touched.
    pub fn deliver(&self, payload: &[u8]) -> Result<()> {
        let msg: Message = bincode::deserialize(payload)?;

        let machine = match &self.machine {
            Some(machine) => machine,
            None => {
                debug!("[BA-{}] dormant, discarding {}", self.id, msg.kind_str());
                return Ok(());
            }
        };

        let response = {
            let mut machine = machine.lock().unwrap_or_else(PoisonError::into_inner);
            machine.handle_message(msg)?
        };

        match response {
            HandleResponse::WaitingForMoreMessages => Ok(()),
            HandleResponse::Broadcast(msg) => self.broadcast(&msg),
        }
    }

    // Fans msg out to every logical node, ourselves included. Whether any
    // given peer is reachable is the transport's concern, not ours.
    fn broadcast(&self, msg: &Message) -> Result<()> {
        let payload = bincode::serialize(msg)?;
        debug!(
            "[BA-{}] broadcasting {} for round {}",
            self.id,
            msg.kind_str(),
            msg.round
        );
        for peer in 0..self.n {
            self.transport.send(peer, payload.clone());
        }
        Ok(())
    }
}
