use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, PoisonError};

use log::debug;

use crate::NodeId;

/// Tracks which of the `n` logical nodes have come up.
///
/// Every node registers itself once it can accept deliveries; `Start`
/// must not proceed anywhere until all of them have. Waiters block on a
/// condition variable rather than polling.
#[derive(Debug)]
pub struct ReadinessGate {
    n: usize,
    ready: Mutex<BTreeSet<NodeId>>,
    all_ready: Condvar,
}

impl ReadinessGate {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ready: Mutex::new(BTreeSet::new()),
            all_ready: Condvar::new(),
        }
    }

    /// Registers `id` as up and reachable.
    pub fn mark_ready(&self, id: NodeId) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        ready.insert(id);
        debug!("[GATE] {}/{} nodes ready", ready.len(), self.n);
        if ready.len() >= self.n {
            self.all_ready.notify_all();
        }
    }

    pub fn is_open(&self) -> bool {
        let ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        ready.len() >= self.n
    }

    /// Blocks until all `n` nodes have registered.
    pub fn wait_all_ready(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        while ready.len() < self.n {
            ready = self
                .all_ready
                .wait(ready)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
