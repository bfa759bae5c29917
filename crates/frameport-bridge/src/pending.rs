//! Correlation registry for outstanding runtime calls.
//!
//! Ids are drawn from the bounded space 1..=capacity and wrap cyclically from
//! the last issued id. An id is unique only among currently outstanding
//! calls; once an entry settles, its id becomes available again.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::CallError;
use crate::CallResult;

/// Default size of the correlation id space.
pub const DEFAULT_ID_SPACE: u16 = 255;

struct PendingCall {
    slot: oneshot::Sender<CallResult>,
    created_at: Instant,
}

struct Inner {
    slots: HashMap<u16, PendingCall>,
    cursor: u16,
}

/// Tracks outstanding calls and settles each at most once.
pub struct PendingCalls {
    inner: Mutex<Inner>,
    capacity: u16,
}

impl PendingCalls {
    pub fn new(capacity: u16) -> Self {
        assert!(capacity > 0, "id space must not be empty");
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                cursor: 0,
            }),
            capacity,
        }
    }

    /// Next id not currently outstanding, scanning cyclically from the last
    /// issued id. Fails when every id in the space is taken.
    pub fn allocate(&self) -> Result<u16, CallError> {
        let mut inner = self.inner.lock().unwrap();
        for _ in 0..self.capacity {
            inner.cursor = inner.cursor % self.capacity + 1;
            if !inner.slots.contains_key(&inner.cursor) {
                return Ok(inner.cursor);
            }
        }
        Err(CallError::IdSpaceExhausted)
    }

    /// Store the completion slot for an allocated id.
    pub fn register(&self, id: u16, slot: oneshot::Sender<CallResult>) {
        let mut inner = self.inner.lock().unwrap();
        inner.slots.insert(
            id,
            PendingCall {
                slot,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove and settle the entry for `id`. Completing an id with no
    /// matching entry is a silent no-op; returns whether an entry was found.
    pub fn complete(&self, id: u16, result: CallResult) -> bool {
        let entry = self.inner.lock().unwrap().slots.remove(&id);
        match entry {
            Some(call) => {
                let _ = call.slot.send(result);
                true
            }
            None => false,
        }
    }

    /// Drop the entry for `id` without settling it. Idempotent.
    pub fn remove(&self, id: u16) {
        self.inner.lock().unwrap().slots.remove(&id);
    }

    /// Settle every outstanding entry with a uniform error and empty the
    /// registry. Used only on relay shutdown.
    pub fn force_complete_all(&self, error: CallError) {
        let drained: Vec<(u16, PendingCall)> = {
            let mut inner = self.inner.lock().unwrap();
            inner.slots.drain().collect()
        };
        for (id, call) in drained {
            tracing::debug!(
                id,
                age_ms = call.created_at.elapsed().as_millis() as u64,
                "force-completing outstanding call"
            );
            let _ = call.slot.send(Err(error.clone()));
        }
    }

    /// Number of currently outstanding calls.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }
}
