//! Single-writer admission.
//!
//! The store accepts one write transaction at a time. Rather than let
//! writers race for the store's lock and spin on busy errors, each database
//! handle queues its writers here: a writer draws a ticket and is admitted
//! when the ticket comes up, so writes run in submission order.
//!
//! Reads never take a ticket.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::trace;
use trellis_core::{TrellisError, TrellisResult};

#[derive(Debug, Default)]
struct QueueState {
    next_ticket: u64,
    now_serving: u64,
    owner: Option<ThreadId>,
}

/// FIFO ticket lock admitting one writer at a time.
#[derive(Debug, Default)]
pub struct WriteSerializer {
    state: Mutex<QueueState>,
    turn: Condvar,
}

impl WriteSerializer {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this caller is at the head of the queue.
    ///
    /// Fails with `InvalidInput` if the calling thread already holds the
    /// permit: a nested write transaction would wait on itself forever.
    pub fn acquire(&self) -> TrellisResult<WritePermit<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner == Some(me) {
            return Err(TrellisError::invalid_input(
                "nested transaction on the same database handle; use a savepoint instead",
            ));
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while state.now_serving != ticket {
            self.turn.wait(&mut state);
        }
        state.owner = Some(me);
        trace!(ticket, "write permit granted");

        Ok(WritePermit {
            serializer: self,
            ticket,
        })
    }

    /// Writers holding or waiting for the permit.
    pub fn pending(&self) -> u64 {
        let state = self.state.lock();
        state.next_ticket - state.now_serving
    }

    /// True if the current thread holds the permit.
    pub fn held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    fn release(&self, ticket: u64) {
        let mut state = self.state.lock();
        state.owner = None;
        state.now_serving += 1;
        trace!(ticket, "write permit released");
        self.turn.notify_all();
    }
}

/// Proof of admission. Dropping it admits the next writer.
#[derive(Debug)]
pub struct WritePermit<'a> {
    serializer: &'a WriteSerializer,
    ticket: u64,
}

impl WritePermit<'_> {
    /// Position in the admission order.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Drop for WritePermit<'_> {
    fn drop(&mut self) {
        self.serializer.release(self.ticket);
    }
}
