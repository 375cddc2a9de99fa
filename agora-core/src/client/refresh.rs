//! Single-flight coordination of the refresh cycle.
//!
//! The first caller to observe an authorization failure becomes the leader
//! and performs the refresh; everyone arriving while it is in flight parks
//! on a one-shot channel. Settling the cycle resets the flag and drains the
//! queue under the same lock acquisition.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::error::RefreshError;
use crate::store::Secret;

pub(crate) type RefreshOutcome = Result<Secret, RefreshError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// The role a caller plays in the current refresh cycle.
pub(crate) enum Ticket<'a> {
    /// Perform the refresh and settle the guard.
    Leader(RefreshGuard<'a>),
    /// Wait for the leader's outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    /// Join the current cycle, or start one.
    ///
    /// Check and set happen under one lock acquisition.
    pub(crate) fn begin(&self) -> Ticket<'_> {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push_back(tx);
            Ticket::Follower(rx)
        } else {
            state.refreshing = true;
            Ticket::Leader(RefreshGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Return to idle and release every waiter in enqueue order.
    fn finish(&self, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        let released = waiters.len();
        for waiter in waiters {
            // A waiter whose caller was dropped has nothing to resume.
            let _ = waiter.send(outcome.clone());
        }
        released
    }
}

/// Held by the leader for the duration of a refresh.
///
/// Dropping it without [`settle`](Self::settle) still returns the
/// coordinator to idle and rejects the queue with
/// [`RefreshError::Abandoned`].
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Publish the outcome to every waiter; returns how many were released.
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.finish(outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh dropped before settling, rejecting queued requests");
            self.coordinator.finish(Err(RefreshError::Abandoned));
        }
    }
}
