//! Dedup frontier: the pending task queue plus the set of admitted URLs
//!
//! The frontier is the only gate against fetching a page twice. A task's
//! normalized URL is tested and inserted into the seen set under one lock, so
//! when two workers discover the same page at the same time exactly one enqueue
//! wins and the other is dropped.
//!
//! The frontier also tracks how many dispatched tasks are still in flight. The
//! crawl is over once nothing is pending and nothing is in flight, because only
//! an in-flight task can produce new work.

use crate::crawler::task::Task;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Outcome of an enqueue call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting; the task is now pending
    Accepted,
    /// The URL was already admitted earlier
    Duplicate,
    /// The frontier no longer accepts work
    Closed,
}

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<String>,
    pending: VecDeque<Task>,
    in_flight: usize,
    dispatched: u64,
    dispatch_limit: Option<u64>,
    closed: bool,
}

/// Shared frontier for one crawl
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier pre-loaded with seed tasks
    pub fn with_seeds(seeds: impl IntoIterator<Item = Task>) -> Self {
        let frontier = Self::new();
        for seed in seeds {
            frontier.enqueue(seed);
        }
        frontier
    }

    fn state(&self) -> MutexGuard<'_, FrontierState> {
        // No code path panics while holding the lock; recover the data if one ever did.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits a task unless its URL was seen before or the frontier is closed
    pub fn enqueue(&self, task: Task) -> Admission {
        let admission = {
            let mut state = self.state();
            if state.closed {
                Admission::Closed
            } else if state.seen.insert(task.dedup_key()) {
                state.pending.push_back(task);
                Admission::Accepted
            } else {
                Admission::Duplicate
            }
        };

        match admission {
            Admission::Accepted => self.changed.notify_waiters(),
            Admission::Duplicate => tracing::trace!("Dropping duplicate task"),
            Admission::Closed => tracing::trace!("Frontier closed, dropping task"),
        }

        admission
    }

    /// Closes the frontier once `limit` tasks have been handed out
    pub fn limit_dispatches(&self, limit: u64) {
        self.state().dispatch_limit = Some(limit);
    }

    /// Takes the next pending task without waiting
    ///
    /// A returned task counts as in flight until [`Frontier::complete`] is called.
    pub fn dequeue(&self) -> Option<Task> {
        let (task, limit_reached) = {
            let mut state = self.state();
            if state.closed {
                return None;
            }
            let task = state.pending.pop_front()?;
            state.in_flight += 1;
            state.dispatched += 1;

            let limit_reached = state
                .dispatch_limit
                .is_some_and(|limit| state.dispatched >= limit);
            if limit_reached {
                state.closed = true;
                state.pending.clear();
            }
            (task, limit_reached)
        };

        if limit_reached {
            tracing::info!("Page limit reached, no further tasks will be dispatched");
            self.changed.notify_waiters();
        }
        Some(task)
    }

    /// Waits for the next task
    ///
    /// Returns `None` once the crawl is finished: either the frontier was closed,
    /// or nothing is pending and no in-flight task is left that could add more.
    pub async fn next_task(&self) -> Option<Task> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state();
                if state.closed || (state.pending.is_empty() && state.in_flight == 0) {
                    return None;
                }
            }

            if let Some(task) = self.dequeue() {
                return Some(task);
            }

            notified.await;
        }
    }

    /// Marks one dispatched task as finished
    pub fn complete(&self) {
        {
            let mut state = self.state();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Stops admitting work and discards pending tasks
    ///
    /// In-flight tasks are left to finish; their discoveries are dropped.
    pub fn close(&self) {
        let discarded = {
            let mut state = self.state();
            state.closed = true;
            let discarded = state.pending.len();
            state.pending.clear();
            discarded
        };
        if discarded > 0 {
            tracing::info!("Frontier closed, discarded {} pending tasks", discarded);
        }
        self.changed.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// True when nothing is pending and nothing is in flight
    pub fn is_drained(&self) -> bool {
        let state = self.state();
        state.pending.is_empty() && state.in_flight == 0
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn in_flight(&self) -> usize {
        self.state().in_flight
    }

    /// Number of distinct URLs ever admitted
    pub fn seen_len(&self) -> usize {
        self.state().seen.len()
    }

    /// Number of tasks handed out so far
    pub fn dispatched(&self) -> u64 {
        self.state().dispatched
    }
}
