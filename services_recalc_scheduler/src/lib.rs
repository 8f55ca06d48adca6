#![no_std]

//! # Recalc Scheduler Service
//!
//! Decides when a document pass runs.
//!
//! ## Philosophy
//!
//! - **Deterministic**: no timers or threads; the caller supplies the time and polls
//! - **Coalescing**: a burst of edits produces one pass
//! - **Loop-proof**: edits made while a pass is being applied are dropped
//! - **Testable**: every transition is observable under `cargo test`
//!
//! ## State machine
//!
//! ```text
//!            notify / request_now              poll (deadline reached)
//!   Idle ------------------------> Scheduled ----------------------> Evaluating
//!    ^                               |   ^                               |
//!    |            cancel             |   | notify (deadline restarts)    |
//!    +-------------------------------+   +-------------------------------+
//!    ^                                                                   |
//!    +------------------------------ complete ---------------------------+
//! ```
//!
//! Notifications that arrive in `Evaluating` are dropped.

extern crate alloc;

pub mod time;

use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

pub use time::{Duration, Instant};

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Nothing pending
    Idle,
    /// A pass will run once `deadline` is reached
    Scheduled { deadline: Instant },
    /// A pass is running and its output is being applied
    Evaluating,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "Idle"),
            SchedulerState::Scheduled { deadline } => {
                write!(f, "Scheduled({}ms)", deadline.as_millis())
            }
            SchedulerState::Evaluating => write!(f, "Evaluating"),
        }
    }
}

/// What a notification did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyOutcome {
    /// A pass was scheduled from idle
    Scheduled { deadline: Instant },
    /// A pending pass was pushed back (or pulled in by the fast path)
    Rescheduled { deadline: Instant },
    /// Ignored because a pass is in progress
    Dropped,
}

/// Record of a scheduler transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    Notified {
        at: Instant,
        outcome: NotifyOutcome,
        fast_path: bool,
    },
    PassStarted {
        at: Instant,
    },
    PassCompleted {
        at: Instant,
    },
    Cancelled,
}

/// Counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub notifications: u64,
    pub passes_started: u64,
    pub passes_completed: u64,
    /// Notifications that replaced an already pending pass
    pub coalesced: u64,
    /// Notifications ignored during a pass
    pub dropped: u64,
    pub fast_paths: u64,
}

/// Debouncing scheduler for document passes
#[derive(Debug, Clone)]
pub struct RecalcScheduler {
    debounce: Duration,
    state: SchedulerState,
    stats: SchedulerStats,
    events: Vec<SchedulerEvent>,
}

impl RecalcScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
            events: Vec::new(),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn is_evaluating(&self) -> bool {
        self.state == SchedulerState::Evaluating
    }

    /// Deadline of the pending pass, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Handles a document-changed notification
    ///
    /// With `caret_after_marker` set the pass is due immediately; otherwise
    /// it is due one debounce window from `now`.
    pub fn notify(&mut self, now: Instant, caret_after_marker: bool) -> NotifyOutcome {
        let delay = if caret_after_marker {
            Duration::ZERO
        } else {
            self.debounce
        };
        self.schedule(now, delay, caret_after_marker)
    }

    /// Explicit "evaluate now" request
    pub fn request_now(&mut self, now: Instant) -> NotifyOutcome {
        self.schedule(now, Duration::ZERO, true)
    }

    fn schedule(&mut self, now: Instant, delay: Duration, fast_path: bool) -> NotifyOutcome {
        self.stats.notifications += 1;
        let deadline = now + delay;
        let outcome = match self.state {
            SchedulerState::Evaluating => {
                self.stats.dropped += 1;
                NotifyOutcome::Dropped
            }
            SchedulerState::Scheduled { .. } => {
                self.stats.coalesced += 1;
                self.state = SchedulerState::Scheduled { deadline };
                NotifyOutcome::Rescheduled { deadline }
            }
            SchedulerState::Idle => {
                self.state = SchedulerState::Scheduled { deadline };
                NotifyOutcome::Scheduled { deadline }
            }
        };
        if fast_path && outcome != NotifyOutcome::Dropped {
            self.stats.fast_paths += 1;
        }
        self.events.push(SchedulerEvent::Notified {
            at: now,
            outcome,
            fast_path,
        });
        outcome
    }

    /// Starts the pending pass if its deadline has been reached
    ///
    /// Returns true when the caller must now run a pass and then call
    /// [`RecalcScheduler::complete`].
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Scheduled { deadline } if now >= deadline => {
                self.state = SchedulerState::Evaluating;
                self.stats.passes_started += 1;
                self.events.push(SchedulerEvent::PassStarted { at: now });
                true
            }
            _ => false,
        }
    }

    /// Ends the running pass; false if none was running
    pub fn complete(&mut self, now: Instant) -> bool {
        if self.state != SchedulerState::Evaluating {
            return false;
        }
        self.state = SchedulerState::Idle;
        self.stats.passes_completed += 1;
        self.events.push(SchedulerEvent::PassCompleted { at: now });
        true
    }

    /// Drops a pending pass; a running pass cannot be cancelled
    pub fn cancel(&mut self) -> bool {
        if let SchedulerState::Scheduled { .. } = self.state {
            self.state = SchedulerState::Idle;
            self.events.push(SchedulerEvent::Cancelled);
            return true;
        }
        false
    }

    /// Transitions recorded since the last call
    pub fn take_events(&mut self) -> Vec<SchedulerEvent> {
        core::mem::take(&mut self.events)
    }
}

impl Default for RecalcScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    #[test]
    fn test_idle_by_default() {
        let scheduler = RecalcScheduler::default();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.debounce(), Duration::from_millis(250));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_debounce_restarts_deadline() {
        let mut scheduler = RecalcScheduler::new(Duration::from_millis(100));
        assert_eq!(
            scheduler.notify(ms(0), false),
            NotifyOutcome::Scheduled { deadline: ms(100) }
        );
        assert_eq!(
            scheduler.notify(ms(60), false),
            NotifyOutcome::Rescheduled { deadline: ms(160) }
        );
        assert!(!scheduler.poll(ms(100)));
        assert!(!scheduler.poll(ms(159)));
        assert!(scheduler.poll(ms(160)));
        assert_eq!(scheduler.stats().coalesced, 1);
    }

    #[test]
    fn test_fast_path_is_due_immediately() {
        let mut scheduler = RecalcScheduler::new(Duration::from_millis(100));
        scheduler.notify(ms(0), false);
        assert_eq!(
            scheduler.notify(ms(10), true),
            NotifyOutcome::Rescheduled { deadline: ms(10) }
        );
        assert!(scheduler.poll(ms(10)));
        assert_eq!(scheduler.stats().fast_paths, 1);
    }

    #[test]
    fn test_notifications_dropped_while_evaluating() {
        let mut scheduler = RecalcScheduler::new(Duration::from_millis(100));
        scheduler.request_now(ms(0));
        assert!(scheduler.poll(ms(0)));
        assert_eq!(scheduler.notify(ms(1), false), NotifyOutcome::Dropped);
        assert_eq!(scheduler.request_now(ms(1)), NotifyOutcome::Dropped);
        assert!(scheduler.complete(ms(2)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.stats().dropped, 2);
        assert!(!scheduler.poll(ms(500)));
    }

    #[test]
    fn test_complete_without_pass() {
        let mut scheduler = RecalcScheduler::default();
        assert!(!scheduler.complete(ms(0)));
    }

    #[test]
    fn test_cancel_pending_only() {
        let mut scheduler = RecalcScheduler::default();
        assert!(!scheduler.cancel());
        scheduler.notify(ms(0), false);
        assert!(scheduler.cancel());
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.request_now(ms(1));
        scheduler.poll(ms(1));
        assert!(!scheduler.cancel());
        assert!(scheduler.is_evaluating());
    }

    #[test]
    fn test_events_are_drained() {
        let mut scheduler = RecalcScheduler::default();
        scheduler.request_now(ms(0));
        scheduler.poll(ms(0));
        scheduler.complete(ms(0));
        let events = scheduler.take_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], SchedulerEvent::PassStarted { at: ms(0) });
        assert!(scheduler.take_events().is_empty());
    }
}
