//! Dev session state machine.
//!
//! ```text
//! Idle -> Building -> Watching -> Debouncing -> Building -> Watching ...
//!                                                  any  -> Terminated
//! ```
//!
//! The machine is pure: callers feed it events and the current time, and it
//! answers whether a build should start. At most one build is ever in
//! flight. A change arriving mid-build is remembered and turns into a fresh
//! debounce window once the build finishes.

use std::time::{Duration, Instant};

/// Where the session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
    Watching,
    Debouncing { deadline: Instant },
    Terminated,
}

/// Session state with its in-flight guard.
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    debounce: Duration,
    rebuild_pending: bool,
    builds: u64,
}

impl SessionState {
    pub fn new(debounce: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            debounce,
            rebuild_pending: false,
            builds: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of builds started so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    pub fn is_building(&self) -> bool {
        self.phase == Phase::Building
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Whether a change arrived while the current build was running.
    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Starts the initial build. Returns false unless the session was idle.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.begin_build();
        true
    }

    /// Records a file change at `now`.
    ///
    /// While watching or debouncing this (re)starts the debounce window, so
    /// a burst of changes yields one build. During a build the change is
    /// deferred.
    pub fn on_change(&mut self, now: Instant) {
        match self.phase {
            Phase::Watching | Phase::Debouncing { .. } => {
                self.phase = Phase::Debouncing {
                    deadline: now + self.debounce,
                };
            }
            Phase::Building => self.rebuild_pending = true,
            Phase::Idle | Phase::Terminated => {}
        }
    }

    /// The pending debounce deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Starts a build if the debounce window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.phase {
            Phase::Debouncing { deadline } if now >= deadline => {
                self.begin_build();
                true
            }
            _ => false,
        }
    }

    /// Marks the in-flight build as finished at `now`.
    pub fn finish_build(&mut self, now: Instant) {
        if self.phase != Phase::Building {
            return;
        }
        if std::mem::take(&mut self.rebuild_pending) {
            self.phase = Phase::Debouncing {
                deadline: now + self.debounce,
            };
        } else {
            self.phase = Phase::Watching;
        }
    }

    /// Ends the session. No further builds start.
    pub fn terminate(&mut self) {
        self.phase = Phase::Terminated;
        self.rebuild_pending = false;
    }

    fn begin_build(&mut self) {
        self.phase = Phase::Building;
        self.builds += 1;
    }
}
