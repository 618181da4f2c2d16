//! Cancellable timer slots for a game session.
//!
//! Each slot holds at most one scheduled task. Arming a slot aborts the
//! previous handle, so a timer for the same pending decision can never fire
//! twice. Callbacks additionally carry the session generation they were
//! armed under; the session bumps its generation on every real mutation,
//! which invalidates any already-fired stale callback before it can act.

use std::collections::HashMap;

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct TimerSlots {
    /// Turn timer or its insufficient-funds grace replacement. One pending
    /// decision per game, so one slot covers both.
    turn: Option<JoinHandle<()>>,
    /// Aggregate invite window or continuation-vote window.
    window: Option<JoinHandle<()>>,
    /// Per-invitee response timers.
    invites: HashMap<String, JoinHandle<()>>,
}

impl TimerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_turn(&mut self, handle: JoinHandle<()>) {
        if let Some(prev) = self.turn.replace(handle) {
            prev.abort();
        }
    }

    pub fn clear_turn(&mut self) {
        if let Some(handle) = self.turn.take() {
            handle.abort();
        }
    }

    pub fn arm_window(&mut self, handle: JoinHandle<()>) {
        if let Some(prev) = self.window.replace(handle) {
            prev.abort();
        }
    }

    pub fn clear_window(&mut self) {
        if let Some(handle) = self.window.take() {
            handle.abort();
        }
    }

    pub fn arm_invite(&mut self, player_id: &str, handle: JoinHandle<()>) {
        if let Some(prev) = self.invites.insert(player_id.to_string(), handle) {
            prev.abort();
        }
    }

    pub fn clear_invite(&mut self, player_id: &str) {
        if let Some(handle) = self.invites.remove(player_id) {
            handle.abort();
        }
    }

    pub fn clear_all(&mut self) {
        self.clear_turn();
        self.clear_window();
        for (_, handle) in self.invites.drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerSlots {
    fn drop(&mut self) {
        self.clear_all();
    }
}
