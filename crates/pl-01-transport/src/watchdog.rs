//! # Connection Watchdog
//!
//! Owns the connection state and decides when a loss becomes a failure.
//!
//! Every transition bumps a generation counter. A loss starts a grace
//! timer tagged with the generation at the moment of loss; when the timer
//! fires it only acts if nothing happened since (no reconnect, no explicit
//! disconnect, no newer loss). This gives one failure notification per
//! loss event and lets a reconnect inside the grace window cancel it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::ConnectionState;
use crate::ports::FailureCallback;

/// Connection state holder plus the post-loss grace timer.
pub struct ConnectionWatchdog {
    state: watch::Sender<ConnectionState>,
    generation: Mutex<u64>,
    grace: Duration,
    on_failure: Mutex<Option<FailureCallback>>,
}

impl ConnectionWatchdog {
    pub fn new(grace: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            state,
            generation: Mutex::new(0),
            grace,
            on_failure: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn set_failure_callback(&self, callback: FailureCallback) {
        *self.on_failure.lock() = Some(callback);
    }

    /// Connect attempt started.
    pub fn connecting(&self) {
        self.transition(ConnectionState::Connecting);
    }

    /// Connection (re-)established. Cancels any pending grace timer.
    pub fn connected(&self) {
        self.transition(ConnectionState::Connected);
    }

    /// Explicit disconnect or failed connect. Cancels any pending grace timer.
    pub fn disconnected(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    /// Unsolicited loss. Enters Reconnecting and arms the grace timer.
    pub fn lost(self: &Arc<Self>) {
        let armed_at = self.transition(ConnectionState::Reconnecting);

        let Ok(handle) = Handle::try_current() else {
            warn!("No tokio runtime; connection watchdog not armed");
            return;
        };
        let watchdog = Arc::downgrade(self);
        let grace = self.grace;
        handle.spawn(async move {
            tokio::time::sleep(grace).await;
            grace_expired(watchdog, armed_at);
        });
    }

    fn transition(&self, next: ConnectionState) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.state.send_replace(next);
        *generation
    }
}

fn grace_expired(watchdog: Weak<ConnectionWatchdog>, armed_at: u64) {
    let Some(watchdog) = watchdog.upgrade() else {
        return;
    };

    {
        let mut generation = watchdog.generation.lock();
        if *generation != armed_at {
            return;
        }
        *generation += 1;
        watchdog.state.send_replace(ConnectionState::Disconnected);
    }

    warn!(
        grace_secs = watchdog.grace.as_secs(),
        "Connection not restored within grace period"
    );
    let callback = watchdog.on_failure.lock().clone();
    match callback {
        Some(callback) => callback(),
        None => info!("No connection-failure callback installed"),
    }
}
