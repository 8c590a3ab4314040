#![forbid(unsafe_code)]

//! Periodic state refresh.
//!
//! A [`StatePoller`] is either `Idle` or `Polling`. Each `start` opens a new
//! generation; a [`PollTicket`] names the generation a fetch was issued under,
//! so a result that completes after `stop` can be recognised and dropped.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// Generation a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket(u64);

/// What the tick callback wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Schedule the next tick after the interval.
    Continue,
    /// End this chain and return to `Idle`.
    Halt,
}

struct Inner {
    state: PollerState,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

pub struct StatePoller {
    interval: Duration,
    inner: Mutex<Inner>,
}

impl StatePoller {
    pub fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            inner: Mutex::new(Inner { state: PollerState::Idle, generation: 0, task: None }),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        self.inner.lock().state
    }

    /// `Idle -> Polling`. The first tick fires one interval from now, never
    /// immediately. Returns `false` (and schedules nothing) when already
    /// polling. Must be called from within a tokio runtime.
    pub fn start<F, Fut>(self: &Arc<Self>, mut tick: F) -> bool
    where
        F: FnMut(PollTicket) -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.state == PollerState::Polling {
            return false;
        }
        inner.generation += 1;
        inner.state = PollerState::Polling;
        let ticket = PollTicket(inner.generation);
        let poller: Weak<Self> = Arc::downgrade(self);
        let interval = self.interval;
        inner.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !poller.upgrade().is_some_and(|p| p.is_current(ticket)) {
                    break;
                }
                // One tick at a time: the next sleep starts only after this fetch settles.
                if tick(ticket).await == TickFlow::Halt {
                    if let Some(p) = poller.upgrade() {
                        p.halt(ticket);
                    }
                    break;
                }
            }
        }));
        true
    }

    /// `Polling -> Idle`. Cancels the pending tick. Returns `false` when
    /// already idle.
    pub fn stop(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == PollerState::Idle {
            return false;
        }
        inner.state = PollerState::Idle;
        inner.generation += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        true
    }

    pub fn is_current(&self, ticket: PollTicket) -> bool {
        let inner = self.inner.lock();
        inner.state == PollerState::Polling && inner.generation == ticket.0
    }

    /// Run `apply` only if `ticket` is still the live generation. The check
    /// and `apply` happen under the poller lock, so a concurrent `stop`
    /// either lands before (and `apply` is skipped) or after.
    pub fn run_if_current<R>(&self, ticket: PollTicket, apply: impl FnOnce() -> R) -> Option<R> {
        let inner = self.inner.lock();
        if inner.state == PollerState::Polling && inner.generation == ticket.0 {
            Some(apply())
        } else {
            None
        }
    }

    fn halt(&self, ticket: PollTicket) {
        let mut inner = self.inner.lock();
        if inner.state == PollerState::Polling && inner.generation == ticket.0 {
            inner.state = PollerState::Idle;
            inner.generation += 1;
            // We are the task; dropping the handle detaches it.
            inner.task = None;
        }
    }
}

impl Drop for StatePoller {
    fn drop(&mut self) {
        if let Some(task) = self.inner.get_mut().task.take() {
            task.abort();
        }
    }
}
