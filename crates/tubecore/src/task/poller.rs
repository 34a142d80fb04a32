//! ProgressPoller — drives the state machine from `state.rs` with a timer.
//!
//! One armed session owns one tokio task. The task sleeps until the next
//! tick, queries progress, feeds the answer to the machine and performs the
//! resulting effects. Ticks within a session never overlap: a slow query
//! pushes the next tick back instead of running alongside it.
//!
//! Disarming cancels scheduling only. A query already in flight still
//! completes, and its answer is discarded because its generation is no
//! longer the live one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::types::{DownloadTask, TaskId};
use crate::api::Gateway;
use crate::presentation::PresentationPort;
use crate::registry::DownloadRegistry;
use crate::task::state::{Effect, Machine, PollEvent, PollerState};
use crate::task::submission::{SubmitLatch, VideoInfoSlot};

/// Cancellation handle of the live loop.
struct LoopHandle {
    generation: u64,
    cancel: CancellationToken,
}

/// What the caller of `dispatch` still has to do.
struct Dispatched {
    refresh: bool,
    generation: u64,
}

struct Session {
    machine: Machine,
    live_loop: Option<LoopHandle>,
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    presenter: Arc<dyn PresentationPort>,
    registry: DownloadRegistry,
    latch: SubmitLatch,
    video_info: VideoInfoSlot,
    interval: Duration,
    session: Mutex<Session>,
    state_tx: watch::Sender<PollerState>,
}

/// Tracks at most one task at a time. Clones share the same session.
///
/// Presenter callbacks run while the session is locked, so a presenter must
/// not call back into the poller.
#[derive(Clone)]
pub struct ProgressPoller {
    inner: Arc<Inner>,
}

impl ProgressPoller {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        presenter: Arc<dyn PresentationPort>,
        registry: DownloadRegistry,
        latch: SubmitLatch,
        video_info: VideoInfoSlot,
        interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(PollerState::Idle);
        Self {
            inner: Arc::new(Inner {
                gateway,
                presenter,
                registry,
                latch,
                video_info,
                interval,
                session: Mutex::new(Session {
                    machine: Machine::new(),
                    live_loop: None,
                }),
                state_tx,
            }),
        }
    }

    /// Starts tracking `task`; the first query fires one interval from now.
    ///
    /// An already running session is cancelled first. Must be called from
    /// inside a tokio runtime. Returns the new session's generation.
    pub fn arm(&self, task: DownloadTask) -> u64 {
        log::info!("Arming progress poller for task {}", task.id);
        self.dispatch(PollEvent::Arm(task)).generation
    }

    /// Stops tracking and returns to `Idle`. Safe to call in any state.
    pub fn disarm(&self) {
        log::info!("Disarming progress poller");
        self.dispatch(PollEvent::Disarm);
    }

    pub fn state(&self) -> PollerState {
        self.lock().machine.state().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.lock().machine.state().is_polling()
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.inner.state_tx.subscribe()
    }

    /// Waits until the poller is no longer `Polling` and returns that state.
    ///
    /// A terminal state is published only after the registry refresh it
    /// triggers has finished, so the listing is current once this returns.
    pub async fn settled(&self) -> PollerState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_polling()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Feeds one event to the machine and performs the effects that must
    /// happen atomically with it. A requested registry refresh is left to
    /// the caller, to run once the lock is released.
    fn dispatch(&self, event: PollEvent) -> Dispatched {
        let mut session = self.lock();
        let (machine, effects) = session.machine.step(event);
        session.machine = machine;

        let mut refresh = false;
        for effect in effects {
            match effect {
                Effect::StartLoop { task_id, generation } => {
                    let cancel = CancellationToken::new();
                    session.live_loop = Some(LoopHandle {
                        generation,
                        cancel: cancel.clone(),
                    });
                    tokio::spawn(self.clone().run(task_id, generation, cancel));
                }
                Effect::CancelLoop { generation } => {
                    if session.live_loop.as_ref().is_some_and(|h| h.generation == generation) {
                        if let Some(handle) = session.live_loop.take() {
                            handle.cancel.cancel();
                            log::debug!("Cancelled polling loop (generation {})", generation);
                        }
                    }
                }
                Effect::Emit(snapshot) => self.inner.presenter.show_progress(&snapshot),
                Effect::ReleaseSubmission => self.inner.latch.release(),
                Effect::ClearVideoInfo => self.inner.video_info.clear(),
                Effect::RefreshRegistry => refresh = true,
                Effect::SkipTick { generation, error } => {
                    log::warn!("Progress poll failed (generation {}), retrying next tick: {}", generation, error);
                }
                Effect::DiscardStale { generation } => {
                    log::debug!("Discarding response from stale generation {}", generation);
                }
            }
        }

        let state = session.machine.state();
        match state {
            PollerState::Completed { task } if refresh => log::info!("Task {} completed", task.id),
            PollerState::Errored { task, message } if refresh => {
                log::info!("Task {} failed: {}", task.id, message)
            }
            _ => {}
        }
        // A pending refresh defers publishing until it completes
        if !refresh {
            self.inner.state_tx.send_replace(state.clone());
        }

        Dispatched {
            refresh,
            generation: session.machine.last_generation(),
        }
    }

    async fn run(self, task_id: TaskId, generation: u64, cancel: CancellationToken) {
        let period = self.inner.interval;
        // First tick one period from now, not immediately
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let event = match self.inner.gateway.progress(&task_id).await {
                Ok(snapshot) => PollEvent::Response { generation, snapshot },
                Err(e) => PollEvent::PollFailed {
                    generation,
                    error: e.to_string(),
                },
            };

            if self.dispatch(event).refresh {
                // Failures are logged by the registry and never reach the user
                let _ = self.inner.registry.refresh().await;
                self.publish();
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        log::debug!("Polling loop for task {} exited (generation {})", task_id, generation);
    }

    /// Sends the current machine state to subscribers.
    fn publish(&self) {
        let session = self.lock();
        self.inner.state_tx.send_replace(session.machine.state().clone());
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
