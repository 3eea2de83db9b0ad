//! Time-paced playback of a traversal trace.
//!
//! The engine computes the whole trace up front; the scheduler only
//! replays it. Each playback runs as one tokio task that sleeps `delay`
//! between consecutive events and calls back once per event, then once
//! more with the outcome.
//!
//! At most one playback is live per scheduler: `play` cancels whatever was
//! running before it starts the next one. Cancellation is cooperative and
//! lands on a step boundary. Once `cancel` returns, no further callback of
//! that playback will start, even when `cancel` is called from inside one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridpath_core::{Outcome, TraversalEvent, TraversalResult};
use parking_lot::ReentrantMutex;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace};

/// Shared cancellation flag for one playback.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<PlaybackState>,
}

#[derive(Debug)]
struct PlaybackState {
    cancelled: AtomicBool,
    finished: AtomicBool,
    /// Held while a callback runs and while cancelling, so the two never
    /// interleave. Reentrant so a callback may cancel its own playback.
    gate: ReentrantMutex<()>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            inner: Arc::new(PlaybackState {
                cancelled: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                gate: ReentrantMutex::new(()),
            }),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// True once the playback delivered its outcome or observed cancellation.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Live means neither cancelled nor finished.
    pub fn is_live(&self) -> bool {
        !self.is_cancelled() && !self.is_finished()
    }

    /// Stop the playback. Returns true if this call cancelled a live run;
    /// cancelling a finished or already-cancelled run is a no-op.
    pub fn cancel(&self) -> bool {
        let _gate = self.inner.gate.lock();
        if self.is_finished() {
            return false;
        }
        !self.inner.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Run `f` unless cancelled. Returns whether it ran.
    fn fire(&self, f: impl FnOnce()) -> bool {
        let _gate = self.inner.gate.lock();
        if self.is_cancelled() {
            return false;
        }
        f();
        true
    }

    fn mark_finished(&self) {
        self.inner.finished.store(true, Ordering::Release);
    }
}

/// Marks the playback finished when the task exits, including by unwinding
/// out of a panicking callback.
struct FinishOnExit(CancelToken);

impl Drop for FinishOnExit {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// Caller's view of one playback.
///
/// Dropping the handle does not stop the playback.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    token: CancelToken,
    task: JoinHandle<Option<Outcome>>,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel this playback. Idempotent.
    pub fn cancel(&self) {
        if self.token.cancel() {
            debug!(id = self.id, "playback cancelled via handle");
        }
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.token.is_finished() || self.task.is_finished()
    }

    /// A token that can cancel this playback from elsewhere, including from
    /// inside its own callbacks.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Wait for the playback to end. Returns the delivered outcome, or None
    /// if it was cancelled first. Panics from callbacks are propagated.
    pub async fn finished(self) -> Option<Outcome> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => None,
        }
    }
}

struct ActivePlayback {
    id: u64,
    token: CancelToken,
    abort: AbortHandle,
}

/// Replays traversal traces on a tokio runtime, one live playback at a time.
pub struct StepScheduler {
    runtime: Handle,
    active: Option<ActivePlayback>,
    next_id: u64,
}

impl StepScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            active: None,
            next_id: 1,
        }
    }

    /// Scheduler bound to the runtime of the calling context, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Start replaying `result`.
    ///
    /// `on_event` fires once per event in trace order, the first immediately
    /// and each later one `delay` after its predecessor. `on_complete` fires
    /// once after the last event. A live playback is cancelled first.
    pub fn play<E, C>(
        &mut self,
        result: TraversalResult,
        delay: Duration,
        on_event: E,
        on_complete: C,
    ) -> PlaybackHandle
    where
        E: FnMut(&TraversalEvent) + Send + 'static,
        C: FnOnce(Outcome) + Send + 'static,
    {
        self.cancel();

        let id = self.next_id;
        self.next_id += 1;
        let token = CancelToken::new();

        debug!(
            id,
            events = result.len(),
            delay_ms = delay.as_millis() as u64,
            outcome = ?result.outcome(),
            "playback starting"
        );

        let task = self.runtime.spawn(drive(
            id,
            result,
            delay,
            token.clone(),
            on_event,
            on_complete,
        ));

        self.active = Some(ActivePlayback {
            id,
            token: token.clone(),
            abort: task.abort_handle(),
        });

        PlaybackHandle { id, token, task }
    }

    /// Cancel the live playback, if any. Returns true if one was stopped.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        let stopped = active.token.cancel();
        active.abort.abort();
        if stopped {
            debug!(id = active.id, "playback cancelled");
        }
        stopped
    }

    /// True while a playback is running. A task that died without
    /// finishing (panicked or aborted) does not count.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.token.is_live() && !a.abort.is_finished())
    }
}

impl Drop for StepScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive<E, C>(
    id: u64,
    result: TraversalResult,
    delay: Duration,
    token: CancelToken,
    mut on_event: E,
    on_complete: C,
) -> Option<Outcome>
where
    E: FnMut(&TraversalEvent) + Send + 'static,
    C: FnOnce(Outcome) + Send + 'static,
{
    let _finish = FinishOnExit(token.clone());
    let outcome = result.outcome();
    for (step, event) in result.events().iter().enumerate() {
        if step > 0 {
            tokio::time::sleep(delay).await;
        }
        if !token.fire(|| on_event(event)) {
            trace!(id, step, "playback stopped at step boundary");
            return None;
        }
        trace!(id, step, pos = %event.pos(), "step played");
    }

    if token.fire(move || on_complete(outcome)) {
        debug!(id, ?outcome, "playback complete");
        Some(outcome)
    } else {
        None
    }
}
