//! Sequential transform queue.
//!
//! Operations are applied to the bound target strictly one at a time, in push
//! order. A target may answer with an immediate result or a pending future;
//! the drain loop suspends on pending results and resumes once they settle.
//!
//! Inside a Tokio runtime the remainder of a suspended drain runs as a spawned
//! task. Outside a runtime the pushing thread blocks until the future settles.
//! There is no timeout: a future that never settles leaves the queue draining
//! forever.
//!
//! A handler (or listener) that panics mid-drain aborts the cycle: the queue
//! stops processing, reports [`QueueStatus::Aborted`] and waits for an explicit
//! `process`, `retry` or `skip`.

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::sync::watch;
use uuid::Uuid;

use super::transformation::{TransformFuture, Transformable, Transformation};
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::message_bus::{EventBus, QueueEvent, SubscriptionId};

/// Event type emitted by a queue bound to target `T`
pub type QueueEventOf<T> = QueueEvent<<T as Transformable>::Operation, <T as Transformable>::Error>;

/// A queued operation
pub struct QueueEntry<O> {
    pub id: Uuid,
    pub operation: Arc<O>,
}

impl<O> Clone for QueueEntry<O> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            operation: Arc::clone(&self.operation),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for QueueEntry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .finish()
    }
}

/// Coarse queue state, as observed by [`TransformQueue::settle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Idle,
    Draining,
    /// The last drain cycle stopped on a rejected operation
    Failed,
    /// The last drain cycle was cut short by a panicking handler or listener
    Aborted,
}

struct QueueState<T: Transformable> {
    backlog: VecDeque<QueueEntry<T::Operation>>,
    processing: bool,
    error: Option<Arc<T::Error>>,
    aborted: bool,
    // `didComplete` is being delivered for the cycle that just ended.
    completing: bool,
    // A start was requested while `completing`; taken up once delivery returns.
    restart: bool,
}

type Suspended<T> = (
    QueueEntry<<T as Transformable>::Operation>,
    TransformFuture<<T as Transformable>::Output, <T as Transformable>::Error>,
);

enum Step<T: Transformable> {
    Applied,
    Halted,
    Suspended(Suspended<T>),
}

enum Start {
    Now,
    Deferred,
    Refused,
}

struct Inner<T: Transformable> {
    name: String,
    target: Arc<T>,
    auto_process: AtomicBool,
    state: Mutex<QueueState<T>>,
    // Written only while `state` is locked, so it never runs ahead of it.
    status: watch::Sender<QueueStatus>,
    events: EventBus<QueueEventOf<T>>,
}

/// Aborts the active drain if dropped while unwinding.
struct DrainGuard<'a, T: Transformable> {
    inner: &'a Inner<T>,
}

impl<T: Transformable> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.abort();
        }
    }
}

impl<T: Transformable> Inner<T> {
    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => {
                warn!("⚠️ [{}] queue lock was poisoned, recovering", self.name);
                poisoned.into_inner()
            }
        }
    }

    /// Claim the drain loop.
    ///
    /// An automatic start never resumes a queue halted by a failure or a
    /// panic; only an explicit `process` does. While `didComplete` is being
    /// delivered the start is deferred to the loop that is delivering it.
    fn begin(&self, explicit: bool) -> Start {
        let mut state = self.state();
        if state.processing || state.backlog.is_empty() {
            return Start::Refused;
        }
        if !explicit && (state.error.is_some() || state.aborted) {
            debug!("[{}] halted, waiting for process()", self.name);
            return Start::Refused;
        }
        if state.completing {
            debug!("[{}] start deferred to the completing drain", self.name);
            state.restart = true;
            return Start::Deferred;
        }
        self.start_cycle(&mut state);
        Start::Now
    }

    fn start_cycle(&self, state: &mut QueueState<T>) {
        state.processing = true;
        state.error = None;
        state.aborted = false;
        self.status.send_replace(QueueStatus::Draining);
        info!(
            "🔄 [{}] drain started with {} queued operations",
            self.name,
            state.backlog.len()
        );
    }

    /// Front of the backlog, or finish the cycle if it is empty.
    ///
    /// Starts requested while `didComplete` was being delivered begin a new
    /// cycle here, after delivery, instead of nesting inside the listeners.
    fn next_entry(&self) -> Option<QueueEntry<T::Operation>> {
        loop {
            {
                let mut state = self.state();
                if let Some(entry) = state.backlog.front() {
                    return Some(entry.clone());
                }
                state.processing = false;
                state.completing = true;
                self.status.send_replace(QueueStatus::Idle);
            }

            info!("🏁 [{}] drain complete", self.name);
            self.events.emit(&QueueEvent::DidComplete);

            let mut state = self.state();
            state.completing = false;
            if !std::mem::take(&mut state.restart) || state.backlog.is_empty() {
                return None;
            }
            self.start_cycle(&mut state);
        }
    }

    fn step(&self) -> Step<T> {
        let Some(entry) = self.next_entry() else {
            return Step::Halted;
        };

        debug!("🚀 [{}] applying operation {}", self.name, entry.id);
        match self.target.transform(&entry.operation) {
            Transformation::Immediate(result) => {
                if self.settle(entry, result) {
                    Step::Applied
                } else {
                    Step::Halted
                }
            }
            Transformation::Pending(future) => {
                debug!("⏳ [{}] operation {} is pending", self.name, entry.id);
                Step::Suspended((entry, future))
            }
        }
    }

    /// Record the outcome of the in-flight operation. Returns true if draining continues.
    fn settle(
        &self,
        entry: QueueEntry<T::Operation>,
        result: Result<T::Output, T::Error>,
    ) -> bool {
        match result {
            Ok(_) => {
                {
                    let mut state = self.state();
                    if state.backlog.front().map(|front| front.id) == Some(entry.id) {
                        state.backlog.pop_front();
                    } else {
                        error!(
                            "❌ [{}] applied operation {} was no longer at the front of the queue",
                            self.name, entry.id
                        );
                        state.backlog.retain(|queued| queued.id != entry.id);
                    }
                }

                debug!("✅ [{}] operation {} applied", self.name, entry.id);
                self.events.emit(&QueueEvent::DidTransform {
                    id: entry.id,
                    operation: entry.operation,
                });
                true
            }
            Err(err) => {
                error!("❌ [{}] operation {} failed: {:?}", self.name, entry.id, err);
                let error = Arc::new(err);
                {
                    let mut state = self.state();
                    state.processing = false;
                    state.error = Some(Arc::clone(&error));
                    self.status.send_replace(QueueStatus::Failed);
                }

                self.events.emit(&QueueEvent::DidFail {
                    id: entry.id,
                    operation: entry.operation,
                    error,
                });
                false
            }
        }
    }

    /// Release the drain loop after a panic. The in-flight operation stays queued.
    fn abort(&self) {
        let mut state = self.state();
        state.completing = false;
        state.restart = false;
        if !state.processing {
            return;
        }
        state.processing = false;
        state.aborted = true;
        self.status.send_replace(QueueStatus::Aborted);
        error!(
            "💥 [{}] drain aborted by a panic, {} operations left queued",
            self.name,
            state.backlog.len()
        );
    }

    /// Apply operations until the backlog empties, a failure halts the
    /// cycle, or the target hands back a pending result.
    fn run_until_suspended(&self) -> Option<Suspended<T>> {
        let _guard = DrainGuard { inner: self };
        loop {
            match self.step() {
                Step::Applied => continue,
                Step::Halted => return None,
                Step::Suspended(suspended) => return Some(suspended),
            }
        }
    }
}

/// FIFO queue applying operations to a single target, one at a time.
///
/// Cloning yields another handle to the same queue.
pub struct TransformQueue<T: Transformable> {
    inner: Arc<Inner<T>>,
}

impl<T: Transformable> TransformQueue<T> {
    /// Bind a queue to `target` with the default config (`auto_process` on).
    pub fn new(target: Arc<T>) -> Self {
        Self::with_config(target, QueueConfig::default())
    }

    pub fn with_config(target: Arc<T>, config: QueueConfig) -> Self {
        let (status, _) = watch::channel(QueueStatus::Idle);
        debug!(
            "Creating transform queue '{}' (auto_process: {})",
            config.name, config.auto_process
        );
        Self {
            inner: Arc::new(Inner {
                name: config.name,
                target,
                auto_process: AtomicBool::new(config.auto_process),
                state: Mutex::new(QueueState {
                    backlog: VecDeque::new(),
                    processing: false,
                    error: None,
                    aborted: false,
                    completing: false,
                    restart: false,
                }),
                status,
                events: EventBus::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn target(&self) -> &Arc<T> {
        &self.inner.target
    }

    pub fn auto_process(&self) -> bool {
        self.inner.auto_process.load(Ordering::SeqCst)
    }

    pub fn set_auto_process(&self, auto_process: bool) {
        self.inner.auto_process.store(auto_process, Ordering::SeqCst);
    }

    /// True while a drain loop is active.
    pub fn processing(&self) -> bool {
        self.inner.state().processing
    }

    pub fn status(&self) -> QueueStatus {
        *self.inner.status.borrow()
    }

    /// Append an operation to the backlog and return its id.
    ///
    /// With `auto_process` on and the queue idle, draining starts before this
    /// returns; immediate results are applied inline. A queue halted by a
    /// failure only enqueues until `process`, `retry` or `skip` is called.
    ///
    /// Pushing from a `didComplete` listener, or from another thread while
    /// `didComplete` is being delivered, does not start a drain of its own: the
    /// loop delivering `didComplete` starts the next cycle once every listener
    /// has returned.
    pub fn push(&self, operation: T::Operation) -> Uuid {
        let id = Uuid::new_v4();
        let queued = {
            let mut state = self.inner.state();
            state.backlog.push_back(QueueEntry {
                id,
                operation: Arc::new(operation),
            });
            state.backlog.len()
        };
        debug!(
            "📥 [{}] pushed operation {} ({} queued)",
            self.inner.name, id, queued
        );

        if self.auto_process() {
            if let Start::Now = self.inner.begin(false) {
                Self::drain(Arc::clone(&self.inner));
            }
        }
        id
    }

    /// Start draining if the queue is idle and has queued operations.
    ///
    /// Returns false, and does nothing, when a drain is already running or the
    /// backlog is empty. After a failure the rejected operation is still at the
    /// front, so this retries it.
    pub fn process(&self) -> bool {
        match self.inner.begin(true) {
            Start::Now => {
                Self::drain(Arc::clone(&self.inner));
                true
            }
            Start::Deferred => true,
            Start::Refused => false,
        }
    }

    /// Re-attempt the operation that halted the last cycle.
    pub fn retry(&self) -> bool {
        if let Some(error) = self.error() {
            info!("🔁 [{}] retrying after {:?}", self.inner.name, error);
        }
        self.process()
    }

    /// Discard the operation at the front of the backlog.
    ///
    /// Typically used to drop an operation that failed. Clears the recorded
    /// failure and, with `auto_process` on, resumes draining.
    pub fn skip(&self) -> QueueResult<Arc<T::Operation>> {
        let skipped = {
            let mut state = self.inner.state();
            if state.processing {
                warn!("⚠️ [{}] cannot skip while processing", self.inner.name);
                return Err(QueueError::busy("skip"));
            }
            let entry = state
                .backlog
                .pop_front()
                .ok_or_else(|| QueueError::empty("skip"))?;
            state.error = None;
            state.aborted = false;
            self.inner.status.send_replace(QueueStatus::Idle);
            entry
        };
        info!("⏭️ [{}] skipped operation {}", self.inner.name, skipped.id);

        if self.auto_process() {
            self.process();
        }
        Ok(skipped.operation)
    }

    /// Discard every queued operation. Returns how many were dropped.
    pub fn clear(&self) -> QueueResult<usize> {
        let mut state = self.inner.state();
        if state.processing {
            warn!("⚠️ [{}] cannot clear while processing", self.inner.name);
            return Err(QueueError::busy("clear"));
        }
        let removed = state.backlog.len();
        state.backlog.clear();
        state.error = None;
        state.aborted = false;
        self.inner.status.send_replace(QueueStatus::Idle);
        info!("🧹 [{}] cleared {} operations", self.inner.name, removed);
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.state().backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state().backlog.is_empty()
    }

    /// The in-flight operation while draining, otherwise the next one to run.
    pub fn current(&self) -> Option<Arc<T::Operation>> {
        self.inner
            .state()
            .backlog
            .front()
            .map(|entry| Arc::clone(&entry.operation))
    }

    pub fn queued_ids(&self) -> Vec<Uuid> {
        self.inner
            .state()
            .backlog
            .iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// The error that halted the most recent drain cycle, if it failed.
    pub fn error(&self) -> Option<Arc<T::Error>> {
        self.inner.state().error.clone()
    }

    pub fn events(&self) -> &EventBus<QueueEventOf<T>> {
        &self.inner.events
    }

    /// Register a listener for one of `didComplete`, `didFail` or `didTransform`.
    pub fn on<F>(&self, event_name: &str, listener: F) -> SubscriptionId
    where
        F: Fn(&QueueEventOf<T>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event_name, listener)
    }

    /// Wait until the queue stops draining.
    ///
    /// Resolves with the rejecting error if the cycle ended in failure. A cycle
    /// aborted by a panic has no error value: it resolves `Ok(())` and
    /// [`status`](Self::status) reports [`QueueStatus::Aborted`].
    pub async fn settle(&self) -> Result<(), Arc<T::Error>> {
        let mut receiver = self.inner.status.subscribe();
        loop {
            let status = *receiver.borrow_and_update();
            match status {
                QueueStatus::Idle | QueueStatus::Aborted => return Ok(()),
                QueueStatus::Failed => return self.error().map_or(Ok(()), Err),
                QueueStatus::Draining => {
                    if receiver.changed().await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn drain(inner: Arc<Inner<T>>) {
        let Some(suspended) = inner.run_until_suspended() else {
            return;
        };

        let resume = Self::resume(Arc::clone(&inner), suspended);
        let resumed = AssertUnwindSafe(resume).catch_unwind();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if resumed.await.is_err() {
                        inner.abort();
                    }
                });
            }
            Err(_) => {
                debug!(
                    "[{}] no Tokio runtime, blocking on pending operation",
                    inner.name
                );
                if let Err(panic) = futures::executor::block_on(resumed) {
                    inner.abort();
                    std::panic::resume_unwind(panic);
                }
            }
        }
    }

    async fn resume(inner: Arc<Inner<T>>, suspended: Suspended<T>) {
        let mut next = Some(suspended);
        while let Some((entry, future)) = next.take() {
            let result = future.await;
            if inner.settle(entry, result) {
                next = inner.run_until_suspended();
            }
        }
    }
}

impl<T: Transformable> Clone for TransformQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
