//! Conversion queue implementation.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::converter::{Converter, ConverterError, RunOptions};
use crate::pipeline::Pipeline;

use super::config::QueueConfig;
use super::types::{
    ConvertedCallback, ConvertedItem, FailedCallback, FailedItem, QueueError, QueueStatus,
};

struct QueuedItem {
    number: u64,
    pipeline: Pipeline,
}

#[derive(Default)]
struct Callbacks {
    converted: Option<ConvertedCallback>,
    failed: Option<FailedCallback>,
}

struct Inner<C> {
    converter: Arc<C>,
    config: QueueConfig,
    tx: mpsc::UnboundedSender<QueuedItem>,
    rx: Mutex<mpsc::UnboundedReceiver<QueuedItem>>,
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    active: AtomicU64,
    callbacks: StdRwLock<Callbacks>,
    /// Parent of every in-flight run's cancellation token.
    runs: CancellationToken,
    /// Stop token of the current worker set, if started.
    workers: StdMutex<Option<CancellationToken>>,
    disposed: AtomicBool,
    progressed: Notify,
}

/// Decouples pipeline submission from execution.
///
/// `add` can be called from any task, before or after `start`. Items wait in
/// an unbounded FIFO until a worker picks them up; pausing stops the pickup
/// without losing anything. Cloning yields another handle to the same queue.
pub struct ConversionQueue<C: Converter> {
    inner: Arc<Inner<C>>,
}

impl<C: Converter> Clone for ConversionQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Converter + 'static> ConversionQueue<C> {
    /// Creates a new, stopped queue.
    pub fn new(converter: C, config: QueueConfig) -> Self {
        Self::with_shared(Arc::new(converter), config)
    }

    /// Creates a queue over a converter that is also used elsewhere.
    pub fn with_shared(converter: Arc<C>, config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                converter,
                config,
                tx,
                rx: Mutex::new(rx),
                total: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                active: AtomicU64::new(0),
                callbacks: StdRwLock::new(Callbacks::default()),
                runs: CancellationToken::new(),
                workers: StdMutex::new(None),
                disposed: AtomicBool::new(false),
                progressed: Notify::new(),
            }),
        }
    }

    /// Sets the callback invoked after each successful run.
    pub fn on_converted(&self, callback: impl Fn(ConvertedItem) + Send + Sync + 'static) {
        let mut callbacks = self.inner.callbacks.write().unwrap_or_else(|e| e.into_inner());
        callbacks.converted = Some(Arc::new(callback));
    }

    /// Sets the callback invoked after each failed or cancelled run.
    pub fn on_exception(&self, callback: impl Fn(FailedItem) + Send + Sync + 'static) {
        let mut callbacks = self.inner.callbacks.write().unwrap_or_else(|e| e.into_inner());
        callbacks.failed = Some(Arc::new(callback));
    }

    /// Submits a pipeline and returns its sequence number (starting at 1).
    pub fn add(&self, pipeline: Pipeline) -> Result<u64, QueueError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(QueueError::Disposed);
        }

        let number = self.inner.total.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .tx
            .send(QueuedItem { number, pipeline })
            .map_err(|_| QueueError::Disposed)?;

        debug!(number, "Pipeline queued");
        Ok(number)
    }

    /// Spawns the workers. A no-op when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), QueueError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(QueueError::Disposed);
        }

        let mut workers = self.inner.workers.lock().unwrap_or_else(|e| e.into_inner());
        if workers.is_some() {
            return Ok(());
        }

        let stop = CancellationToken::new();
        let count = self.inner.config.worker_count();
        for id in 0..count {
            tokio::spawn(Self::worker(Arc::clone(&self.inner), id, stop.clone()));
        }
        *workers = Some(stop);

        info!(workers = count, mode = ?self.inner.config.mode, "Conversion queue started");
        Ok(())
    }

    /// Stops workers from picking up further items. Runs in flight finish;
    /// queued items stay queued until the next `start`.
    pub fn pause(&self) {
        let stop = self
            .inner
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(stop) = stop {
            stop.cancel();
            info!("Conversion queue paused");
        }
    }

    /// Pauses the queue for good and cancels every run in flight.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pause();
        self.inner.runs.cancel();
        info!(
            pending = self.status().pending,
            "Conversion queue disposed"
        );
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Items submitted so far.
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }

    /// Items finished so far, successful or not.
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> QueueStatus {
        // `failed` trails `completed`, which trails `total`; loading them in
        // that order keeps `failed <= completed <= total` in the snapshot.
        let failed = self.inner.failed.load(Ordering::SeqCst);
        let active = self.inner.active.load(Ordering::SeqCst);
        let completed = self.completed();
        let total = self.total();
        QueueStatus {
            running: self.is_running(),
            workers: self.inner.config.worker_count(),
            total,
            completed,
            failed,
            active,
            pending: total.saturating_sub(completed.saturating_add(active)),
        }
    }

    /// Waits until every item submitted so far has finished and its
    /// callback has returned.
    pub async fn drain(&self) {
        loop {
            let progressed = self.inner.progressed.notified();
            if self.completed() >= self.total() && self.inner.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            progressed.await;
        }
    }

    async fn worker(inner: Arc<Inner<C>>, id: usize, stop: CancellationToken) {
        debug!(worker = id, "Queue worker started");

        loop {
            let item = tokio::select! {
                biased;
                _ = stop.cancelled() => None,
                item = async { inner.rx.lock().await.recv().await } => item,
            };

            let Some(item) = item else {
                break;
            };
            Self::process(&inner, id, item).await;
        }

        debug!(worker = id, "Queue worker stopped");
    }

    async fn process(inner: &Inner<C>, worker: usize, item: QueuedItem) {
        let QueuedItem { number, pipeline } = item;
        inner.active.fetch_add(1, Ordering::SeqCst);
        debug!(worker, number, "Running queued pipeline");

        let options = RunOptions::default().with_cancel(inner.runs.child_token());
        let result = AssertUnwindSafe(inner.converter.run(&pipeline, options))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ConverterError::panicked(payload.as_ref())));

        let completed = inner.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if result.is_err() {
            inner.failed.fetch_add(1, Ordering::SeqCst);
        }
        let total = inner.total.load(Ordering::SeqCst);

        let (converted, failed) = {
            let callbacks = inner.callbacks.read().unwrap_or_else(|e| e.into_inner());
            (callbacks.converted.clone(), callbacks.failed.clone())
        };

        let delivered = match result {
            Ok(result) => {
                info!(number, total, completed, elapsed_ms = result.elapsed.as_millis() as u64, "Pipeline converted");
                converted.map(|callback| {
                    let item = ConvertedItem {
                        number,
                        total,
                        completed,
                        pipeline,
                        result,
                    };
                    std::panic::catch_unwind(AssertUnwindSafe(|| callback(item)))
                })
            }
            Err(error) => {
                warn!(number, total, completed, error = %error, "Pipeline failed");
                failed.map(|callback| {
                    let item = FailedItem {
                        number,
                        total,
                        completed,
                        pipeline,
                        error,
                    };
                    std::panic::catch_unwind(AssertUnwindSafe(|| callback(item)))
                })
            }
        };
        if let Some(Err(payload)) = delivered {
            warn!(number, reason = %ConverterError::panicked(payload.as_ref()), "Queue callback panicked");
        }

        // Released after the callback so `drain` returns only once it ran.
        inner.active.fetch_sub(1, Ordering::SeqCst);
        inner.progressed.notify_waiters();
    }
}
