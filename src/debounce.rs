use crate::vault::DocumentSource;
use crate::view::PeriodView;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

type RefreshCallback = Box<dyn Fn() + Send + Sync>;

struct Inner {
    deadline: Mutex<Option<Instant>>,
    notify: Arc<Notify>,
    callback: RefreshCallback,
    window: Duration,
    fired: AtomicU64,
}

impl Inner {
    fn lock_deadline(&self) -> MutexGuard<'_, Option<Instant>> {
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_if_due(&self, deadline: Instant) -> bool {
        let mut current = self.lock_deadline();
        if *current == Some(deadline) {
            *current = None;
            true
        } else {
            false
        }
    }

    fn fire(&self) {
        let count = self.fired.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(count, "running debounced refresh");
        (self.callback)();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.notify.notify_one();
    }
}

/// Collapses bursts of change notifications into one refresh per quiet
/// window. The background loop stops once every handle is dropped.
#[derive(Clone)]
pub struct RefreshDebouncer {
    inner: Arc<Inner>,
}

impl RefreshDebouncer {
    pub fn new<F>(window: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                deadline: Mutex::new(None),
                notify: Arc::new(Notify::new()),
                callback: Box::new(callback),
                window,
                fired: AtomicU64::new(0),
            }),
        }
    }

    /// Rescans `source` into `view` once per burst, using the view's
    /// `debounceMs` as the quiet window.
    pub fn for_view<S>(view: Arc<Mutex<PeriodView>>, source: Arc<Mutex<S>>) -> Self
    where
        S: DocumentSource + Send + 'static,
    {
        let window = {
            let view = view.lock().unwrap_or_else(PoisonError::into_inner);
            Duration::from_millis(view.settings().debounce_ms)
        };
        Self::new(window, move || {
            let loaded = source.lock().unwrap_or_else(PoisonError::into_inner).load();
            match loaded {
                Ok(documents) => view
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .refresh(documents),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping refresh; document source failed");
                }
            }
        })
    }

    /// Pushes the pending refresh out to one full window from now.
    pub fn trigger(&self) {
        *self.inner.lock_deadline() = Some(Instant::now() + self.inner.window);
        self.inner.notify.notify_one();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock_deadline().is_some()
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn fired(&self) -> u64 {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Runs a pending refresh immediately. Returns whether one was pending.
    pub fn flush_now(&self) -> bool {
        let pending = self.inner.lock_deadline().take().is_some();
        if pending {
            self.inner.fire();
        }
        pending
    }

    pub fn start(&self) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let notify = self.inner.notify.clone();
        tokio::spawn(run_loop(inner, notify))
    }
}

async fn run_loop(inner: Weak<Inner>, notify: Arc<Notify>) {
    loop {
        let Some(current) = inner.upgrade() else {
            break;
        };
        let deadline = *current.lock_deadline();
        // No strong handle may be held across an await.
        drop(current);
        let Some(deadline) = deadline else {
            notify.notified().await;
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if inner.take_if_due(deadline) {
                    inner.fire();
                }
            }
            _ = notify.notified() => {}
        }
    }
    tracing::debug!("refresh debouncer stopped");
}
