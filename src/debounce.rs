//! Cancel-and-restart timers for deferring work.
//!
//! A [`Debouncer`] owns at most one pending task. Scheduling again aborts the
//! previous one and restarts the delay; dropping the debouncer aborts
//! whatever is still pending, so nothing fires after its owner is gone.
//!
//! Tasks are spawned on the ambient tokio runtime, so `schedule` must be
//! called from within one.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Defers a task until `delay` passes without a newer one.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// The quiet period applied to each scheduled task.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `task` once `delay` has elapsed without another call to
    /// `schedule` or `cancel`.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        }));
    }

    /// Aborts the pending task. Returns `true` if one had not fired yet.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// True while a scheduled task has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let make = {
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                Box::new(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (hits, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (hits, task) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.schedule(task());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_delay() {
        let (hits, task) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        for _ in 0..5 {
            debouncer.schedule(task());
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0, "storm must not fire");

        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_prevent_firing() {
        let (hits, task) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule(task());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        {
            let mut scoped = Debouncer::new(Duration::from_millis(100));
            scoped.schedule(task());
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
