use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{sync::Notify, time::Instant};

/// Resettable idle timer shared between a dispatcher's consumer loop and the
/// contexts that may postpone deactivation.
///
/// The watchdog never deactivates anything itself: when
/// [`expired`](WatchdogHandle::expired) completes, the consumer loop
/// enqueues a poison pill into its own mailbox, keeping deactivation in FIFO
/// order with in-flight messages.
#[derive(Clone)]
pub(crate) struct WatchdogHandle {
    inner: Arc<WatchdogInner>,
}

struct WatchdogInner {
    default_timeout: Duration,
    state: Mutex<WatchdogState>,
    changed: Notify,
}

struct WatchdogState {
    deadline: Option<Instant>,
    timeout_override: Option<Duration>,
}

impl WatchdogHandle {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(WatchdogInner {
                default_timeout,
                state: Mutex::new(WatchdogState {
                    deadline: None,
                    timeout_override: None,
                }),
                changed: Notify::new(),
            }),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Arm with the default timeout, discarding any previous override.
    /// Called once per activation.
    pub fn arm_default(&self) {
        let mut state = self.lock();
        state.timeout_override = None;
        state.deadline = Some(Instant::now() + self.inner.default_timeout);
        drop(state);
        self.inner.changed.notify_waiters();
    }

    /// Postpone expiry by the active timeout. Called after each processed
    /// message.
    pub fn reset(&self) {
        let mut state = self.lock();
        let timeout = state.timeout_override.unwrap_or(self.inner.default_timeout);
        state.deadline = Some(Instant::now() + timeout);
        drop(state);
        self.inner.changed.notify_waiters();
    }

    /// Install a timeout override that outlives this arm: subsequent resets
    /// use it until the instance deactivates.
    pub fn delay(&self, timeout: Duration) {
        let mut state = self.lock();
        state.timeout_override = Some(timeout);
        state.deadline = Some(Instant::now() + timeout);
        drop(state);
        self.inner.changed.notify_waiters();
    }

    /// Push the deadline out to at least `now + timeout` without touching
    /// the override. No-op while disarmed.
    pub fn extend(&self, timeout: Duration) {
        let mut state = self.lock();
        if let Some(deadline) = state.deadline {
            state.deadline = Some(deadline.max(Instant::now() + timeout));
            drop(state);
            self.inner.changed.notify_waiters();
        }
    }

    /// Cancel the timer and forget the override. Called on deactivation.
    pub fn disarm(&self) {
        let mut state = self.lock();
        state.deadline = None;
        state.timeout_override = None;
        drop(state);
        self.inner.changed.notify_waiters();
    }

    /// Completes once the armed deadline passes, then disarms. Pends forever
    /// while disarmed. The deadline is re-read on every wake-up, so
    /// concurrent resets, delays and extensions are picked up.
    pub async fn expired(&self) {
        loop {
            let deadline = self.lock().deadline;
            match deadline {
                None => self.inner.changed.notified().await,
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {
                            let mut state = self.lock();
                            if state.deadline == Some(deadline) {
                                state.deadline = None;
                                return;
                            }
                        }
                        _ = self.inner.changed.notified() => {}
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchdogState> {
        self.inner.state.lock().expect("watchdog state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_default_timeout() {
        let watchdog = WatchdogHandle::new(Duration::from_secs(60));
        watchdog.arm_default();
        let before = Instant::now();
        watchdog.expired().await;
        assert!(before.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_postpones_expiry() {
        let watchdog = WatchdogHandle::new(Duration::from_secs(60));
        watchdog.arm_default();
        let observer = {
            let watchdog = watchdog.clone();
            tokio::spawn(async move {
                let before = Instant::now();
                watchdog.expired().await;
                before.elapsed()
            })
        };
        tokio::time::sleep(Duration::from_secs(45)).await;
        watchdog.reset();
        let elapsed = observer.await.unwrap();
        assert!(elapsed >= Duration::from_secs(105));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_overrides_subsequent_resets() {
        let watchdog = WatchdogHandle::new(Duration::from_secs(60));
        watchdog.arm_default();
        watchdog.delay(Duration::from_secs(600));
        watchdog.reset();
        let before = Instant::now();
        watchdog.expired().await;
        assert!(before.elapsed() >= Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn activation_clears_previous_override() {
        let watchdog = WatchdogHandle::new(Duration::from_secs(60));
        watchdog.delay(Duration::from_secs(600));
        watchdog.disarm();
        watchdog.arm_default();
        let before = Instant::now();
        watchdog.expired().await;
        let elapsed = before.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_watchdog_pends() {
        let watchdog = WatchdogHandle::new(Duration::from_secs(1));
        watchdog.arm_default();
        watchdog.disarm();
        let expired =
            tokio::time::timeout(Duration::from_secs(10), watchdog.expired()).await;
        assert!(expired.is_err());
    }
}
