//! Debounced input.
//!
//! [`Debouncer`] keeps the latest input locally and forwards it downstream
//! only once no new input has arrived for the configured window. A new
//! input aborts the pending forward, so at most one is ever scheduled.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

pub struct Debouncer<T> {
    window: Duration,
    value: T,
    pending: Option<JoinHandle<()>>,
    output: mpsc::UnboundedSender<T>,
}

impl<T: Clone + Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    pub fn new(window: Duration, initial: T) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (output, receiver) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            value: initial,
            pending: None,
            output,
        };
        (debouncer, receiver)
    }

    /// Record `value` and restart the quiescence window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn input(&mut self, value: T) {
        self.value = value.clone();
        self.abort_pending();
        let output = self.output.clone();
        let deadline = Instant::now() + self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            trace!("Debounce window elapsed");
            let _ = output.send(value);
        }));
    }

    /// The latest input, sent or not.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a forward is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Drop the scheduled forward, if any.
    pub fn cancel(&mut self) {
        self.abort_pending();
    }

    /// Forward the latest input now instead of waiting out the window.
    pub fn flush(&mut self) {
        if self.is_pending() {
            self.abort_pending();
            let _ = self.output.send(self.value.clone());
        }
    }

    /// Replace the local value without scheduling a forward.
    pub fn reset(&mut self, value: T) {
        self.abort_pending();
        self.value = value;
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_value() {
        let start = Instant::now();
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(300), String::new());

        for (i, text) in ["m", "mi", "mil", "milk"].into_iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(50)).await;
            }
            debouncer.input(text.to_string());
            assert_eq!(debouncer.value(), text);
        }

        let value = settled.recv().await.unwrap();
        assert_eq!(value, "milk");
        assert_eq!(start.elapsed(), Duration::from_millis(450));

        sleep(Duration::from_secs(5)).await;
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(300), 0u32);
        debouncer.input(7);
        assert!(debouncer.is_pending());
        debouncer.cancel();

        sleep(Duration::from_secs(1)).await;
        assert!(settled.try_recv().is_err());
        assert_eq!(*debouncer.value(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sends_immediately() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(300), 0u32);
        debouncer.input(3);
        debouncer.flush();
        assert_eq!(settled.try_recv().unwrap(), 3);

        sleep(Duration::from_secs(1)).await;
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_forward() {
        let (mut debouncer, mut settled) = Debouncer::new(Duration::from_millis(300), 0u32);
        debouncer.input(9);
        drop(debouncer);

        sleep(Duration::from_secs(1)).await;
        assert!(settled.recv().await.is_none());
    }
}
