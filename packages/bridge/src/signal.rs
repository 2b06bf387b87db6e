//! Completion signalling primitives.
//!
//! Two flavours with different reuse rules:
//!
//! - [`Latch`]: fires once and remembers the outcome. Any number of
//!   waiters, early or late, observe the same value. Used for monotonic
//!   facts such as "the engine is ready".
//! - [`OneShot`]: hands each emitted value to exactly one waiter, in the
//!   order the waiters subscribed. An error terminates the signal for every
//!   current waiter, after which the owner swaps in a fresh one.

use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::{oneshot, watch};

use crate::error::{DataStoreError, Result};

type Slot<T> = Option<Result<T>>;

/// A replaying, fire-once signal.
#[derive(Debug)]
pub struct Latch<T> {
    tx: watch::Sender<Slot<T>>,
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }
}

impl<T: Clone + Send + Sync + 'static> Latch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and wake every waiter.
    ///
    /// Returns `false` if the latch already holds an outcome.
    pub fn fire(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Store `error` and wake every waiter.
    ///
    /// Returns `false` if the latch already holds an outcome; in
    /// particular a latch that fired successfully can never be failed.
    pub fn fail(&self, error: DataStoreError) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Result<T>) -> bool {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = outcome.take();
            true
        })
    }

    /// Whether the latch has fired successfully.
    pub fn is_fired(&self) -> bool {
        matches!(*self.tx.borrow(), Some(Ok(_)))
    }

    /// Wait for the outcome.
    ///
    /// The subscription is taken when this is called, not when the future
    /// is first polled, so a latch swapped out later does not affect it.
    pub fn wait(&self) -> impl Future<Output = Result<T>> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let outcome = rx
                .wait_for(Option::is_some)
                .await
                .map(|slot| slot.clone());
            match outcome {
                Ok(Some(result)) => result,
                // The sender only drops without settling if its owner is gone.
                Ok(None) | Err(_) => Err(DataStoreError::Unknown),
            }
        }
    }
}

/// A pending receipt for one [`OneShot`] emission.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    /// Wait for the emission this completion was registered for.
    pub async fn wait(self) -> Result<T> {
        self.rx.await.unwrap_or(Err(DataStoreError::Unknown))
    }
}

/// A single-delivery signal with FIFO waiters.
#[derive(Debug)]
pub struct OneShot<T> {
    waiters: VecDeque<oneshot::Sender<Result<T>>>,
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }
}

impl<T: Clone> OneShot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for the next emission not already claimed.
    pub fn subscribe(&mut self) -> Completion<T> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        Completion { rx }
    }

    /// Deliver `value` to the oldest live waiter.
    ///
    /// Waiters that gave up are skipped. Returns `false` if nobody was
    /// waiting, in which case the value is dropped.
    pub fn resolve(&mut self, value: T) -> bool {
        let mut outcome = Ok(value);
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.send(outcome) {
                Ok(()) => return true,
                Err(returned) => outcome = returned,
            }
        }
        false
    }

    /// Terminate the signal, delivering `error` to every current waiter.
    ///
    /// Returns how many live waiters received the error.
    pub fn fail(self, error: DataStoreError) -> usize {
        self.waiters
            .into_iter()
            .filter(|waiter| !waiter.is_closed())
            .map(|waiter| waiter.send(Err(error.clone())))
            .filter(|sent| sent.is_ok())
            .count()
    }

    /// Number of live waiters.
    pub fn pending(&self) -> usize {
        self.waiters.iter().filter(|w| !w.is_closed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn latch_replays_to_late_waiters() {
        let latch = Latch::new();
        assert!(latch.fire(7u32));
        assert!(latch.is_fired());

        // Subscribing after the fact must not hang.
        let value = tokio::time::timeout(Duration::from_secs(1), latch.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn latch_wakes_early_waiters() {
        let latch = Latch::new();
        let first = tokio::spawn(latch.wait());
        let second = tokio::spawn(latch.wait());

        tokio::task::yield_now().await;
        latch.fire(());

        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(second.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn latch_fires_only_once() {
        let latch = Latch::new();
        assert!(latch.fire(1u8));
        assert!(!latch.fire(2u8));
        assert!(!latch.fail(DataStoreError::Unknown));
        assert_eq!(latch.wait().await, Ok(1));
    }

    #[tokio::test]
    async fn latch_failure_reaches_waiters() {
        let latch: Latch<()> = Latch::new();
        let waiter = latch.wait();
        assert!(latch.fail(DataStoreError::Locked));
        assert!(!latch.is_fired());
        assert_eq!(waiter.await, Err(DataStoreError::Locked));
    }

    #[tokio::test]
    async fn latch_dropped_while_waiting() {
        let latch: Latch<()> = Latch::new();
        let waiter = latch.wait();
        drop(latch);
        assert_eq!(waiter.await, Err(DataStoreError::Unknown));
    }

    #[tokio::test]
    async fn one_shot_delivers_in_subscription_order() {
        let mut signal = OneShot::new();
        let first = signal.subscribe();
        let second = signal.subscribe();

        assert!(signal.resolve("a"));
        assert_eq!(first.wait().await, Ok("a"));
        assert_eq!(signal.pending(), 1);

        assert!(signal.resolve("b"));
        assert_eq!(second.wait().await, Ok("b"));
    }

    #[test]
    fn one_shot_without_waiters_drops_value() {
        let mut signal = OneShot::new();
        assert!(!signal.resolve(1));

        // A later subscriber does not see the earlier emission.
        let late = signal.subscribe();
        assert_eq!(signal.pending(), 1);
        drop(late);
        assert_eq!(signal.pending(), 0);
    }

    #[tokio::test]
    async fn one_shot_skips_abandoned_waiters() {
        let mut signal = OneShot::new();
        let abandoned = signal.subscribe();
        let live = signal.subscribe();
        drop(abandoned);

        assert!(signal.resolve(5));
        assert_eq!(live.wait().await, Ok(5));
    }

    #[tokio::test]
    async fn one_shot_failure_reaches_every_waiter() {
        let mut signal: OneShot<()> = OneShot::new();
        let first = signal.subscribe();
        let second = signal.subscribe();

        assert_eq!(signal.fail(DataStoreError::NotInitialized), 2);
        assert_eq!(first.wait().await, Err(DataStoreError::NotInitialized));
        assert_eq!(second.wait().await, Err(DataStoreError::NotInitialized));
    }

    #[tokio::test]
    async fn completion_of_dropped_signal() {
        let mut signal: OneShot<()> = OneShot::new();
        let completion = signal.subscribe();
        drop(signal);
        assert_eq!(completion.wait().await, Err(DataStoreError::Unknown));
    }
}
