//! Opportunity Channel: a bounded FIFO carrying `Route`s from the Scanner to
//! the Executor with drop-oldest overflow.
//!
//! Arbitrage opportunities are time-sensitive; blocking the Scanner on a
//! full queue is worse than shedding the stalest route, so `send` never
//! awaits — it always returns within the calling tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arb_types::Route;
use tokio::sync::Notify;

const DEFAULT_CAPACITY: usize = 256;

struct Inner {
    capacity: usize,
    queue: Mutex<VecDeque<Route>>,
    notify: Notify,
    dropped: AtomicU64,
}

/// The Scanner's sole handle for publishing routes.
#[derive(Clone)]
pub struct OpportunitySender {
    inner: Arc<Inner>,
}

/// The Executor's sole handle for consuming routes.
#[derive(Clone)]
pub struct OpportunityReceiver {
    inner: Arc<Inner>,
}

/// Creates a bounded channel with the default capacity (~256).
pub fn channel() -> (OpportunitySender, OpportunityReceiver) {
    with_capacity(DEFAULT_CAPACITY)
}

pub fn with_capacity(capacity: usize) -> (OpportunitySender, OpportunityReceiver) {
    let inner = Arc::new(Inner {
        capacity,
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        dropped: AtomicU64::new(0),
    });
    (
        OpportunitySender { inner: inner.clone() },
        OpportunityReceiver { inner },
    )
}

impl OpportunitySender {
    /// Publishes `route`. If the queue is already at capacity the oldest
    /// entry is dropped first and the drop counter is incremented; this
    /// function never blocks.
    pub fn send(&self, route: Route) {
        let mut queue = self.inner.queue.lock().expect("opportunity queue poisoned");
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                capacity = self.inner.capacity,
                total_dropped = self.inner.dropped.load(Ordering::Relaxed),
                "opportunity channel full; dropped oldest route"
            );
        }
        queue.push_back(route);
        drop(queue);
        self.inner.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl OpportunityReceiver {
    /// Waits up to `timeout` for a route. Returns `None` on timeout so the
    /// caller's loop can check a cancellation flag every tick.
    pub async fn recv_timed(&self, timeout: Duration) -> Option<Route> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    async fn recv(&self) -> Option<Route> {
        loop {
            if let Some(route) = self.inner.queue.lock().expect("opportunity queue poisoned").pop_front() {
                return Some(route);
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().expect("opportunity queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn sample_route(created_at_ms: u64) -> Route {
        Route {
            start_token: Address::ZERO,
            amount_in: 1,
            hops: Vec::new(),
            expected_output: 2,
            expected_profit: 1,
            gas_estimate: 0,
            gas_cost: 0,
            net_profit: 1,
            created_at_ms,
            source_block: 0,
        }
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_increments_counter() {
        let (tx, rx) = with_capacity(2);
        tx.send(sample_route(1));
        tx.send(sample_route(2));
        tx.send(sample_route(3));

        assert_eq!(tx.dropped_count(), 1);
        let first = rx.recv_timed(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.created_at_ms, 2);
        let second = rx.recv_timed(Duration::from_millis(10)).await.unwrap();
        assert_eq!(second.created_at_ms, 3);
    }

    #[tokio::test]
    async fn recv_timed_returns_none_on_empty_queue() {
        let (_tx, rx) = with_capacity(4);
        let result = rx.recv_timed(Duration::from_millis(5)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fifo_order_preserved_under_capacity() {
        let (tx, rx) = with_capacity(4);
        tx.send(sample_route(1));
        tx.send(sample_route(2));
        let first = rx.recv_timed(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.created_at_ms, 1);
    }
}
