//! Coalesce concurrent identical async operations behind one shared result.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

type InFlight<K, T> = Arc<DashMap<K, Shared<BoxFuture<'static, T>>>>;

/// Runs at most one operation per key at a time.
///
/// Callers arriving while an operation for the same key is pending await
/// that operation and receive a clone of its output. The entry is dropped
/// as soon as the operation settles, so the next call starts a fresh one.
pub struct SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    in_flight: InFlight<K, T>,
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Join the pending operation for `key`, or start one with `start`.
    ///
    /// `start` is only invoked when no operation for `key` is pending.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let operation = start();
                let guard = SettleGuard {
                    key,
                    in_flight: Arc::clone(&self.in_flight),
                };
                let shared = async move {
                    let _guard = guard;
                    operation.await
                }
                .boxed()
                .shared();
                entry.insert(shared.clone());
                shared
            }
        };

        shared.await
    }
}

/// Removes the in-flight entry when the operation completes or unwinds.
struct SettleGuard<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    key: K,
    in_flight: InFlight<K, T>,
}

impl<K, T> Drop for SettleGuard<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_calls_share_one_operation() {
        let flights: Arc<SingleFlight<&'static str, Result<u32, String>>> =
            Arc::new(SingleFlight::new());
        let started = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let flights = Arc::clone(&flights);
            let started = Arc::clone(&started);
            async move {
                flights
                    .run("refresh", move || async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }
        });

        let results = futures::future::join_all(calls).await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Ok(42)));
        assert!(!flights.is_in_flight(&"refresh"));
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_cleared() {
        let flights: SingleFlight<u8, Result<u32, String>> = SingleFlight::new();

        let (a, b) = tokio::join!(
            flights.run(1, || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err("rejected".to_string())
            }),
            flights.run(1, || async { Ok(7) }),
        );

        assert_eq!(a, Err("rejected".to_string()));
        assert_eq!(b, Err("rejected".to_string()));
        assert!(!flights.is_in_flight(&1));

        // next wave starts a fresh attempt
        let next = flights.run(1, || async { Ok(7) }).await;
        assert_eq!(next, Ok(7));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let flights: SingleFlight<u8, u8> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flights.run(1, || async { 1 }),
            flights.run(2, || async { 2 })
        );
        assert_eq!((a, b), (1, 2));
    }
}
