//! Single-flight request coalescing (§4.5, §8 property 2).
//!
//! At most one call to `work` executes per key at any instant. Followers
//! that arrive while a leader is in flight await the leader's result
//! instead of issuing a redundant upstream call.

use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

pub type FlightResult = Result<Bytes, Arc<str>>;

pub struct SingleFlightGroup {
    in_flight: DashMap<String, Arc<AsyncMutex<Option<FlightResult>>>>,
}

impl SingleFlightGroup {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    pub async fn run<F, Fut>(&self, key: &str, work: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult>,
    {
        let slot = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone();

        let mut guard = slot.lock().await;
        if let Some(result) = guard.as_ref() {
            return result.clone();
        }

        let result = work().await;
        *guard = Some(result.clone());
        drop(guard);

        self.in_flight
            .remove_if(key, |_, existing| Arc::ptr_eq(existing, &slot));

        result
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl Default for SingleFlightGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_for_the_same_key_share_one_upstream_call() {
        let group = Arc::new(SingleFlightGroup::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let group = group.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                group
                    .run("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Bytes::from_static(b"result"))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Bytes::from_static(b"result"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_shared_and_not_cached_after_completion() {
        let group = SingleFlightGroup::new();
        let result = group
            .run("k", || async { Err::<Bytes, Arc<str>>(Arc::from("boom")) })
            .await;
        assert!(result.is_err());
        assert_eq!(group.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let group = SingleFlightGroup::new();
        let a = group
            .run("a", || async { Ok(Bytes::from_static(b"a")) })
            .await
            .unwrap();
        let b = group
            .run("b", || async { Ok(Bytes::from_static(b"b")) })
            .await
            .unwrap();
        assert_eq!(a, Bytes::from_static(b"a"));
        assert_eq!(b, Bytes::from_static(b"b"));
    }
}
