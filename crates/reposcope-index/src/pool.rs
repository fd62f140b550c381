//! Bounded-concurrency execution of one async call per item.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};

/// How a [`GroupScheduler`] admits new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backpressure {
    /// Fixed groups of `width`; group N+1 starts after every call of group N settles.
    #[default]
    Grouped,
    /// At most `width` calls in flight; a new call starts as soon as one settles.
    Sliding,
}

/// A call exceeded the scheduler's per-call timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeout(pub Duration);

#[derive(Debug, Clone)]
pub struct GroupScheduler {
    width: usize,
    mode: Backpressure,
    call_timeout: Option<Duration>,
}

impl GroupScheduler {
    /// A width of 0 is treated as 1.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            mode: Backpressure::default(),
            call_timeout: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Backpressure) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Runs `op` once per item. The output is index-aligned with `items`
    /// regardless of completion order, and one failing call never affects
    /// the others.
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<Result<T, E>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CallTimeout>,
    {
        let total = items.len();
        match self.mode {
            Backpressure::Grouped => {
                let mut out = Vec::with_capacity(total);
                let mut iter = items.into_iter();
                let mut group = 0usize;
                loop {
                    let batch: Vec<I> = iter.by_ref().take(self.width).collect();
                    if batch.is_empty() {
                        break;
                    }
                    tracing::debug!(group, size = batch.len(), total, "running group");
                    let futs = batch.into_iter().map(|item| self.guarded(op(item)));
                    out.extend(futures::future::join_all(futs).await);
                    group += 1;
                }
                out
            }
            Backpressure::Sliding => {
                let stream = futures::stream::iter(items.into_iter().map(|item| self.guarded(op(item))));
                stream.buffered(self.width).collect().await
            }
        }
    }

    async fn guarded<T, E, Fut>(&self, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<CallTimeout>,
    {
        bounded(self.call_timeout, fut).await
    }
}

/// Awaits `fut`, failing with [`CallTimeout`] once `limit` elapses.
pub async fn bounded<T, E, Fut>(limit: Option<Duration>, fut: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<CallTimeout>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(CallTimeout(limit).into()),
        },
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(usize),
        Timeout,
    }

    impl From<CallTimeout> for TestError {
        fn from(_: CallTimeout) -> Self {
            Self::Timeout
        }
    }

    struct Tracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Tracker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }

        async fn call(&self, i: usize, delay_ms: u64) -> Result<usize, TestError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if i % 7 == 5 {
                Err(TestError::Failed(i))
            } else {
                Ok(i * 2)
            }
        }
    }

    #[tokio::test]
    async fn grouped_preserves_order_and_isolates_failures() {
        let tracker = Tracker::new();
        let sched = GroupScheduler::new(10);
        // Later items finish first within each group.
        let results = sched
            .run((0..25).collect(), |i| {
                let t = Arc::clone(&tracker);
                async move { t.call(i, 30 - u64::try_from(i % 10).unwrap()).await }
            })
            .await;

        assert_eq!(results.len(), 25);
        assert_eq!(results[5], Err(TestError::Failed(5)));
        assert_eq!(results[12], Err(TestError::Failed(12)));
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[24], Ok(48));
        assert!(tracker.peak.load(Ordering::SeqCst) <= 10);
    }

    #[tokio::test]
    async fn grouped_waits_for_whole_group() {
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));
        let finished = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sched = GroupScheduler::new(2);
        let _ = sched
            .run(vec![(0usize, 40u64), (1, 1), (2, 1), (3, 1)], |(i, delay)| {
                let started = Arc::clone(&started);
                let finished = Arc::clone(&finished);
                async move {
                    started.lock().unwrap().push(i);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    finished.lock().unwrap().push(i);
                    Ok::<_, TestError>(i)
                }
            })
            .await;

        let finished = finished.lock().unwrap().clone();
        let started = started.lock().unwrap().clone();
        // Item 2 must not start before slow item 0 has finished.
        let pos_0_done = finished.iter().position(|&i| i == 0).unwrap();
        assert_eq!(pos_0_done, 1);
        assert_eq!(started, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn sliding_bounds_in_flight_and_preserves_order() {
        let tracker = Tracker::new();
        let sched = GroupScheduler::new(3).with_mode(Backpressure::Sliding);
        let results = sched
            .run((0..12).collect(), |i| {
                let t = Arc::clone(&tracker);
                async move { t.call(i, 5).await }
            })
            .await;

        assert_eq!(results.len(), 12);
        assert_eq!(results[1], Ok(2));
        assert_eq!(results[5], Err(TestError::Failed(5)));
        assert!(tracker.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn timeout_is_per_item_failure() {
        let sched = GroupScheduler::new(4).with_call_timeout(Some(Duration::from_millis(20)));
        let results = sched
            .run(vec![1u64, 500, 1], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, TestError>(delay)
            })
            .await;

        assert_eq!(results, vec![Ok(1), Err(TestError::Timeout), Ok(1)]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let sched = GroupScheduler::new(5);
        let results = sched
            .run(Vec::<usize>::new(), |i| async move { Ok::<_, TestError>(i) })
            .await;
        assert!(results.is_empty());
    }

    #[test]
    fn zero_width_is_clamped() {
        assert_eq!(GroupScheduler::new(0).width(), 1);
    }

    #[test]
    fn backpressure_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct W {
            mode: Backpressure,
        }
        let w: W = serde_json::from_str(r#"{"mode":"sliding"}"#).unwrap();
        assert_eq!(w.mode, Backpressure::Sliding);
    }
}
