use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use domain::PlaylistOutcome;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_REVALIDATE_AFTER: Duration = Duration::from_secs(20);

/// How long a generated page stays fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidatePolicy {
    pub revalidate_after: Duration,
}

impl Default for RevalidatePolicy {
    fn default() -> Self {
        Self {
            revalidate_after: DEFAULT_REVALIDATE_AFTER,
        }
    }
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served a snapshot still inside its window
    Hit,
    /// Served an expired snapshot while a regeneration runs in the background
    Stale,
    /// Nothing was cached; generated in the request path
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub outcome: Arc<PlaylistOutcome>,
    pub status: CacheStatus,
}

#[derive(Debug, Clone)]
struct Entry {
    outcome: Arc<PlaylistOutcome>,
    generated_at: Instant,
}

/// Stale-while-revalidate holder for the playlist page data
///
/// The previous outcome keeps serving until a regeneration produces a new
/// snapshot. Failed regenerations and `NotFound` results never evict a
/// snapshot that was found earlier.
pub struct SnapshotCache {
    policy: RevalidatePolicy,
    entry: RwLock<Option<Entry>>,
    generating: Mutex<()>,
    revalidating: AtomicBool,
}

impl SnapshotCache {
    pub fn new(policy: RevalidatePolicy) -> Self {
        Self {
            policy,
            entry: RwLock::new(None),
            generating: Mutex::new(()),
            revalidating: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> RevalidatePolicy {
        self.policy
    }

    /// Whether a background regeneration is in flight
    pub fn is_revalidating(&self) -> bool {
        self.revalidating.load(Ordering::Acquire)
    }

    /// Serve the cached outcome, generating or revalidating as the window requires
    ///
    /// `generate` is only called when a generation is actually started. Errors
    /// are returned to the caller only on a miss.
    pub async fn get_or_generate<G, E>(self: &Arc<Self>, generate: G) -> Result<Served, E>
    where
        G: Fn() -> BoxFuture<'static, Result<PlaylistOutcome, E>>,
        E: fmt::Display + Send + 'static,
    {
        if let Some(served) = self.lookup(&generate).await {
            return Ok(served);
        }

        let _guard = self.generating.lock().await;
        // Another request may have generated while we waited.
        if let Some(served) = self.lookup(&generate).await {
            return Ok(served);
        }

        debug!("no cached playlist, generating");
        let outcome = generate().await?;
        let outcome = Arc::new(outcome);
        *self.entry.write().await = Some(Entry {
            outcome: Arc::clone(&outcome),
            generated_at: Instant::now(),
        });

        Ok(Served {
            outcome,
            status: CacheStatus::Miss,
        })
    }

    async fn lookup<G, E>(self: &Arc<Self>, generate: &G) -> Option<Served>
    where
        G: Fn() -> BoxFuture<'static, Result<PlaylistOutcome, E>>,
        E: fmt::Display + Send + 'static,
    {
        let entry = self.entry.read().await.clone()?;
        if entry.generated_at.elapsed() < self.policy.revalidate_after {
            return Some(Served {
                outcome: entry.outcome,
                status: CacheStatus::Hit,
            });
        }

        self.spawn_revalidation(generate);
        Some(Served {
            outcome: entry.outcome,
            status: CacheStatus::Stale,
        })
    }

    fn spawn_revalidation<G, E>(self: &Arc<Self>, generate: &G)
    where
        G: Fn() -> BoxFuture<'static, Result<PlaylistOutcome, E>>,
        E: fmt::Display + Send + 'static,
    {
        if self
            .revalidating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let guard = RevalidationGuard(Arc::clone(self));
        debug!("playlist snapshot is stale, revalidating in background");
        let pending = generate();
        tokio::spawn(async move {
            match pending.await {
                Ok(outcome) => guard.0.commit(outcome).await,
                Err(err) => warn!(error = %err, "playlist revalidation failed, keeping previous snapshot"),
            }
        });
    }

    async fn commit(&self, outcome: PlaylistOutcome) {
        let mut entry = self.entry.write().await;
        let previous_found = entry.as_ref().is_some_and(|e| e.outcome.is_found());
        if previous_found && !outcome.is_found() {
            warn!("revalidation found no playlist, keeping previous snapshot");
            return;
        }

        info!(
            items = outcome.snapshot().map(|s| s.len()).unwrap_or(0),
            "playlist snapshot regenerated"
        );
        *entry = Some(Entry {
            outcome: Arc::new(outcome),
            generated_at: Instant::now(),
        });
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(RevalidatePolicy::default())
    }
}

/// Clears the in-flight flag when a background revalidation ends, panics included
struct RevalidationGuard(Arc<SnapshotCache>);

impl Drop for RevalidationGuard {
    fn drop(&mut self) {
        self.0.revalidating.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ResourceRef, VideoRecord};
    use std::sync::atomic::AtomicUsize;

    fn found(titles: &[&str]) -> PlaylistOutcome {
        PlaylistOutcome::from_records(
            titles
                .iter()
                .map(|title| VideoRecord {
                    id: format!("item-{title}"),
                    title: title.to_string(),
                    description: String::new(),
                    channel_title: "Mock Channel".to_string(),
                    thumbnail_url: None,
                    position: 0,
                    resource: ResourceRef {
                        kind: "youtube#video".to_string(),
                        video_id: format!("vid-{title}"),
                    },
                })
                .collect(),
        )
    }

    fn first_title(served: &Served) -> String {
        served.outcome.snapshot().unwrap().first().title.clone()
    }

    /// Generator that yields the queued results in order, counting calls
    fn scripted(
        calls: Arc<AtomicUsize>,
        results: Vec<Result<PlaylistOutcome, String>>,
        delay: Duration,
    ) -> impl Fn() -> BoxFuture<'static, Result<PlaylistOutcome, String>> {
        let results = Arc::new(results);
        move || -> BoxFuture<'static, Result<PlaylistOutcome, String>> {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let result = results[n.min(results.len() - 1)].clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                result
            })
        }
    }

    async fn settle(cache: &SnapshotCache) {
        while cache.is_revalidating() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn miss_then_hit_within_window() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(calls.clone(), vec![Ok(found(&["A"]))], Duration::ZERO);

        let first = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        tokio::time::advance(Duration::from_secs(19)).await;
        let second = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_serves_previous_then_swaps_in_new_snapshot() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(
            calls.clone(),
            vec![Ok(found(&["A"])), Ok(found(&["B"]))],
            Duration::ZERO,
        );

        cache.get_or_generate(&generate).await.unwrap();
        tokio::time::advance(Duration::from_secs(21)).await;

        let stale = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(stale.status, CacheStatus::Stale);
        assert_eq!(first_title(&stale), "A");

        settle(&cache).await;
        let fresh = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(fresh.status, CacheStatus::Hit);
        assert_eq!(first_title(&fresh), "B");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_or_empty_revalidation_keeps_previous_snapshot() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(
            calls.clone(),
            vec![
                Ok(found(&["A"])),
                Err("upstream down".to_string()),
                Ok(PlaylistOutcome::NotFound),
            ],
            Duration::ZERO,
        );

        cache.get_or_generate(&generate).await.unwrap();
        for _ in 0..2 {
            tokio::time::advance(Duration::from_secs(21)).await;
            let served = cache.get_or_generate(&generate).await.unwrap();
            assert_eq!(served.status, CacheStatus::Stale);
            assert_eq!(first_title(&served), "A");
            settle(&cache).await;
        }

        let served = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(first_title(&served), "A");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_revalidation_does_not_block_later_ones() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let generate = move || -> BoxFuture<'static, Result<PlaylistOutcome, String>> {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match n {
                    0 => Ok(found(&["A"])),
                    1 => panic!("generator blew up"),
                    _ => Ok(found(&["B"])),
                }
            })
        };

        cache.get_or_generate(&generate).await.unwrap();
        tokio::time::advance(Duration::from_secs(21)).await;
        let stale = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(stale.status, CacheStatus::Stale);
        settle(&cache).await;
        assert!(!cache.is_revalidating());

        let still_stale = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(still_stale.status, CacheStatus::Stale);
        assert_eq!(first_title(&still_stale), "A");
        settle(&cache).await;

        let fresh = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(fresh.status, CacheStatus::Hit);
        assert_eq!(first_title(&fresh), "B");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_background_revalidation_at_a_time() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(calls.clone(), vec![Ok(found(&["A"]))], Duration::from_secs(5));

        cache.get_or_generate(&generate).await.unwrap();
        tokio::time::advance(Duration::from_secs(21)).await;

        for _ in 0..3 {
            let served = cache.get_or_generate(&generate).await.unwrap();
            assert_eq!(served.status, CacheStatus::Stale);
        }
        assert!(cache.is_revalidating());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        settle(&cache).await;
    }

    #[tokio::test(start_paused = true)]
    async fn miss_error_propagates_and_caches_nothing() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(
            calls.clone(),
            vec![Err("boom".to_string()), Ok(found(&["A"]))],
            Duration::ZERO,
        );

        assert_eq!(cache.get_or_generate(&generate).await.unwrap_err(), "boom");
        let served = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(served.status, CacheStatus::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_cached_and_replaced_on_revalidation() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(
            calls.clone(),
            vec![Ok(PlaylistOutcome::NotFound), Ok(found(&["A"]))],
            Duration::ZERO,
        );

        let served = cache.get_or_generate(&generate).await.unwrap();
        assert!(!served.outcome.is_found());
        let served = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(served.status, CacheStatus::Hit);

        tokio::time::advance(Duration::from_secs(21)).await;
        cache.get_or_generate(&generate).await.unwrap();
        settle(&cache).await;
        let served = cache.get_or_generate(&generate).await.unwrap();
        assert_eq!(first_title(&served), "A");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_generation() {
        let cache = Arc::new(SnapshotCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let generate = scripted(calls.clone(), vec![Ok(found(&["A"]))], Duration::from_secs(1));

        let (a, b) = tokio::join!(cache.get_or_generate(&generate), cache.get_or_generate(&generate));
        let mut statuses = [a.unwrap().status, b.unwrap().status];
        statuses.sort_by_key(|s| s.as_str());
        assert_eq!(statuses, [CacheStatus::Hit, CacheStatus::Miss]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
