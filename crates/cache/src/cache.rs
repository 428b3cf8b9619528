use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::sync::futures::OwnedNotified;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::{CacheError, CacheKey, EntryRef, EntryStatus, Resolver};

pub const DEFAULT_BUCKETS: usize = 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one file per entry
    pub dir: PathBuf,
    /// How long a filled entry may be served before it is fetched again
    pub ttl: Duration,
    pub buckets: usize,
}

impl CacheConfig {
    pub fn new<P: Into<PathBuf>>(dir: P, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl, buckets: DEFAULT_BUCKETS }
    }

    #[must_use]
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }
}

#[derive(Debug)]
struct Table {
    buckets: Vec<Vec<Entry>>,
    /// Users across all entries
    active: usize,
}

impl Table {
    fn new(buckets: usize) -> Self {
        Self { buckets: (0..buckets.max(1)).map(|_| Vec::new()).collect(), active: 0 }
    }

    fn find(&self, key: &CacheKey) -> Option<&Entry> {
        self.buckets[key.bucket(self.buckets.len())].iter().find(|entry| entry.key == *key)
    }

    fn find_mut(&mut self, key: &CacheKey) -> Option<&mut Entry> {
        let index = key.bucket(self.buckets.len());
        self.buckets[index].iter_mut().find(|entry| entry.key == *key)
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    fn drain(&mut self) -> Vec<Entry> {
        self.buckets.iter_mut().flat_map(|bucket| bucket.drain(..)).collect()
    }
}

/// What a caller of [`Cache::get`] does next, decided under the table lock.
enum Step {
    Read(PathBuf),
    Fill(EntryRef),
    Wait(OwnedNotified),
}

/// A disk backed response cache with single-flight fills.
///
/// Entries live in a table of hash buckets behind one mutex. The lock is only
/// held to move an entry between states and never across file I/O or the
/// resolver; callers that can't proceed wait on the entry's [`Notify`].
///
/// For one key at most one resolver runs at a time, and the backing file is
/// never deleted or rewritten while anyone is reading it.
#[derive(Debug)]
pub struct Cache {
    config: CacheConfig,
    table: Mutex<Table>,
    /// Woken when `active` drops to zero
    idle: Notify,
}

impl Cache {
    /// Creates the cache, and its directory if missing.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&config.dir)?;
        info!(dir = %config.dir.display(), ttl = ?config.ttl, buckets = config.buckets, "cache created");

        let table = Mutex::new(Table::new(config.buckets));
        Ok(Self { config, table, idle: Notify::new() })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cached bytes for `fingerprint`, filling the entry through
    /// `resolver` when it is missing or expired.
    ///
    /// Concurrent callers for the same fingerprint share one fill: the first
    /// claims the entry and runs the resolver, the others wait and then read
    /// what it stored.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Resolve`] if the resolver failed; the entry stays unfilled
    /// - [`CacheError::NotFilled`] if the resolver returned without calling [`Cache::set`]
    /// - [`CacheError::Io`] if the backing file can't be removed or read
    pub async fn get<R>(&self, fingerprint: &str, resolver: &R) -> Result<Bytes, CacheError>
    where
        R: Resolver + Sync + ?Sized,
    {
        let key = CacheKey::new(fingerprint);

        loop {
            match self.next_step(&key) {
                Step::Read(path) => {
                    let _user = UserGuard { cache: self, key: &key };
                    debug!(key = %key, "cache hit");
                    return Ok(Bytes::from(tokio::fs::read(&path).await?));
                }
                Step::Fill(entry) => return self.fill(&key, entry, resolver).await,
                Step::Wait(notified) => notified.await,
            }
        }
    }

    /// Stores `data` as the content of `entry`.
    ///
    /// Only valid from inside the resolver that is filling `entry`.
    pub async fn set(&self, entry: &EntryRef, data: &[u8]) -> Result<(), CacheError> {
        let claimed = self.lock().find(entry.key()).is_some_and(|e| e.status == EntryStatus::InProgress);
        if !claimed {
            return Err(CacheError::not_claimed(entry.key()));
        }

        tokio::fs::write(entry.path(), data).await?;
        debug!(key = %entry.key(), size = data.len(), "stored cache entry");
        Ok(())
    }

    /// Number of readers and resolvers currently using any entry.
    pub fn active_users(&self) -> usize {
        self.lock().active
    }

    /// Number of users of the entry for `fingerprint`, `None` if there is no such entry.
    pub fn entry_users(&self, fingerprint: &str) -> Option<usize> {
        self.lock().find(&CacheKey::new(fingerprint)).map(|entry| entry.users)
    }

    pub fn status(&self, fingerprint: &str) -> Option<EntryStatus> {
        self.lock().find(&CacheKey::new(fingerprint)).map(|entry| entry.status)
    }

    /// Number of entries in the table, filled or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until no one uses the cache, then drops every entry and deletes the
    /// backing files.
    ///
    /// Every file is attempted; the first failure is returned.
    pub async fn shutdown(&self) -> Result<(), CacheError> {
        let entries = loop {
            let notified = {
                let mut table = self.lock();
                if table.active == 0 {
                    break table.drain();
                }
                info!(active = table.active, "waiting for cache users to finish");
                self.idle.notified()
            };
            notified.await;
        };

        let mut result = Ok(());
        for entry in &entries {
            if let Err(e) = remove_file(&entry.path).await {
                warn!(key = %entry.key, cause = %e, "can't remove cache file");
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }

        info!(entries = entries.len(), "cache shut down");
        result
    }

    fn next_step(&self, key: &CacheKey) -> Step {
        let ttl = self.config.ttl;
        let mut table = self.lock();
        let Table { buckets, active } = &mut *table;

        let index = key.bucket(buckets.len());
        let bucket = &mut buckets[index];
        let position = match bucket.iter().position(|entry| entry.key == *key) {
            Some(position) => position,
            None => {
                bucket.push(Entry::new(key.clone(), &self.config.dir));
                bucket.len() - 1
            }
        };
        let entry = &mut bucket[position];

        if matches!(entry.status, EntryStatus::Ok { filled_at } if filled_at.elapsed() > ttl) {
            debug!(key = %key, "cache entry expired");
            entry.status = EntryStatus::Invalid;
        }

        match entry.status {
            EntryStatus::Ok { .. } => {
                entry.users += 1;
                *active += 1;
                Step::Read(entry.path.clone())
            }
            EntryStatus::Invalid if entry.users == 0 => {
                entry.users += 1;
                *active += 1;
                entry.status = EntryStatus::InProgress;
                Step::Fill(entry.handle())
            }
            EntryStatus::Invalid | EntryStatus::InProgress => Step::Wait(Arc::clone(&entry.notify).notified_owned()),
        }
    }

    async fn fill<R>(&self, key: &CacheKey, entry: EntryRef, resolver: &R) -> Result<Bytes, CacheError>
    where
        R: Resolver + Sync + ?Sized,
    {
        // releasing an unfinished claim puts the entry back to Invalid
        let _user = UserGuard { cache: self, key };
        debug!(key = %key, "cache miss");

        // we are the only user, so the old file is safe to drop
        remove_file(entry.path()).await?;

        let path = entry.path().to_path_buf();
        resolver.resolve(entry).await.map_err(|e| CacheError::resolve(key, e))?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CacheError::not_filled(key)),
            Err(e) => return Err(e.into()),
        };

        self.mark_filled(key);
        Ok(Bytes::from(bytes))
    }

    fn mark_filled(&self, key: &CacheKey) {
        if let Some(entry) = self.lock().find_mut(key) {
            entry.status = EntryStatus::Ok { filled_at: Instant::now() };
            entry.notify.notify_waiters();
        }
    }

    fn release(&self, key: &CacheKey) {
        let mut table = self.lock();

        if let Some(entry) = table.find_mut(key) {
            entry.users = entry.users.saturating_sub(1);

            let abandoned = entry.status == EntryStatus::InProgress;
            if abandoned {
                debug!(key = %key, "cache fill abandoned");
                entry.status = EntryStatus::Invalid;
            }
            if abandoned || entry.users == 0 {
                entry.notify.notify_waiters();
            }
        }

        table.active = table.active.saturating_sub(1);
        if table.active == 0 {
            self.idle.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One counted use of an entry, released on drop so a cancelled caller can't
/// leave an entry claimed forever.
struct UserGuard<'a> {
    cache: &'a Cache,
    key: &'a CacheKey,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(self.key);
    }
}

/// Removes a file, treating a missing one as removed.
async fn remove_file(path: &std::path::Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_resolver;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(10);

    fn cache(dir: &tempfile::TempDir) -> Arc<Cache> {
        Arc::new(Cache::new(CacheConfig::new(dir.path(), TTL)).unwrap())
    }

    /// A resolver that counts its calls and stores `body`.
    fn counting_resolver(cache: Arc<Cache>, calls: Arc<AtomicUsize>, body: &'static [u8]) -> impl Resolver<Error = CacheError> + Sync {
        make_resolver(move |entry: EntryRef| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                cache.set(&entry, body).await
            }
        })
    }

    #[tokio::test]
    async fn concurrent_gets_resolve_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"response");

        let results = join_all((0..16).map(|_| cache.get("a.example/x", &resolver))).await;

        for result in results {
            assert_eq!(&result.unwrap()[..], b"response");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.active_users(), 0);
        assert_eq!(cache.entry_users("a.example/x"), Some(0));
        assert!(matches!(cache.status("a.example/x"), Some(EntryStatus::Ok { .. })));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn file_is_named_by_digest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"response");

        cache.get("a.example/x", &resolver).await.unwrap();

        let path = dir.path().join(CacheKey::new("a.example/x").file_name());
        assert_eq!(std::fs::read(path).unwrap(), b"response");
    }

    #[tokio::test]
    async fn keys_in_one_bucket_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::new(CacheConfig::new(dir.path(), TTL).with_buckets(1)).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let first = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"first");
        let second = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"second");

        assert_eq!(&cache.get("a.example/1", &first).await.unwrap()[..], b"first");
        assert_eq!(&cache.get("a.example/2", &second).await.unwrap()[..], b"second");
        assert_eq!(&cache.get("a.example/1", &second).await.unwrap()[..], b"first");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_fetched_again() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"response");

        cache.get("a.example/x", &resolver).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.get("a.example/x", &resolver).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        cache.get("a.example/x", &resolver).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.active_users(), 0);
    }

    #[tokio::test]
    async fn failed_resolver_leaves_entry_unfilled() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let failing = make_resolver(|_entry: EntryRef| async { Err::<(), _>(io::Error::other("origin down")) });

        let result = cache.get("a.example/x", &failing).await;

        assert!(matches!(result, Err(CacheError::Resolve { .. })));
        assert_eq!(cache.status("a.example/x"), Some(EntryStatus::Invalid));
        assert_eq!(cache.active_users(), 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"response");
        assert_eq!(&cache.get("a.example/x", &resolver).await.unwrap()[..], b"response");
    }

    #[tokio::test]
    async fn resolver_must_store_something() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let lazy = make_resolver(|_entry: EntryRef| async { Ok::<(), CacheError>(()) });

        let result = cache.get("a.example/x", &lazy).await;

        assert!(matches!(result, Err(CacheError::NotFilled { .. })));
        assert_eq!(cache.status("a.example/x"), Some(EntryStatus::Invalid));
        assert_eq!(cache.active_users(), 0);
    }

    #[tokio::test]
    async fn set_outside_a_fill_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let seen = Arc::new(Mutex::new(None));

        let resolver = {
            let cache = Arc::clone(&cache);
            let seen = Arc::clone(&seen);
            make_resolver(move |entry: EntryRef| {
                let cache = Arc::clone(&cache);
                seen.lock().unwrap().replace(entry.clone());
                async move { cache.set(&entry, b"response").await }
            })
        };
        cache.get("a.example/x", &resolver).await.unwrap();

        let entry = seen.lock().unwrap().take().unwrap();
        let result = cache.set(&entry, b"overwrite").await;
        assert!(matches!(result, Err(CacheError::NotClaimed { .. })));
        assert_eq!(&cache.get("a.example/x", &resolver).await.unwrap()[..], b"response");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fill_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let stuck = make_resolver(|_entry: EntryRef| std::future::pending::<Result<(), CacheError>>());

        let result = tokio::time::timeout(Duration::from_secs(1), cache.get("a.example/x", &stuck)).await;
        assert!(result.is_err());

        assert_eq!(cache.status("a.example/x"), Some(EntryStatus::Invalid));
        assert_eq!(cache.entry_users("a.example/x"), Some(0));
        assert_eq!(cache.active_users(), 0);
    }

    #[tokio::test]
    async fn waiters_take_over_after_a_failed_fill() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let calls = Arc::new(AtomicUsize::new(0));

        // the first call fails, every later one succeeds
        let resolver = {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            make_resolver(move |entry: EntryRef| {
                let cache = Arc::clone(&cache);
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::task::yield_now().await;
                    if call == 0 {
                        return Err(CacheError::not_filled(entry.key()));
                    }
                    cache.set(&entry, b"response").await
                }
            })
        };

        let results = join_all((0..4).map(|_| cache.get("a.example/x", &resolver))).await;

        assert_eq!(results.iter().filter(|result| result.is_err()).count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.active_users(), 0);
    }

    #[tokio::test]
    async fn shutdown_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = counting_resolver(Arc::clone(&cache), Arc::clone(&calls), b"response");

        cache.get("a.example/x", &resolver).await.unwrap();
        cache.get("b.example/y", &resolver).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        cache.shutdown().await.unwrap();

        assert!(cache.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_users() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let gate = Arc::new(Notify::new());

        let resolver = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            make_resolver(move |entry: EntryRef| {
                let cache = Arc::clone(&cache);
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    cache.set(&entry, b"response").await
                }
            })
        };

        let get = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get("a.example/x", &resolver).await }
        });
        while cache.active_users() == 0 {
            tokio::task::yield_now().await;
        }

        let shutdown = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.shutdown().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!shutdown.is_finished());

        gate.notify_one();
        assert_eq!(&get.await.unwrap().unwrap()[..], b"response");
        shutdown.await.unwrap().unwrap();

        assert!(cache.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
