//! Keyed query cache with single-flight fetching.
//!
//! Each [`QueryKey`] owns one entry. An entry holds the last successful
//! value, the last error, and at most one in-flight fetch. Concurrent
//! callers for the same key share that fetch instead of starting their own.
//!
//! Entries are mutated only under the map lock, and the lock is never held
//! across an `.await`.
//!
//! Every fetch is driven by a spawned task as well as by its callers, so it
//! settles into the cache even when all callers go away. Calls must be made
//! from inside a Tokio runtime.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::key::QueryKey;
use crate::options::QueryOptions;
use crate::retry::{with_retry, Retryable};

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;
type EntryMap<V, E> = HashMap<QueryKey, Entry<V, E>>;

struct InFlight<V, E> {
    id: u64,
    future: SharedFetch<V, E>,
}

/// Where an entry is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
    /// A fetch is running and there is no fresh data to serve.
    Pending,
    Fresh,
    /// Data is present but past its freshness window or invalidated.
    Stale,
    /// The last fetch failed and there is no data to fall back on.
    Failed,
}

/// Cached data plus whether it should be revalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub data: V,
    pub is_stale: bool,
}

/// Snapshot of an entry for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<V, E> {
    pub data: Option<V>,
    pub error: Option<E>,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub is_fetching: bool,
    pub is_invalidated: bool,
    pub phase: EntryPhase,
}

struct Entry<V, E> {
    data: Option<V>,
    error: Option<E>,
    updated_at: Option<Instant>,
    updated_at_utc: Option<DateTime<Utc>>,
    invalidated: bool,
    stale_time: Duration,
    gc_time: Duration,
    /// Last write of data or error; retention counts from here.
    touched_at: Instant,
    in_flight: Option<InFlight<V, E>>,
}

impl<V: Clone, E: Clone> Entry<V, E> {
    fn new(options: &QueryOptions, now: Instant) -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            updated_at_utc: None,
            invalidated: false,
            stale_time: options.stale_time,
            gc_time: options.gc_time,
            touched_at: now,
            in_flight: None,
        }
    }

    fn apply_options(&mut self, options: &QueryOptions) {
        self.stale_time = options.stale_time;
        self.gc_time = options.gc_time;
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match (&self.data, self.updated_at) {
            (Some(_), Some(at)) => !self.invalidated && now.duration_since(at) < self.stale_time,
            _ => false,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.in_flight.is_none() && now.duration_since(self.touched_at) >= self.gc_time
    }

    fn write_data(&mut self, data: V, now: Instant) {
        self.data = Some(data);
        self.error = None;
        self.updated_at = Some(now);
        self.updated_at_utc = Some(Utc::now());
        self.invalidated = false;
        self.touched_at = now;
    }

    fn phase(&self, now: Instant) -> EntryPhase {
        if self.is_fresh(now) {
            EntryPhase::Fresh
        } else if self.in_flight.is_some() {
            EntryPhase::Pending
        } else if self.data.is_some() {
            EntryPhase::Stale
        } else if self.error.is_some() {
            EntryPhase::Failed
        } else {
            EntryPhase::Pending
        }
    }

    fn state(&self, now: Instant) -> QueryState<V, E> {
        QueryState {
            data: self.data.clone(),
            error: self.error.clone(),
            data_updated_at: self.updated_at_utc,
            is_fetching: self.in_flight.is_some(),
            is_invalidated: self.invalidated,
            phase: self.phase(now),
        }
    }
}

pub struct QueryCache<V, E> {
    entries: Arc<Mutex<EntryMap<V, E>>>,
    next_fetch_id: AtomicU64,
}

impl<V, E> Default for QueryCache<V, E> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_fetch_id: AtomicU64::new(1),
        }
    }
}

impl<V, E> QueryCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Retryable + Display + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return fresh cached data for `key`, or join/start a fetch.
    ///
    /// At most one fetch per key runs at a time. The fetch applies
    /// `options.retry` before settling.
    pub async fn fetch<F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<V, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.run(key, options, fetcher, false).await
    }

    /// Like [`fetch`](Self::fetch) but ignores freshness. An in-flight fetch
    /// for the key is still joined rather than duplicated.
    pub async fn refetch<F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<V, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.run(key, options, fetcher, true).await
    }

    async fn run<F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
        force: bool,
    ) -> Result<V, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (id, future, started) = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            Self::evict_if_expired(&mut entries, &key, now);

            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(options, now));
            entry.apply_options(options);

            if !force && entry.is_fresh(now) {
                if let Some(data) = &entry.data {
                    debug!(%key, "Cache hit");
                    return Ok(data.clone());
                }
            }

            match &entry.in_flight {
                Some(in_flight) => {
                    debug!(%key, "Joining in-flight fetch");
                    (in_flight.id, in_flight.future.clone(), false)
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let retry = options.retry.clone();
                    let future = async move { with_retry(&retry, fetcher).await }
                        .boxed()
                        .shared();
                    debug!(%key, id, "Starting fetch");
                    entry.in_flight = Some(InFlight {
                        id,
                        future: future.clone(),
                    });
                    (id, future, true)
                }
            }
        };

        if started {
            self.drive(key.clone(), id, future.clone());
        }

        let result = future.await;
        Self::settle(&self.entries, &key, id, &result);
        result
    }

    /// Keep fetch `id` running to completion without any caller polling it.
    fn drive(&self, key: QueryKey, id: u64, future: SharedFetch<V, E>) {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let result = future.await;
            Self::settle(&entries, &key, id, &result);
        });
    }

    /// Record the outcome of fetch `id`. The first to settle wins; anyone
    /// else sharing the same fetch finds nothing to do. A fetch detached by
    /// invalidation or removal settles nothing.
    fn settle(entries: &Mutex<EntryMap<V, E>>, key: &QueryKey, id: u64, result: &Result<V, E>) {
        let mut entries = entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            return;
        }

        let now = Instant::now();
        entry.in_flight = None;
        match result {
            Ok(data) => entry.write_data(data.clone(), now),
            Err(e) => {
                debug!(%key, error = %e, "Fetch failed");
                entry.error = Some(e.clone());
                entry.touched_at = now;
            }
        }

        if entry.gc_time.is_zero() {
            debug!(%key, "Dropping unretained entry");
            entries.remove(key);
        }
    }

    fn evict_if_expired(entries: &mut EntryMap<V, E>, key: &QueryKey, now: Instant) {
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            debug!(%key, "Evicting expired entry");
            entries.remove(key);
        }
    }

    /// Write `data` as fresh, as if a fetch had just returned it.
    pub fn set_query_data(&self, key: QueryKey, data: V, options: &QueryOptions) {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let entry = entries
            .entry(key)
            .or_insert_with(|| Entry::new(options, now));
        entry.apply_options(options);
        entry.write_data(data, now);
    }

    /// Cached data regardless of freshness.
    pub fn get_query_data(&self, key: &QueryKey) -> Option<V> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key, Instant::now());
        entries.get(key).and_then(|e| e.data.clone())
    }

    /// Cached data with its staleness, for serving while revalidating.
    pub fn get_cached(&self, key: &QueryKey) -> Option<Cached<V>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::evict_if_expired(&mut entries, key, now);
        let entry = entries.get(key)?;
        let data = entry.data.clone()?;
        Some(Cached {
            data,
            is_stale: !entry.is_fresh(now),
        })
    }

    pub fn get_query_state(&self, key: &QueryKey) -> Option<QueryState<V, E>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::evict_if_expired(&mut entries, key, now);
        entries.get(key).map(|e| e.state(now))
    }

    pub fn phase(&self, key: &QueryKey) -> Option<EntryPhase> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::evict_if_expired(&mut entries, key, now);
        entries.get(key).map(|e| e.phase(now))
    }

    /// Mark every entry under `prefix` stale. Data stays readable; the next
    /// fetch for each entry goes to the network. Returns the number marked.
    ///
    /// A fetch already running for a matched entry is detached: its callers
    /// still get its result, but it no longer settles into the entry, and the
    /// next read starts a new fetch.
    pub fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));

        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                if let Some(in_flight) = entry.in_flight.take() {
                    debug!(%key, id = in_flight.id, "Detaching in-flight fetch");
                }
                count += 1;
            }
        }
        debug!(%prefix, count, "Invalidated queries");
        count
    }

    /// Drop every entry under `prefix`. Returns the number removed.
    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove entries whose retention window has passed. Returns the number
    /// removed.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Evicted expired entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
