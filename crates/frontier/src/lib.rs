//! The scheduler: per-host FIFO queues plus a min-heap of host-ready times,
//! handing URLs to workers while honoring a per-host politeness delay.
//!
//! One mutex and one notify guard every mutable field. `get_tbd_url` is the
//! single suspension point in the system: it waits with a timeout equal to
//! the nearest host's ready time, releasing the lock while waiting.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

use crawler_core::DiscoveryRecord;
use crawler_parser::{canonicalize, is_valid};
use crawler_storage::{hash_url, DiscoveryStore};

/// Default minimum spacing between two handouts for the same host.
pub const DEFAULT_POLITENESS_DELAY: Duration = Duration::from_millis(500);

struct HeapEntry {
    ready_at: Instant,
    host: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.host == other.host
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ready_at
            .cmp(&other.ready_at)
            .then_with(|| self.host.cmp(&other.host))
    }
}

struct State {
    store: DiscoveryStore,
    buckets: HashMap<String, VecDeque<String>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    host_ready_time: HashMap<String, Instant>,
    inflight: u64,
    closed: bool,
}

/// What to do after one attempt at popping the heap under the lock.
enum Next {
    Got(String),
    /// The heap was empty and nothing is inflight: frontier just closed.
    Closed,
    WaitUntil(Instant),
    WaitForever,
}

fn try_pop(state: &mut State, politeness_delay: Duration) -> Next {
    loop {
        let ready_at = match state.heap.peek() {
            Some(Reverse(head)) => head.ready_at,
            None => {
                if state.inflight == 0 {
                    state.closed = true;
                    return Next::Closed;
                }
                return Next::WaitForever;
            }
        };

        let now = Instant::now();
        if ready_at > now {
            return Next::WaitUntil(ready_at);
        }

        let Reverse(popped) = state.heap.pop().expect("heap non-empty, just peeked");
        let host = popped.host;

        let bucket = match state.buckets.get_mut(&host) {
            Some(b) => b,
            None => continue, // stale heap entry left by a prior pop, retry
        };
        let url = match bucket.pop_front() {
            Some(u) => u,
            None => {
                state.buckets.remove(&host);
                continue;
            }
        };

        state.inflight += 1;
        let next_ready = now + politeness_delay;
        state.host_ready_time.insert(host.clone(), next_ready);
        if bucket.is_empty() {
            state.buckets.remove(&host);
        } else {
            state.heap.push(Reverse(HeapEntry { ready_at: next_ready, host }));
        }
        return Next::Got(url);
    }
}

fn host_of(canonical_url: &str) -> String {
    url::Url::parse(canonical_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

pub struct Frontier {
    state: Mutex<State>,
    notify: Notify,
    allowed_host_suffixes: Vec<String>,
    politeness_delay: Duration,
}

impl Frontier {
    /// Opens the discovery store at `save_file`, optionally wiping it first,
    /// replays any incomplete records into the schedule, and falls back to
    /// `seeds` if the store is empty after replay.
    pub async fn open(
        save_file: &Path,
        restart: bool,
        seeds: &[String],
        allowed_host_suffixes: Vec<String>,
        politeness_delay: Duration,
    ) -> anyhow::Result<Self> {
        let store = if restart {
            DiscoveryStore::fresh(save_file)?
        } else {
            DiscoveryStore::open(save_file)?
        };

        let mut buckets: HashMap<String, VecDeque<String>> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let now = Instant::now();
        let mut replayed = 0usize;

        if !restart {
            for (_, record) in store.iter() {
                if record.completed || !is_valid(&record.url, &allowed_host_suffixes) {
                    continue;
                }
                let host = host_of(&record.url);
                let bucket = buckets.entry(host.clone()).or_default();
                let was_empty = bucket.is_empty();
                bucket.push_back(record.url);
                if was_empty {
                    heap.push(Reverse(HeapEntry { ready_at: now, host }));
                }
                replayed += 1;
            }
        }
        info!(replayed, restart, "frontier opened");

        let frontier = Self {
            state: Mutex::new(State {
                store,
                buckets,
                heap,
                host_ready_time: HashMap::new(),
                inflight: 0,
                closed: false,
            }),
            notify: Notify::new(),
            allowed_host_suffixes,
            politeness_delay,
        };

        if restart || replayed == 0 {
            for seed in seeds {
                frontier.add_url(seed).await;
            }
        }

        Ok(frontier)
    }

    /// Canonicalizes and admits `raw_url`; no-op if already discovered or
    /// rejected by canonicalization / admission.
    pub async fn add_url(&self, raw_url: &str) {
        let Some(canonical) = canonicalize(raw_url) else {
            return;
        };
        if !is_valid(&canonical, &self.allowed_host_suffixes) {
            return;
        }
        let hash = hash_url(&canonical);
        let host = host_of(&canonical);

        let mut state = self.state.lock().await;
        if state.store.has(hash) {
            return;
        }
        if let Err(e) = state.store.put(
            hash,
            &DiscoveryRecord {
                url: canonical.clone(),
                completed: false,
            },
        ) {
            warn!(error = %e, url = %canonical, "failed to persist discovered url");
            return;
        }

        let bucket = state.buckets.entry(host.clone()).or_default();
        let was_empty = bucket.is_empty();
        bucket.push_back(canonical);
        if was_empty {
            let ready_at = state
                .host_ready_time
                .get(&host)
                .copied()
                .unwrap_or_else(Instant::now);
            state.heap.push(Reverse(HeapEntry { ready_at, host }));
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Blocks until a URL is ready to crawl or the frontier has quiesced.
    /// Returns `None` exactly once termination is decided; every subsequent
    /// call (from any worker) also returns `None` immediately.
    pub async fn get_tbd_url(&self) -> Option<String> {
        loop {
            let next = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                let next = try_pop(&mut state, self.politeness_delay);
                if matches!(next, Next::Closed) {
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
                next
            };

            match next {
                Next::Got(url) => return Some(url),
                Next::Closed => unreachable!("handled above"),
                Next::WaitUntil(ready_at) => {
                    let notified = self.notify.notified();
                    let sleep_for = ready_at.saturating_duration_since(Instant::now());
                    tokio::select! {
                        _ = tokio::time::sleep(sleep_for) => {}
                        _ = notified => {}
                    }
                }
                Next::WaitForever => {
                    self.notify.notified().await;
                }
            }
        }
    }

    /// Marks a previously handed-out URL complete, decrementing inflight and
    /// waking one waiter. Logs and returns without effect if the URL is
    /// unknown to the store — an invariant violation that should not happen.
    pub async fn mark_url_complete(&self, raw_url: &str) {
        let Some(canonical) = canonicalize(raw_url) else {
            warn!(url = raw_url, "mark_url_complete on uncanonicalizable url");
            return;
        };
        let hash = hash_url(&canonical);

        let mut state = self.state.lock().await;
        if !state.store.has(hash) {
            warn!(url = %canonical, "mark_url_complete on unknown url");
            return;
        }
        if let Err(e) = state.store.put(
            hash,
            &DiscoveryRecord {
                url: canonical,
                completed: true,
            },
        ) {
            warn!(error = %e, "failed to persist completion");
        }
        state.inflight = state.inflight.saturating_sub(1);
        drop(state);
        self.notify.notify_one();
    }

    /// Latches closed if the frontier is already quiescent; idempotent.
    pub async fn close_if_done(&self) {
        let mut state = self.state.lock().await;
        if state.heap.is_empty() && state.inflight == 0 && !state.closed {
            state.closed = true;
            drop(state);
            self.notify.notify_waiters();
        }
    }

    /// Forces shutdown: latches closed, wakes every waiter, flushes the store.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            state.closed = true;
        }
        self.notify.notify_waiters();
        let mut state = self.state.lock().await;
        if let Err(e) = state.store.flush() {
            warn!(error = %e, "failed to flush discovery store on close");
        }
    }

    pub async fn inflight_count(&self) -> u64 {
        self.state.lock().await.inflight
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
