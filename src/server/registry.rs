//! Sharded per-client state registry
//!
//! Clients are spread over a fixed number of shards by hashing their
//! [`ClientKey`]. A shard's write lock is only taken to insert a first-contact
//! client or during an eviction sweep; the steady-state path is a shard read
//! lock followed by the client's own mutex. Two clients never contend on
//! anything but a shard read lock.

use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::filter::FilterBank;

/// Client identity: the datagram's origin address and port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(pub SocketAddr);

impl From<SocketAddr> for ClientKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-client counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Probes handled for this client
    pub packets: u64,
    /// Probes whose sequence did not advance past the previous one
    /// (reordered or duplicated in transit)
    pub sequence_regressions: u64,
    /// Sequence of the most recently arrived probe
    pub last_sequence: Option<u32>,
    /// Times this client's filter bank was rebuilt after corruption
    pub filter_resets: u64,
}

impl ClientStats {
    /// Count one probe in arrival order.
    ///
    /// Sequence comparison uses serial-number arithmetic so wraparound at
    /// `u32::MAX` is not a regression.
    pub fn observe(&mut self, sequence: u32) {
        self.packets += 1;
        if let Some(last) = self.last_sequence {
            #[allow(
                clippy::cast_possible_wrap,
                reason = "Serial-number comparison reinterprets the distance as signed"
            )]
            let distance = sequence.wrapping_sub(last) as i32;
            if distance <= 0 {
                self.sequence_regressions += 1;
            }
        }
        self.last_sequence = Some(sequence);
    }
}

/// Mutable state for one client, guarded by its slot's mutex
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// One filter state per scheme
    pub filters: FilterBank,
    /// Counters
    pub stats: ClientStats,
}

/// A registry entry
#[derive(Debug)]
pub struct ClientSlot {
    key: ClientKey,
    /// Microseconds since the registry epoch
    last_seen: AtomicU64,
    state: Mutex<ClientState>,
}

impl ClientSlot {
    fn new(key: ClientKey, now: u64) -> Self {
        Self {
            key,
            last_seen: AtomicU64::new(now),
            state: Mutex::new(ClientState::default()),
        }
    }

    /// Client this slot belongs to
    #[must_use]
    pub fn key(&self) -> ClientKey {
        self.key
    }

    /// Exclusive access to the client's filters and counters.
    ///
    /// Hold the guard for the whole read-modify-write of one probe.
    pub async fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().await
    }

    fn touch(&self, now: u64) {
        self.last_seen.fetch_max(now, Ordering::Relaxed);
    }

    fn idle_for(&self, now: u64) -> Duration {
        Duration::from_micros(now.saturating_sub(self.last_seen.load(Ordering::Relaxed)))
    }
}

/// Point-in-time view of one client
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    /// Client
    pub key: ClientKey,
    /// Time since the last probe
    pub idle: Duration,
    /// Filter states
    pub filters: FilterBank,
    /// Counters
    pub stats: ClientStats,
}

type Shard = RwLock<HashMap<ClientKey, Arc<ClientSlot>>>;

/// Registry of per-client state
#[derive(Debug)]
pub struct ClientRegistry {
    shards: Box<[Shard]>,
    hasher: RandomState,
    epoch: Instant,
}

impl ClientRegistry {
    /// Create a registry with `shards` shards (at least one)
    #[must_use]
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
            epoch: Instant::now(),
        }
    }

    fn shard(&self, key: &ClientKey) -> &Shard {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Only the low bits select a shard"
        )]
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[index]
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Look up a client, creating a fresh entry on first contact.
    ///
    /// Marks the client as seen either way.
    pub async fn get_or_create(&self, key: ClientKey) -> Arc<ClientSlot> {
        let now = self.now();
        let shard = self.shard(&key);

        if let Some(slot) = shard.read().await.get(&key) {
            slot.touch(now);
            return Arc::clone(slot);
        }

        let mut map = shard.write().await;
        let slot = map.entry(key).or_insert_with(|| {
            debug!(client = %key, "New client");
            Arc::new(ClientSlot::new(key, now))
        });
        slot.touch(now);
        Arc::clone(slot)
    }

    /// Look up a client without creating or touching it
    pub async fn get(&self, key: ClientKey) -> Option<Arc<ClientSlot>> {
        self.shard(&key).read().await.get(&key).cloned()
    }

    /// Mark a client as seen now.
    ///
    /// Returns `false` if the client is not registered.
    pub async fn touch(&self, key: ClientKey) -> bool {
        let now = self.now();
        match self.shard(&key).read().await.get(&key) {
            Some(slot) => {
                slot.touch(now);
                true
            }
            None => false,
        }
    }

    /// Remove every client idle for longer than `older_than`.
    ///
    /// Shards are swept one at a time. A worker that already holds a removed
    /// slot finishes its update on the detached slot; the client's next probe
    /// starts fresh.
    pub async fn evict_idle(&self, older_than: Duration) -> Vec<ClientKey> {
        let now = self.now();
        let mut evicted = Vec::new();

        for shard in &self.shards {
            let any_idle = shard
                .read()
                .await
                .values()
                .any(|slot| slot.idle_for(now) > older_than);
            if !any_idle {
                continue;
            }

            shard.write().await.retain(|key, slot| {
                let keep = slot.idle_for(now) <= older_than;
                if !keep {
                    evicted.push(*key);
                }
                keep
            });
        }

        evicted
    }

    /// Whether a client is registered
    pub async fn contains(&self, key: ClientKey) -> bool {
        self.shard(&key).read().await.contains_key(&key)
    }

    /// Number of registered clients
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.len();
        }
        total
    }

    /// Whether no clients are registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every client, returning how many were dropped
    pub async fn clear(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            let mut map = shard.write().await;
            total += map.len();
            map.clear();
        }
        total
    }

    /// Copy out every client's state, sorted by key
    pub async fn snapshot(&self) -> Vec<ClientSnapshot> {
        let now = self.now();
        let mut slots = Vec::new();
        for shard in &self.shards {
            slots.extend(shard.read().await.values().cloned());
        }

        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            let state = slot.lock().await;
            out.push(ClientSnapshot {
                key: slot.key,
                idle: slot.idle_for(now),
                filters: state.filters,
                stats: state.stats,
            });
        }
        out.sort_by_key(|s| s.key);
        out
    }
}
