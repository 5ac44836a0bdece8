// Per-search catalog store
//
// Catalogs are immutable once stored and handed out as `Arc`s, so the
// selection flow can keep using one while a refreshed search replaces it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::model::SearchCatalog;

#[derive(Debug, Default)]
pub struct StoreStats {
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl_seconds: 600,
        }
    }
}

pub fn create_store_key(hotel_id: &str, check_in: NaiveDate, check_out: NaiveDate) -> String {
    format!("{}:{}:{}", hotel_id, check_in, check_out)
}

struct StoredCatalog {
    catalog: Arc<SearchCatalog>,
    created_at: Instant,
    ttl: Duration,
}

impl StoredCatalog {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct CatalogStore {
    entries: DashMap<String, StoredCatalog>,
    config: RwLock<StoreConfig>,
    stats: StoreStats,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl CatalogStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config: RwLock::new(config),
            stats: StoreStats::default(),
        }
    }

    /// Stores the catalog of a finished search, replacing any previous one
    /// for the same hotel and stay. A `None` TTL uses the configured default.
    ///
    /// Capacity is enforced after the insert, so the store never stays above
    /// `max_entries` once concurrent inserts have returned.
    pub fn insert(&self, catalog: SearchCatalog, ttl: Option<Duration>) -> Arc<SearchCatalog> {
        let (max_entries, default_ttl) = {
            let config = self.config.read();
            (
                config.max_entries,
                Duration::from_secs(config.default_ttl_seconds),
            )
        };

        let key = create_store_key(&catalog.hotel_id, catalog.check_in, catalog.check_out);
        let catalog = Arc::new(catalog);
        let entry = StoredCatalog {
            catalog: Arc::clone(&catalog),
            created_at: Instant::now(),
            ttl: ttl.unwrap_or(default_ttl),
        };

        if self.entries.insert(key.clone(), entry).is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
        debug!(key = %key, search_id = %catalog.search_id, "Stored catalog");

        if self.entries.len() > max_entries {
            self.purge_expired();
            while self.entries.len() > max_entries {
                if !self.remove_oldest_entry() {
                    break;
                }
            }
        }
        catalog
    }

    pub fn get(
        &self,
        hotel_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Option<Arc<SearchCatalog>> {
        let key = create_store_key(hotel_id, check_in, check_out);

        let expired = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(Arc::clone(&entry.catalog));
            }
            Some(_) => true,
            None => false,
        };

        // The read guard is gone by now, so another thread may have replaced
        // the entry; only drop it if what is stored is still expired
        if expired && !self.remove_expired(&key) {
            if let Some(entry) = self.entries.get(&key).filter(|entry| !entry.is_expired()) {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(Arc::clone(&entry.catalog));
            }
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    /// Drops every entry matching the given filters; `None` matches anything.
    pub fn invalidate(
        &self,
        hotel_id: Option<&str>,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                let catalog = &entry.value().catalog;
                hotel_id.map_or(true, |h| catalog.hotel_id == h)
                    && check_in.map_or(true, |c| catalog.check_in == c)
                    && check_out.map_or(true, |c| catalog.check_out == c)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let count = keys
            .iter()
            .filter(|key| self.remove_entry(key))
            .count();
        if count > 0 {
            info!(count, "Invalidated catalogs");
        }
        count
    }

    pub fn purge_expired(&self) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        keys.iter().filter(|key| self.remove_expired(key)).count()
    }

    pub fn set_default_ttl(&self, ttl: Duration) {
        self.config.write().default_ttl_seconds = ttl.as_secs();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStatsReport {
        StoreStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
        }
    }

    fn remove_oldest_entry(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| (entry.key().clone(), entry.value().created_at));

        let Some((key, created_at)) = oldest else {
            return false;
        };

        // A replacement stored meanwhile is newer and must survive
        if self
            .entries
            .remove_if(&key, |_, entry| entry.created_at == created_at)
            .is_some()
        {
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    fn remove_expired(&self, key: &str) -> bool {
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired())
            .is_none()
        {
            return false;
        }
        self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
        self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn remove_entry(&self, key: &str) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
        true
    }
}
