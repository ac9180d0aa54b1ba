use crate::flight::{DISPLAY_DATETIME_FMT, FlightRecord};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// The last normalized feed plus the moment it was fetched. The single
/// value the freshness cache ever holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedFeed {
    #[serde(with = "fetched_at_format")]
    pub fetched_at: NaiveDateTime,
    pub flights: Vec<FlightRecord>,
}

mod fetched_at_format {
    use super::DISPLAY_DATETIME_FMT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(DISPLAY_DATETIME_FMT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DISPLAY_DATETIME_FMT).map_err(serde::de::Error::custom)
    }
}

/// Freshness cache the query façade depends on. Singleton key, value =
/// last feed + timestamp, TTL policy applied on read. Concurrent
/// readers racing a writer may see a slightly stale feed or refetch
/// redundantly; they never see a torn one.
pub trait ResponseCache {
    /// Returns the cached feed while it is inside the freshness window.
    fn load(&self, now: NaiveDateTime) -> Option<CachedFeed>;

    /// Best effort: a failed store only costs a refetch next time.
    fn store(&self, feed: &CachedFeed);
}

/// On-disk cache, one JSON document written whole per store. An absent,
/// unreadable or stale file is a miss.
pub struct FileCache {
    path: PathBuf,
    ttl: TimeDelta,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>, ttl: TimeDelta) -> FileCache {
        FileCache {
            path: path.into(),
            ttl,
        }
    }
}

impl ResponseCache for FileCache {
    fn load(&self, now: NaiveDateTime) -> Option<CachedFeed> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        let cached: CachedFeed = match serde_json::from_str(&data) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "discarding unreadable cache file");
                return None;
            }
        };
        (now - cached.fetched_at <= self.ttl).then_some(cached)
    }

    fn store(&self, feed: &CachedFeed) {
        let data = match serde_json::to_string(feed) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize cached feed");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, data) {
            tracing::warn!(path = %self.path.display(), %err, "failed to write cache file");
        }
    }
}

/// In-process variant with the same TTL policy; drop-in for tests or for
/// running without a writable working directory.
pub struct MemoryCache {
    slot: Mutex<Option<CachedFeed>>,
    ttl: TimeDelta,
}

impl MemoryCache {
    pub fn new(ttl: TimeDelta) -> MemoryCache {
        MemoryCache {
            slot: Mutex::new(None),
            ttl,
        }
    }
}

impl ResponseCache for MemoryCache {
    fn load(&self, now: NaiveDateTime) -> Option<CachedFeed> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_ref()
            .filter(|cached| now - cached.fetched_at <= self.ttl)
            .cloned()
    }

    fn store(&self, feed: &CachedFeed) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(feed.clone());
    }
}
