use super::kv::Kv;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::Mutex;

/// In-process store with the same semantics as the Redis backend, including
/// NX + TTL expiry. Backs unit tests and single-node development; production
/// always runs against Redis.
#[derive(Default)]
pub struct Memory {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    strings: HashMap<String, Entry>,
    hashes: HashMap<String, BTreeMap<String, String>>,
    sorted: HashMap<String, BTreeMap<String, f64>>,
}

struct Entry {
    value: Vec<u8>,
    expires: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires.map_or(true, |at| Instant::now() < at)
    }
}

#[async_trait]
impl Kv for Memory {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .strings
            .get(key)
            .filter(|entry| entry.live())
            .map(|entry| entry.value.clone()))
    }

    async fn mget(&self, keys: &[String]) -> anyhow::Result<Vec<Option<Vec<u8>>>> {
        let inner = self.inner.lock().await;
        Ok(keys
            .iter()
            .map(|key| {
                inner
                    .strings
                    .get(key)
                    .filter(|entry| entry.live())
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn mset(&self, pairs: &[(String, Vec<u8>)]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        for (key, value) in pairs {
            inner.strings.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    expires: None,
                },
            );
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        for key in keys {
            inner.strings.remove(key);
        }
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.strings.get(key).is_some_and(|entry| entry.live()) {
            return Ok(false);
        }
        inner.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(true)
    }

    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(hash) = inner.hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn hkeys(&self, key: &str) -> anyhow::Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .hashes
            .get(key)
            .map(|hash| hash.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .sorted
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(set) = inner.sorted.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> anyhow::Result<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut members = inner
            .sorted
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m.clone(), *s)).collect::<Vec<_>>())
            .unwrap_or_default();
        members.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(b.0.cmp(&a.0)));
        let len = members.len() as isize;
        let stop = if stop < 0 { len + stop } else { stop };
        let start = start.clamp(0, len);
        let stop = stop.clamp(-1, len - 1);
        Ok(members
            .into_iter()
            .enumerate()
            .filter(|(i, _)| (*i as isize) >= start && (*i as isize) <= stop)
            .map(|(_, (member, _))| member)
            .collect())
    }
}
