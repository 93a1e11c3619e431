use async_trait::async_trait;

/// Narrow key-value surface the room core needs from its store.
///
/// The production backend is Redis; an in-memory backend stands in for unit
/// tests. Batched operations (mget/mset) are the atomicity unit: a state and
/// its meta are always written in one batch so readers never observe a torn
/// pair, and the lock primitive is a single set-if-absent with TTL.
#[async_trait]
pub trait Kv: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn mget(&self, keys: &[String]) -> anyhow::Result<Vec<Option<Vec<u8>>>>;
    async fn mset(&self, pairs: &[(String, Vec<u8>)]) -> anyhow::Result<()>;
    async fn del(&self, keys: &[String]) -> anyhow::Result<()>;

    /// SET key value NX EX ttl. True iff the key was absent and is now ours.
    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> anyhow::Result<bool>;

    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> anyhow::Result<()>;
    async fn hdel(&self, key: &str, field: &str) -> anyhow::Result<()>;
    async fn hkeys(&self, key: &str) -> anyhow::Result<Vec<String>>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> anyhow::Result<()>;
    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<()>;

    /// Members ordered by descending score, inclusive rank range.
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> anyhow::Result<Vec<String>>;
}
