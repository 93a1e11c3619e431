use super::keys;
use super::kv::Kv;
use super::registry::Registry;
use crate::codec;
use crate::codec::Migrations;
use crate::codec::Packed;
use crate::engine::Reject;
use crate::room::RoomContext;
use crate::room::RoomId;
use crate::room::RoomMeta;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Room persistence for one game type.
///
/// Owns the (state, meta, lock) key triple of every room of its type. State
/// and meta travel together in single pipelined batches, so a reader that
/// bypasses the lock may observe a pre-commit pair but never a torn one.
/// Decode failures carry `Reject::Corrupt` in their context so the engine
/// can distinguish them from transient store trouble.
pub struct Repository<S> {
    game: &'static str,
    kv: Arc<dyn Kv>,
    registry: Registry,
    migrations: Arc<Migrations<S>>,
}

impl<S> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Self {
            game: self.game,
            kv: self.kv.clone(),
            registry: self.registry.clone(),
            migrations: self.migrations.clone(),
        }
    }
}

impl<S> Repository<S>
where
    S: Packed,
{
    pub fn new(game: &'static str, kv: Arc<dyn Kv>, migrations: Migrations<S>) -> Self {
        Self {
            game,
            registry: Registry::new(kv.clone()),
            kv,
            migrations: Arc::new(migrations),
        }
    }

    pub fn game(&self) -> &'static str {
        self.game
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Fetch and decode the (state, meta) pair in one round-trip.
    /// Absent state means the room does not exist. Meta missing while state
    /// is present is recovered with a default meta rather than failing the
    /// whole room.
    pub async fn load(&self, room: &str) -> anyhow::Result<Option<RoomContext<S>>> {
        let batch = vec![keys::state(self.game, room), keys::meta(self.game, room)];
        let mut values = self.kv.mget(&batch).await?.into_iter();
        let state = values.next().flatten();
        let meta = values.next().flatten();
        let Some(state) = state else {
            return Ok(None);
        };
        let state = codec::decode::<S>(&state, &self.migrations).context(Reject::Corrupt)?;
        let meta = match meta {
            Some(bytes) => serde_json::from_slice(&bytes).context(Reject::Corrupt)?,
            None => {
                log::warn!("room {} has state but no meta, recovering default", room);
                RoomMeta::fallback(self.game)
            }
        };
        Ok(Some(RoomContext {
            room: room.to_string(),
            state,
            meta,
        }))
    }

    /// Write the pair in one batch, then keep the registry current.
    pub async fn save(&self, ctx: &RoomContext<S>) -> anyhow::Result<()> {
        let batch = vec![
            (keys::state(self.game, &ctx.room), codec::encode(&ctx.state)),
            (keys::meta(self.game, &ctx.room), serde_json::to_vec(&ctx.meta)?),
        ];
        self.kv.mset(&batch).await?;
        self.registry.register(&ctx.room, self.game).await
    }

    pub async fn delete(&self, room: &str) -> anyhow::Result<()> {
        let batch = vec![
            keys::state(self.game, room),
            keys::meta(self.game, room),
            keys::lock(self.game, room),
        ];
        self.kv.del(&batch).await?;
        self.registry.unregister(room).await?;
        Ok(()).inspect(|_| log::info!("deleted room {}", room))
    }

    /// Single SET NX EX with the default TTL; the value is this node's
    /// identity so expired locks from dead nodes are attributable.
    pub async fn try_lock(&self, room: &str) -> anyhow::Result<bool> {
        self.try_lock_for(room, crate::LOCK_TTL_SECS).await
    }

    pub async fn try_lock_for(&self, room: &str, ttl_secs: u64) -> anyhow::Result<bool> {
        let key = keys::lock(self.game, room);
        self.kv
            .set_nx_ex(&key, crate::node().as_bytes(), ttl_secs)
            .await
    }

    /// Bounded wait for the room lock. False means the room stayed busy for
    /// the whole patience window and no state was touched.
    pub async fn acquire(&self, room: &str, patience: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + patience;
        loop {
            match self.try_lock(room).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => log::warn!("lock attempt on room {} failed: {}", room, e),
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(crate::LOCK_STEP_MILLIS)).await;
        }
    }

    /// Best-effort release; a lock that already expired is fine.
    pub async fn unlock(&self, room: &str) {
        let batch = vec![keys::lock(self.game, room)];
        if let Err(e) = self.kv.del(&batch).await {
            log::warn!("failed to release lock on room {}: {}", room, e);
        }
    }

    /// Single round-trip multi-get; corrupt rooms are dropped with a log so
    /// one bad record cannot take down a lobby listing.
    pub async fn load_many(&self, rooms: &[RoomId]) -> anyhow::Result<Vec<RoomContext<S>>> {
        if rooms.is_empty() {
            return Ok(Vec::new());
        }
        let batch = rooms
            .iter()
            .flat_map(|room| vec![keys::state(self.game, room), keys::meta(self.game, room)])
            .collect::<Vec<_>>();
        let values = self.kv.mget(&batch).await?;
        Ok(rooms
            .iter()
            .zip(values.chunks(2))
            .filter_map(|(room, pair)| {
                let state = pair.first().cloned().flatten()?;
                let meta = pair.get(1).cloned().flatten();
                let state = codec::decode::<S>(&state, &self.migrations)
                    .inspect_err(|e| log::warn!("dropping corrupt room {}: {}", room, e))
                    .ok()?;
                let meta = match meta {
                    Some(bytes) => serde_json::from_slice(&bytes)
                        .inspect_err(|e| log::warn!("dropping corrupt room {}: {}", room, e))
                        .ok()?,
                    None => RoomMeta::fallback(self.game),
                };
                Some(RoomContext {
                    room: room.clone(),
                    state,
                    meta,
                })
            })
            .collect())
    }
}
