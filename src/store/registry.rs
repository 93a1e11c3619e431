use super::keys;
use super::kv::Kv;
use crate::room::RoomId;
use std::sync::Arc;

/// Global room index.
///
/// Three structures: a hash mapping every live room to its game-type tag, a
/// per-type sorted set scored by creation time so lobbies can page newest
/// first, and an advisory user -> room binding for reconnect lookup. The
/// binding is never trusted for authorization.
#[derive(Clone)]
pub struct Registry {
    kv: Arc<dyn Kv>,
}

impl Registry {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    pub async fn game_of(&self, room: &str) -> anyhow::Result<Option<String>> {
        self.kv.hget(keys::ROOMS_INDEX, room).await
    }

    /// Idempotent: re-registering refreshes the recency score only.
    pub async fn register(&self, room: &str, game: &str) -> anyhow::Result<()> {
        self.register_at(room, game, crate::now_secs()).await
    }

    pub(crate) async fn register_at(&self, room: &str, game: &str, secs: u64) -> anyhow::Result<()> {
        self.kv.hset(keys::ROOMS_INDEX, room, game).await?;
        self.kv.zadd(&keys::by_type(game), room, secs as f64).await?;
        Ok(())
    }

    pub async fn unregister(&self, room: &str) -> anyhow::Result<()> {
        if let Some(game) = self.game_of(room).await? {
            self.kv.zrem(&keys::by_type(&game), room).await?;
            self.kv.hdel(keys::ROOMS_INDEX, room).await?;
        }
        Ok(())
    }

    pub async fn all_rooms(&self) -> anyhow::Result<Vec<RoomId>> {
        self.kv.hkeys(keys::ROOMS_INDEX).await
    }

    /// Every room of one type, newest first.
    pub async fn rooms_of(&self, game: &str) -> anyhow::Result<Vec<RoomId>> {
        self.kv.zrevrange(&keys::by_type(game), 0, -1).await
    }

    /// One page of a type's rooms, newest first. Returns the next cursor
    /// while further pages may exist.
    pub async fn rooms_page(
        &self,
        game: &str,
        cursor: usize,
        page: usize,
    ) -> anyhow::Result<(Vec<RoomId>, Option<usize>)> {
        if page == 0 {
            return Ok((Vec::new(), None));
        }
        let start = cursor as isize;
        let stop = (cursor + page - 1) as isize;
        let rooms = self.kv.zrevrange(&keys::by_type(game), start, stop).await?;
        let next = (rooms.len() == page).then_some(cursor + page);
        Ok((rooms, next))
    }

    pub async fn bind_user(&self, user: &str, room: &str) -> anyhow::Result<()> {
        self.kv.hset(keys::ROOMS_USERS, user, room).await
    }

    pub async fn room_of_user(&self, user: &str) -> anyhow::Result<Option<RoomId>> {
        self.kv.hget(keys::ROOMS_USERS, user).await
    }

    pub async fn unbind_user(&self, user: &str) -> anyhow::Result<()> {
        self.kv.hdel(keys::ROOMS_USERS, user).await
    }
}
