use super::id;
use super::meta::RoomMeta;
use crate::engine::Reject;
use crate::engine::Rules;
use crate::engine::StateView;
use crate::engine::Table;
use crate::room::RoomContext;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-game-type room lifecycle: create, join, leave. Seat assignment and
/// the meta invariants live here; the engine only ever sees rooms that
/// satisfy them. Domain rejections are `Reject` values inside the error
/// chain; anything else is store trouble bubbling up.
#[async_trait]
pub trait RoomService: Send + Sync {
    fn game(&self) -> &'static str;

    async fn create(&self, host: &str, options: BTreeMap<String, String>)
    -> anyhow::Result<StateView>;

    async fn join(&self, room: &str, user: &str) -> anyhow::Result<StateView>;

    async fn leave(&self, room: &str, user: &str) -> anyhow::Result<()>;
}

/// Room service over a game's table. Stateless besides its capabilities;
/// every mutation takes the same room lock as the engine so joins cannot
/// race a move.
pub struct Lobby<G>
where
    G: Rules,
{
    table: Table<G>,
}

impl<G> Lobby<G>
where
    G: Rules,
{
    pub fn new(table: Table<G>) -> Self {
        Self { table }
    }

    fn patience() -> Duration {
        Duration::from_millis(crate::LOCK_WAIT_MILLIS)
    }

    /// Meta for a fresh room from the edge's option strings.
    fn charter(&self, options: BTreeMap<String, String>) -> RoomMeta {
        let mut meta = RoomMeta::open(G::GAME, G::SEATS);
        meta.public = options.get("Private").map(|v| v != "true").unwrap_or(true);
        meta.entry_fee = options
            .get("EntryFee")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        meta.config = options;
        meta
    }

    async fn seated(&self, room: &str, user: &str) -> anyhow::Result<StateView> {
        let Some(mut ctx) = self.table.repo().load(room).await? else {
            return Err(Reject::NotFound.into());
        };
        ctx.meta.sit(user)?;
        self.table.rules().reseat(&mut ctx.state, &ctx.meta);
        self.table.repo().save(&ctx).await?;
        self.table.repo().registry().bind_user(user, room).await?;
        log::info!("user {} joined room {} ({})", user, room, G::GAME);
        Ok(self.table.snapshot(&ctx, crate::now()))
    }

    async fn unseated(&self, room: &str, user: &str) -> anyhow::Result<()> {
        let Some(mut ctx) = self.table.repo().load(room).await? else {
            return Err(Reject::NotFound.into());
        };
        ctx.meta.stand(user)?;
        if ctx.meta.seats.is_empty() {
            self.table.repo().delete(room).await?;
        } else {
            self.table.rules().reseat(&mut ctx.state, &ctx.meta);
            self.table.repo().save(&ctx).await?;
        }
        self.table.repo().registry().unbind_user(user).await?;
        log::info!("user {} left room {} ({})", user, room, G::GAME);
        Ok(())
    }
}

#[async_trait]
impl<G> RoomService for Lobby<G>
where
    G: Rules,
{
    fn game(&self) -> &'static str {
        G::GAME
    }

    async fn create(
        &self,
        host: &str,
        options: BTreeMap<String, String>,
    ) -> anyhow::Result<StateView> {
        let mut room = id::fresh();
        while self.table.repo().load(&room).await?.is_some() {
            room = id::fresh();
        }
        let mut meta = self.charter(options);
        meta.sit(host)?;
        let now = crate::now();
        let state = self.table.rules().open(&meta, self.table.roller(), now);
        let ctx = RoomContext {
            room: room.clone(),
            state,
            meta,
        };
        self.table.repo().save(&ctx).await?;
        self.table.repo().registry().bind_user(host, &room).await?;
        log::info!("opened room {} ({}) for {}", room, G::GAME, host);
        Ok(self.table.snapshot(&ctx, now))
    }

    async fn join(&self, room: &str, user: &str) -> anyhow::Result<StateView> {
        if !self.table.repo().acquire(room, Self::patience()).await {
            return Err(Reject::Busy.into());
        }
        let result = self.seated(room, user).await;
        self.table.repo().unlock(room).await;
        result
    }

    async fn leave(&self, room: &str, user: &str) -> anyhow::Result<()> {
        if !self.table.repo().acquire(room, Self::patience()).await {
            return Err(Reject::Busy.into());
        }
        let result = self.unseated(room, user).await;
        self.table.repo().unlock(room).await;
        result
    }
}
