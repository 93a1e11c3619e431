use super::broadcast::Broadcaster;
use super::broadcast::Silent;
use super::command::Command;
use super::dice::Dice;
use super::dice::Fair;
use super::error::Reject;
use super::outbox::Outbox;
use super::outcome::Outcome;
use super::outcome::StateView;
use super::rules::Rules;
use crate::Millis;
use crate::room::RoomContext;
use crate::room::RoomId;
use crate::store::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Uniform surface every game exposes to the edge, keyed by game-type tag.
/// Reads never lock; `execute` and `tick` are the only mutators.
#[async_trait]
pub trait Engine: Send + Sync {
    fn game(&self) -> &'static str;

    /// Single mutation entry point.
    async fn execute(&self, room: &str, command: Command) -> Outcome;

    /// Pure read of what a user may do right now.
    async fn legal_actions(&self, room: &str, user: &str) -> Vec<String>;

    /// Pure read for client refresh; None when the room does not exist.
    async fn state(&self, room: &str) -> Option<StateView>;

    /// Batched pure read for the lobby.
    async fn states(&self, rooms: &[RoomId]) -> Vec<StateView>;

    /// Clock-driven mutation, called by an external timeout loop.
    async fn tick(&self, room: &str) -> Outcome;
}

/// The framework half of an engine: wraps a game's `Rules` with locking,
/// persistence, broadcast shaping and the outbox.
///
/// Per room, mutations serialize on the distributed lock; the lock spans
/// load and save so concurrent `execute` calls cannot interleave. Once the
/// lock is held the critical section runs on a detached task, so a caller
/// that goes away (disconnect, shutdown) still leaves the room saved and
/// unlocked rather than waiting out the lock TTL.
pub struct Table<G>
where
    G: Rules,
{
    rules: G,
    repo: Repository<G::State>,
    dice: Arc<dyn Dice>,
    caster: Arc<dyn Broadcaster>,
    outbox: Arc<dyn Outbox>,
    patience: Duration,
}

impl<G> Clone for Table<G>
where
    G: Rules,
{
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            repo: self.repo.clone(),
            dice: self.dice.clone(),
            caster: self.caster.clone(),
            outbox: self.outbox.clone(),
            patience: self.patience,
        }
    }
}

impl<G> Table<G>
where
    G: Rules,
{
    pub fn new(rules: G, repo: Repository<G::State>) -> Self {
        Self {
            rules,
            repo,
            dice: Arc::new(Fair),
            caster: Arc::new(Silent),
            outbox: Arc::new(Silent),
            patience: Duration::from_millis(crate::LOCK_WAIT_MILLIS),
        }
    }

    pub fn dice(mut self, dice: Arc<dyn Dice>) -> Self {
        self.dice = dice;
        self
    }

    pub fn caster(mut self, caster: Arc<dyn Broadcaster>) -> Self {
        self.caster = caster;
        self
    }

    pub fn outbox(mut self, outbox: Arc<dyn Outbox>) -> Self {
        self.outbox = outbox;
        self
    }

    pub fn patience(mut self, patience: Duration) -> Self {
        self.patience = patience;
        self
    }

    pub fn repo(&self) -> &Repository<G::State> {
        &self.repo
    }

    pub fn rules(&self) -> &G {
        &self.rules
    }

    pub fn roller(&self) -> &dyn Dice {
        self.dice.as_ref()
    }

    /// Snapshot a loaded context into the client DTO, with the legal moves
    /// of whichever user is to act.
    pub fn snapshot(&self, ctx: &RoomContext<G::State>, now: Millis) -> StateView {
        let legal = self
            .rules
            .turn_user(&ctx.state, &ctx.meta)
            .map(|user| self.rules.legal(&ctx.state, &ctx.meta, &user, now))
            .unwrap_or_default();
        StateView {
            room: ctx.room.clone(),
            game: G::GAME.to_string(),
            meta: ctx.meta.clone(),
            state: self.rules.view(&ctx.state),
            legal,
        }
    }

    /// Decide-and-save under an already-held lock.
    async fn transact(&self, room: &str, command: &Command) -> Outcome {
        let mut ctx = match self.repo.load(room).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return Outcome::rejected(Reject::NotFound),
            Err(e) => return Self::classify(room, e),
        };
        let now = crate::now();
        let verdict = self.rules.evaluate(
            room,
            &ctx.state,
            &ctx.meta,
            command,
            self.dice.as_ref(),
            now,
        );
        match verdict {
            Err(reject) => Outcome::rejected(reject),
            Ok(verdict) => {
                ctx.state = verdict.state;
                if let Some(meta) = verdict.meta {
                    ctx.meta = meta;
                }
                if let Err(e) = self.repo.save(&ctx).await {
                    log::error!("save failed for room {}: {}", room, e);
                    return Outcome::broken("failed to persist state");
                }
                Outcome {
                    success: true,
                    error: None,
                    broadcast: verdict.broadcast,
                    state: Some(self.snapshot(&ctx, now)),
                    events: verdict.events,
                    over: verdict.over,
                }
            }
        }
    }

    /// Clock-driven half of `transact`; no-op for games without deadlines.
    async fn advance(&self, room: &str) -> Outcome {
        let mut ctx = match self.repo.load(room).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return Outcome::rejected(Reject::NotFound),
            Err(e) => return Self::classify(room, e),
        };
        let now = crate::now();
        match self.rules.tick(room, &ctx.state, &ctx.meta, now) {
            None => Outcome::quiet(),
            Some(verdict) => {
                ctx.state = verdict.state;
                if let Err(e) = self.repo.save(&ctx).await {
                    log::error!("save failed for room {}: {}", room, e);
                    return Outcome::broken("failed to persist state");
                }
                Outcome {
                    success: true,
                    error: None,
                    broadcast: verdict.broadcast,
                    state: Some(self.snapshot(&ctx, now)),
                    events: verdict.events,
                    over: verdict.over,
                }
            }
        }
    }

    fn classify(room: &str, e: anyhow::Error) -> Outcome {
        match e.downcast_ref::<Reject>() {
            Some(Reject::Corrupt) => {
                log::error!("room {} is corrupt: {}", room, e);
                Outcome::rejected(Reject::Corrupt)
            }
            _ => {
                log::error!("store failure on room {}: {}", room, e);
                Outcome::broken("store failure")
            }
        }
    }

    /// Lock, run the critical section to completion on a detached task,
    /// then fan out. `run` is the shared body of `execute` and `tick`.
    async fn guarded<F>(&self, room: &str, run: F) -> Outcome
    where
        F: FnOnce(Table<G>, RoomId) -> futures::future::BoxFuture<'static, Outcome> + Send + 'static,
    {
        if !self.repo.acquire(room, self.patience).await {
            log::warn!("room {} stayed busy for {:?}", room, self.patience);
            return Outcome::rejected(Reject::Busy);
        }
        let table = self.clone();
        let room = room.to_string();
        let task = tokio::spawn(async move {
            let outcome = run(table.clone(), room.clone()).await;
            table.repo.unlock(&room).await;
            if outcome.success {
                table.caster.result(&room, &outcome).await;
                for event in &outcome.events {
                    table.outbox.publish(&room, event).await;
                }
            }
            outcome
        });
        task.await.unwrap_or_else(|e| {
            log::error!("engine task died: {}", e);
            Outcome::broken("internal failure")
        })
    }
}

#[async_trait]
impl<G> Engine for Table<G>
where
    G: Rules,
{
    fn game(&self) -> &'static str {
        G::GAME
    }

    async fn execute(&self, room: &str, command: Command) -> Outcome {
        self.guarded(room, move |table, room| {
            Box::pin(async move { table.transact(&room, &command).await })
        })
        .await
    }

    async fn legal_actions(&self, room: &str, user: &str) -> Vec<String> {
        match self.repo.load(room).await {
            Ok(Some(ctx)) => self.rules.legal(&ctx.state, &ctx.meta, user, crate::now()),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("legal-action read failed for room {}: {}", room, e);
                Vec::new()
            }
        }
    }

    async fn state(&self, room: &str) -> Option<StateView> {
        match self.repo.load(room).await {
            Ok(ctx) => ctx.map(|ctx| self.snapshot(&ctx, crate::now())),
            Err(e) => {
                log::warn!("state read failed for room {}: {}", room, e);
                None
            }
        }
    }

    async fn states(&self, rooms: &[RoomId]) -> Vec<StateView> {
        let now = crate::now();
        match self.repo.load_many(rooms).await {
            Ok(contexts) => contexts.iter().map(|ctx| self.snapshot(ctx, now)).collect(),
            Err(e) => {
                log::warn!("bulk state read failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn tick(&self, room: &str) -> Outcome {
        self.guarded(room, move |table, room| {
            Box::pin(async move { table.advance(&room).await })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Seat;
    use crate::codec::Migrations;
    use crate::codec::Packed;
    use crate::engine::Event;
    use crate::engine::Verdict;
    use crate::engine::broadcast::recorder::Recorder;
    use crate::room::RoomMeta;
    use crate::store::Kv;
    use crate::store::Memory;
    use crate::store::keys;
    use byteorder::LittleEndian;
    use byteorder::ReadBytesExt;

    #[derive(Clone)]
    struct Tally;

    #[derive(Debug, Clone, PartialEq)]
    struct TallyState {
        count: u32,
    }

    impl Packed for TallyState {
        const VERSION: u8 = 1;
        const SIZE: usize = 4;
        fn pack(&self) -> Vec<u8> {
            self.count.to_le_bytes().to_vec()
        }
        fn unpack(bytes: &[u8]) -> anyhow::Result<Self> {
            let ref mut cursor = &bytes[..];
            Ok(Self {
                count: cursor.read_u32::<LittleEndian>()?,
            })
        }
    }

    impl Rules for Tally {
        type State = TallyState;
        const GAME: &'static str = "tally";
        const SEATS: Seat = 1;

        fn open(&self, _: &RoomMeta, _: &dyn Dice, _: Millis) -> TallyState {
            TallyState { count: 0 }
        }

        fn evaluate(
            &self,
            _room: &str,
            state: &TallyState,
            meta: &RoomMeta,
            command: &Command,
            _dice: &dyn Dice,
            _now: Millis,
        ) -> Result<Verdict<TallyState>, Reject> {
            if meta.seat_of(&command.user).is_none() {
                return Err(Reject::illegal("not seated"));
            }
            if command.is("add") {
                let state = TallyState {
                    count: state.count + 1,
                };
                Ok(Verdict::next(state)
                    .emit(Event::new("Added", serde_json::json!({})))
                    .emit(Event::new("Counted", serde_json::json!({}))))
            } else {
                Err(Reject::illegal("unknown action"))
            }
        }

        fn legal(&self, _: &TallyState, _: &RoomMeta, _: &str, _: Millis) -> Vec<String> {
            vec![String::from("Add")]
        }

        fn view(&self, state: &TallyState) -> serde_json::Value {
            serde_json::json!({ "count": state.count })
        }

        fn turn_user(&self, _: &TallyState, meta: &RoomMeta) -> Option<String> {
            meta.user_at(0).map(String::from)
        }
    }

    fn table() -> Table<Tally> {
        let kv = Arc::new(Memory::default());
        let repo = Repository::new("tally", kv, Migrations::default());
        Table::new(Tally, repo).patience(Duration::from_millis(80))
    }

    async fn seeded(table: &Table<Tally>, room: &str) {
        let mut meta = RoomMeta::open("tally", 1);
        meta.sit("alice").unwrap();
        let ctx = RoomContext {
            room: room.to_string(),
            state: TallyState { count: 0 },
            meta,
        };
        table.repo().save(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn execute_mutates_and_persists() {
        let table = table();
        seeded(&table, "aaaaaa").await;
        let outcome = table
            .execute("aaaaaa", Command::new("alice", "Add"))
            .await;
        assert!(outcome.success == true);
        assert!(outcome.state.as_ref().unwrap().state["count"] == 1);
        assert!(outcome.events.len() == 2);
        let back = table.repo().load("aaaaaa").await.unwrap().unwrap();
        assert!(back.state == TallyState { count: 1 });
    }

    #[tokio::test]
    async fn execute_rejects_unknown_room() {
        let table = table();
        let outcome = table.execute("zzzzzz", Command::new("alice", "Add")).await;
        assert!(outcome.success == false);
        assert!(outcome.error == Some(Reject::NotFound.to_string()));
    }

    #[tokio::test]
    async fn execute_releases_lock_after_rejection() {
        let table = table();
        seeded(&table, "aaaaaa").await;
        let outcome = table.execute("aaaaaa", Command::new("alice", "Dance")).await;
        assert!(outcome.success == false);
        assert!(table.repo().try_lock("aaaaaa").await.unwrap() == true);
    }

    #[tokio::test]
    async fn contended_room_reports_busy_then_recovers() {
        let table = table();
        seeded(&table, "aaaaaa").await;
        assert!(table.repo().try_lock("aaaaaa").await.unwrap() == true);
        let outcome = table.execute("aaaaaa", Command::new("alice", "Add")).await;
        assert!(outcome.success == false);
        assert!(outcome.error == Some(Reject::Busy.to_string()));
        let untouched = table.repo().load("aaaaaa").await.unwrap().unwrap();
        assert!(untouched.state == TallyState { count: 0 });
        table.repo().unlock("aaaaaa").await;
        let outcome = table.execute("aaaaaa", Command::new("alice", "Add")).await;
        assert!(outcome.success == true);
    }

    #[tokio::test]
    async fn corrupt_state_is_not_retryable() {
        let kv = Arc::new(Memory::default());
        let repo = Repository::new("tally", kv.clone(), Migrations::default());
        let table = Table::new(Tally, repo).patience(Duration::from_millis(80));
        seeded(&table, "aaaaaa").await;
        let key = keys::state("tally", "aaaaaa");
        kv.mset(&[(key, vec![9u8, 9, 9])]).await.unwrap();
        let outcome = table.execute("aaaaaa", Command::new("alice", "Add")).await;
        assert!(outcome.success == false);
        assert!(outcome.error == Some(Reject::Corrupt.to_string()));
    }

    #[tokio::test]
    async fn broadcast_pushes_state_before_events() {
        let recorder = Arc::new(Recorder::default());
        let table = table().caster(recorder.clone());
        seeded(&table, "aaaaaa").await;
        table.execute("aaaaaa", Command::new("alice", "Add")).await;
        let log = recorder.log.lock().unwrap().clone();
        assert!(
            log == vec![
                String::from("state:aaaaaa"),
                String::from("event:aaaaaa:Added"),
                String::from("event:aaaaaa:Counted"),
            ]
        );
    }
}
