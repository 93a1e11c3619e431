use super::command::Command;
use super::error::Reject;
use super::outcome::Outcome;
use super::outcome::StateView;
use super::table::Engine;
use crate::room::RoomId;
use crate::room::RoomService;
use crate::store::Registry;
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed lookup over every hosted game.
///
/// Engines and room services are stateless singletons; the parlor is the
/// only in-process table, and it holds capabilities, never rooms. Commands
/// are routed by resolving the room's game tag from the registry first, so
/// a client cannot aim a Ludo command at a mines room.
pub struct Parlor {
    registry: Registry,
    engines: HashMap<&'static str, Arc<dyn Engine>>,
    services: HashMap<&'static str, Arc<dyn RoomService>>,
}

impl Parlor {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            engines: HashMap::new(),
            services: HashMap::new(),
        }
    }

    pub fn host(mut self, engine: Arc<dyn Engine>, service: Arc<dyn RoomService>) -> Self {
        let game = engine.game();
        self.engines.insert(game, engine);
        self.services.insert(game, service);
        log::info!("hosting game type {}", game);
        self
    }

    pub fn engine(&self, game: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(game).cloned()
    }

    pub fn service(&self, game: &str) -> Option<Arc<dyn RoomService>> {
        self.services.get(game).cloned()
    }

    /// Resolve the room's game and dispatch the command to its engine.
    pub async fn route(&self, room: &str, command: Command) -> Outcome {
        let game = match self.registry.game_of(room).await {
            Ok(Some(game)) => game,
            Ok(None) => return Outcome::rejected(Reject::NotFound),
            Err(e) => {
                log::error!("registry lookup failed for room {}: {}", room, e);
                return Outcome::broken("store failure");
            }
        };
        match self.engine(&game) {
            Some(engine) => engine.execute(room, command).await,
            None => {
                log::error!("room {} registered under unhosted game {}", room, game);
                Outcome::rejected(Reject::NotFound)
            }
        }
    }

    /// One lobby page of a game's rooms, newest first.
    pub async fn lobby(
        &self,
        game: &str,
        cursor: usize,
        page: usize,
    ) -> anyhow::Result<(Vec<StateView>, Option<usize>)> {
        let (rooms, next) = self.registry.rooms_page(game, cursor, page).await?;
        let views = match self.engine(game) {
            Some(engine) => engine.states(&rooms).await,
            None => Vec::new(),
        };
        Ok((views, next))
    }

    /// Where a user most recently played, for reconnect lookup. Advisory:
    /// the engine re-checks seating on every command.
    pub async fn whereabouts(&self, user: &str) -> Option<RoomId> {
        self.registry
            .room_of_user(user)
            .await
            .inspect_err(|e| log::warn!("user binding lookup failed: {}", e))
            .ok()
            .flatten()
    }
}
