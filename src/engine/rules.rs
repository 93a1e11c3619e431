use super::command::Command;
use super::dice::Dice;
use super::error::Reject;
use super::event::Event;
use super::outcome::Finish;
use crate::Millis;
use crate::Seat;
use crate::codec::Packed;
use crate::room::RoomMeta;

/// What a concrete game contributes to the framework.
///
/// Implementations are pure: every method is a function of its arguments,
/// with chance routed through the `Dice` seam and wall time passed in. The
/// framework owns locking, persistence and broadcast; the rules own nothing
/// but the state transition.
pub trait Rules: Send + Sync + Clone + 'static {
    type State: Packed + Clone + PartialEq + std::fmt::Debug + Send + Sync;

    /// Stable game-type tag, used as key namespace and registry entry.
    const GAME: &'static str;

    /// Seats a room of this game can hold.
    const SEATS: Seat;

    /// Initial state for a freshly created room.
    fn open(&self, meta: &RoomMeta, dice: &dyn Dice, now: Millis) -> Self::State;

    /// Decide one command. Rejections leave the room untouched.
    fn evaluate(
        &self,
        room: &str,
        state: &Self::State,
        meta: &RoomMeta,
        command: &Command,
        dice: &dyn Dice,
        now: Millis,
    ) -> Result<Verdict<Self::State>, Reject>;

    /// Action names the user may submit right now. Pure read.
    fn legal(&self, state: &Self::State, meta: &RoomMeta, user: &str, now: Millis) -> Vec<String>;

    /// Client-facing DTO of the state. Must not leak hidden information
    /// (e.g. unexploded mine positions) while a round is live.
    fn view(&self, state: &Self::State) -> serde_json::Value;

    /// The user whose turn it is, for shaping broadcast legal-move lists.
    fn turn_user(&self, state: &Self::State, meta: &RoomMeta) -> Option<String>;

    /// Re-sync per-seat masks after a join or leave re-packed the seats.
    fn reseat(&self, _state: &mut Self::State, _meta: &RoomMeta) {}

    /// Clock-driven transition, called by an external loop. Games without
    /// turn deadlines ignore it.
    fn tick(
        &self,
        _room: &str,
        _state: &Self::State,
        _meta: &RoomMeta,
        _now: Millis,
    ) -> Option<Verdict<Self::State>> {
        None
    }
}

/// A successful decision: the next state plus everything the framework
/// should do about it.
#[derive(Debug, Clone)]
pub struct Verdict<S> {
    pub state: S,
    pub meta: Option<RoomMeta>,
    pub events: Vec<Event>,
    pub broadcast: bool,
    pub over: Option<Finish>,
}

impl<S> Verdict<S> {
    pub fn next(state: S) -> Self {
        Self {
            state,
            meta: None,
            events: Vec::new(),
            broadcast: true,
            over: None,
        }
    }

    pub fn emit(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn reseat(mut self, meta: RoomMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn finish(mut self, finish: Finish) -> Self {
        self.over = Some(finish);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.broadcast = false;
        self
    }
}
