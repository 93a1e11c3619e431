use crate::Coins;
use crate::Seat;
use crate::engine::Reject;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mutable per-room membership record, persisted next to the state.
///
/// Seat indices stay dense in [0, count): whoever joins takes the lowest
/// free index, and standing up re-packs the survivors. The engines read
/// seats through the masks they maintain themselves, so re-packing is only
/// observable between rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMeta {
    pub seats: BTreeMap<String, Seat>,
    pub max_players: Seat,
    pub public: bool,
    pub game: String,
    pub entry_fee: Coins,
    pub config: BTreeMap<String, String>,
}

impl RoomMeta {
    pub fn open(game: &str, max_players: Seat) -> Self {
        Self {
            seats: BTreeMap::new(),
            max_players,
            public: true,
            game: game.to_string(),
            entry_fee: 0,
            config: BTreeMap::new(),
        }
    }

    /// Defensive recovery for a room whose meta record went missing.
    pub fn fallback(game: &str) -> Self {
        Self::open(game, 1)
    }

    pub fn count(&self) -> Seat {
        self.seats.len() as Seat
    }

    pub fn full(&self) -> bool {
        self.count() >= self.max_players
    }

    pub fn seat_of(&self, user: &str) -> Option<Seat> {
        self.seats.get(user).copied()
    }

    pub fn user_at(&self, seat: Seat) -> Option<&str> {
        self.seats
            .iter()
            .find(|(_, s)| **s == seat)
            .map(|(user, _)| user.as_str())
    }

    /// Take the lowest free seat index.
    pub fn sit(&mut self, user: &str) -> Result<Seat, Reject> {
        if self.seats.contains_key(user) {
            return Err(Reject::IllegalAction(String::from("already seated")));
        }
        if self.full() {
            return Err(Reject::IllegalAction(String::from("room is full")));
        }
        let seat = (0..self.max_players)
            .find(|s| self.user_at(*s).is_none())
            .ok_or_else(|| Reject::IllegalAction(String::from("room is full")))?;
        self.seats.insert(user.to_string(), seat);
        Ok(seat)
    }

    /// Release a seat and re-pack the rest dense.
    pub fn stand(&mut self, user: &str) -> Result<Seat, Reject> {
        let seat = self
            .seats
            .remove(user)
            .ok_or_else(|| Reject::IllegalAction(String::from("not seated")))?;
        for index in self.seats.values_mut() {
            if *index > seat {
                *index -= 1;
            }
        }
        Ok(seat)
    }

    /// Config values arrive as strings from the edge; parse and clamp here.
    pub fn option(&self, key: &str, default: i64, lo: i64, hi: i64) -> i64 {
        self.config
            .get(key)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
            .clamp(lo, hi)
    }
}
