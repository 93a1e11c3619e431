use super::board;
use crate::Arbitrary;
use crate::Millis;
use crate::Seat;
use crate::codec::Packed;
use byteorder::LittleEndian;
use byteorder::ReadBytesExt;

/// Complete Ludo room state in 41 bytes.
///
/// Seat membership, finish order and the current seat's legal tokens are
/// bitmasks; the sixteen token positions are absolute board squares per
/// `board::stored`. Winners pack four 8-bit slots into one word, each slot
/// holding seat+1 in finish order (0 = unused).
#[derive(Debug, Clone, PartialEq)]
pub struct LudoState {
    pub current: Seat,
    pub rolled: u8,
    pub sixes: u8,
    pub over: bool,
    pub turn_id: u32,
    pub turn_started_at: Millis,
    pub turn_timeout: u16,
    pub alive: u8,
    pub done: u8,
    pub movable: u8,
    pub winners: u32,
    pub tokens: [u8; 16],
}

impl Packed for LudoState {
    const VERSION: u8 = 1;
    const SIZE: usize = 41;

    fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.push(self.current);
        buf.push(self.rolled);
        buf.push(self.sixes);
        buf.push(self.over as u8);
        buf.extend_from_slice(&self.turn_id.to_le_bytes());
        buf.extend_from_slice(&self.turn_started_at.to_le_bytes());
        buf.extend_from_slice(&self.turn_timeout.to_le_bytes());
        buf.push(self.alive);
        buf.push(self.done);
        buf.push(self.movable);
        buf.extend_from_slice(&self.winners.to_le_bytes());
        buf.extend_from_slice(&self.tokens);
        buf
    }

    fn unpack(bytes: &[u8]) -> anyhow::Result<Self> {
        let ref mut cursor = &bytes[..];
        let current = cursor.read_u8()?;
        let rolled = cursor.read_u8()?;
        let sixes = cursor.read_u8()?;
        let over = cursor.read_u8()? != 0;
        let turn_id = cursor.read_u32::<LittleEndian>()?;
        let turn_started_at = cursor.read_u64::<LittleEndian>()?;
        let turn_timeout = cursor.read_u16::<LittleEndian>()?;
        let alive = cursor.read_u8()?;
        let done = cursor.read_u8()?;
        let movable = cursor.read_u8()?;
        let winners = cursor.read_u32::<LittleEndian>()?;
        let mut tokens = [0u8; 16];
        std::io::Read::read_exact(cursor, &mut tokens)?;
        Ok(Self {
            current,
            rolled,
            sixes,
            over,
            turn_id,
            turn_started_at,
            turn_timeout,
            alive,
            done,
            movable,
            winners,
            tokens,
        })
    }
}

impl LudoState {
    /// Fresh board: everyone in base, seat 0 to act.
    pub fn fresh(alive: u8, turn_timeout: u16, now: Millis) -> Self {
        Self {
            current: 0,
            rolled: 0,
            sixes: 0,
            over: false,
            turn_id: 1,
            turn_started_at: now,
            turn_timeout,
            alive,
            done: 0,
            movable: 0,
            winners: 0,
            tokens: [board::BASE; 16],
        }
    }

    pub fn token(&self, seat: Seat, token: usize) -> u8 {
        self.tokens[seat as usize * board::TOKENS + token]
    }

    pub fn set_token(&mut self, seat: Seat, token: usize, pos: u8) {
        self.tokens[seat as usize * board::TOKENS + token] = pos;
    }

    pub fn is_alive(&self, seat: Seat) -> bool {
        self.alive & (1 << seat) != 0
    }

    pub fn is_done(&self, seat: Seat) -> bool {
        self.done & (1 << seat) != 0
    }

    /// Seats still racing: alive and not finished.
    pub fn racing(&self) -> u8 {
        self.alive & !self.done
    }

    /// All four of a seat's tokens are home.
    pub fn swept(&self, seat: Seat) -> bool {
        (0..board::TOKENS).all(|token| self.token(seat, token) == board::FINISHED)
    }

    /// Append a seat to the packed finish order.
    pub fn rank(&mut self, seat: Seat) {
        for slot in 0..4 {
            if (self.winners >> (slot * 8)) & 0xff == 0 {
                self.winners |= ((seat as u32) + 1) << (slot * 8);
                return;
            }
        }
    }

    /// Finish order so far, as seat indices.
    pub fn ranking(&self) -> Vec<Seat> {
        (0..4)
            .map(|slot| ((self.winners >> (slot * 8)) & 0xff) as u8)
            .take_while(|packed| *packed != 0)
            .map(|packed| packed - 1)
            .collect()
    }

    /// The turn deadline passed with no action taken.
    pub fn expired(&self, now: Millis) -> bool {
        !self.over && now >= self.turn_started_at + self.turn_timeout as Millis * 1_000
    }
}

impl Arbitrary for LudoState {
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let mut tokens = [0u8; 16];
        for pos in tokens.iter_mut() {
            *pos = rng.random_range(0..=board::FINISHED);
        }
        Self {
            current: rng.random_range(0..board::SEATS),
            rolled: rng.random_range(0..=6),
            sixes: rng.random_range(0..3),
            over: rng.random_bool(0.1),
            turn_id: rng.random(),
            turn_started_at: rng.random(),
            turn_timeout: rng.random(),
            alive: rng.random_range(0..16),
            done: rng.random_range(0..16),
            movable: rng.random_range(0..16),
            winners: rng.random(),
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::codec::Migrations;

    #[test]
    fn packs_to_declared_size() {
        let state = LudoState::fresh(0b1111, 30, 0);
        assert!(state.pack().len() == LudoState::SIZE);
    }

    #[test]
    fn roundtrips_byte_exact() {
        for _ in 0..100 {
            let state = LudoState::random();
            let bytes = codec::encode(&state);
            let back = codec::decode::<LudoState>(&bytes, &Migrations::default()).unwrap();
            assert!(back == state);
            assert!(back.pack() == state.pack());
        }
    }

    #[test]
    fn winners_pack_in_finish_order() {
        let mut state = LudoState::fresh(0b1111, 30, 0);
        state.rank(2);
        state.rank(0);
        state.rank(3);
        assert!(state.ranking() == vec![2, 0, 3]);
        assert!(state.winners == 0x00_04_01_03);
    }

    #[test]
    fn expiry_follows_the_turn_clock() {
        let state = LudoState::fresh(0b1111, 30, 1_000);
        assert!(state.expired(1_000) == false);
        assert!(state.expired(30_999) == false);
        assert!(state.expired(31_000) == true);
    }
}
