use crate::Arbitrary;
use crate::Seat;
use crate::codec::Packed;
use byteorder::LittleEndian;
use byteorder::ReadBytesExt;

/// Fewest tiles a board may have.
pub const MIN_TILES: u8 = 10;
/// Most tiles two 64-bit masks can carry.
pub const MAX_TILES: u8 = 128;

/// Where a round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    HitMine,
    CashedOut,
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Active => 0,
            Status::HitMine => 1,
            Status::CashedOut => 2,
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = anyhow::Error;
    fn try_from(byte: u8) -> anyhow::Result<Self> {
        match byte {
            0 => Ok(Status::Active),
            1 => Ok(Status::HitMine),
            2 => Ok(Status::CashedOut),
            byte => anyhow::bail!("unknown round status {}", byte),
        }
    }
}

/// LuckyMine room state in 61 bytes.
///
/// Tile sets are bitstrings over two u64 words, one bit per tile, so reveal
/// and membership checks are single mask operations. The `dead` bits exist
/// for the multi-seat eliminate variant and stay zero in single-seat play.
#[derive(Debug, Clone, PartialEq)]
pub struct MineState {
    pub mines: [u64; 2],
    pub revealed: [u64; 2],
    pub current: Seat,
    pub tiles: u8,
    pub mine_count: u8,
    pub status: Status,
    pub dead: u8,
    pub safe_revealed: u32,
    pub entry_cost: u32,
    pub edge: f32,
    pub winnings: u64,
    pub jackpot: u32,
}

impl Packed for MineState {
    const VERSION: u8 = 1;
    const SIZE: usize = 61;

    fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.mines[0].to_le_bytes());
        buf.extend_from_slice(&self.mines[1].to_le_bytes());
        buf.extend_from_slice(&self.revealed[0].to_le_bytes());
        buf.extend_from_slice(&self.revealed[1].to_le_bytes());
        buf.push(self.current);
        buf.push(self.tiles);
        buf.push(self.mine_count);
        buf.push(self.status.into());
        buf.push(self.dead);
        buf.extend_from_slice(&self.safe_revealed.to_le_bytes());
        buf.extend_from_slice(&self.entry_cost.to_le_bytes());
        buf.extend_from_slice(&self.edge.to_le_bytes());
        buf.extend_from_slice(&self.winnings.to_le_bytes());
        buf.extend_from_slice(&self.jackpot.to_le_bytes());
        buf
    }

    fn unpack(bytes: &[u8]) -> anyhow::Result<Self> {
        let ref mut cursor = &bytes[..];
        let mines = [
            cursor.read_u64::<LittleEndian>()?,
            cursor.read_u64::<LittleEndian>()?,
        ];
        let revealed = [
            cursor.read_u64::<LittleEndian>()?,
            cursor.read_u64::<LittleEndian>()?,
        ];
        let current = cursor.read_u8()?;
        let tiles = cursor.read_u8()?;
        let mine_count = cursor.read_u8()?;
        let status = Status::try_from(cursor.read_u8()?)?;
        let dead = cursor.read_u8()?;
        let safe_revealed = cursor.read_u32::<LittleEndian>()?;
        let entry_cost = cursor.read_u32::<LittleEndian>()?;
        let edge = cursor.read_f32::<LittleEndian>()?;
        let winnings = cursor.read_u64::<LittleEndian>()?;
        let jackpot = cursor.read_u32::<LittleEndian>()?;
        Ok(Self {
            mines,
            revealed,
            current,
            tiles,
            mine_count,
            status,
            dead,
            safe_revealed,
            entry_cost,
            edge,
            winnings,
            jackpot,
        })
    }
}

impl MineState {
    fn word(tile: u8) -> (usize, u64) {
        (tile as usize / 64, 1u64 << (tile % 64))
    }

    pub fn mined(&self, tile: u8) -> bool {
        let (word, bit) = Self::word(tile);
        self.mines[word] & bit != 0
    }

    pub fn lay_mine(&mut self, tile: u8) {
        let (word, bit) = Self::word(tile);
        self.mines[word] |= bit;
    }

    pub fn seen(&self, tile: u8) -> bool {
        let (word, bit) = Self::word(tile);
        self.revealed[word] & bit != 0
    }

    pub fn reveal(&mut self, tile: u8) {
        let (word, bit) = Self::word(tile);
        self.revealed[word] |= bit;
    }

    pub fn mines_laid(&self) -> u32 {
        self.mines[0].count_ones() + self.mines[1].count_ones()
    }

    pub fn seen_count(&self) -> u32 {
        self.revealed[0].count_ones() + self.revealed[1].count_ones()
    }

    pub fn safe_total(&self) -> u8 {
        self.tiles - self.mine_count
    }

    /// Tiles revealed so far, in index order.
    pub fn seen_tiles(&self) -> Vec<u8> {
        (0..self.tiles).filter(|tile| self.seen(*tile)).collect()
    }

    /// Mine positions, only for disclosure after the round ends.
    pub fn mine_tiles(&self) -> Vec<u8> {
        (0..self.tiles).filter(|tile| self.mined(*tile)).collect()
    }
}

impl Arbitrary for MineState {
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        Self {
            mines: [rng.random(), rng.random()],
            revealed: [rng.random(), rng.random()],
            current: 0,
            tiles: rng.random_range(MIN_TILES..=MAX_TILES),
            mine_count: rng.random_range(1..10),
            status: Status::try_from(rng.random_range(0..3u8)).expect("status in range"),
            dead: rng.random(),
            safe_revealed: rng.random_range(0..100),
            entry_cost: rng.random(),
            edge: 0.97,
            winnings: rng.random(),
            jackpot: rng.random(),
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
        let state = MineState::random();
        assert!(state.pack().len() == MineState::SIZE);
    }

    #[test]
    fn roundtrips_byte_exact() {
        for _ in 0..100 {
            let state = MineState::random();
            let bytes = codec::encode(&state);
            let back = codec::decode::<MineState>(&bytes, &Migrations::default()).unwrap();
            assert!(back == state);
        }
    }

    #[test]
    fn masks_cover_both_words() {
        let mut state = MineState::random();
        state.mines = [0, 0];
        state.revealed = [0, 0];
        state.tiles = 128;
        state.lay_mine(3);
        state.lay_mine(64);
        state.lay_mine(127);
        assert!(state.mined(3) && state.mined(64) && state.mined(127));
        assert!(state.mined(4) == false);
        assert!(state.mines_laid() == 3);
        state.reveal(100);
        assert!(state.seen(100) == true);
        assert!(state.seen_count() == 1);
        assert!(state.seen_tiles() == vec![100]);
    }

    #[test]
    fn rejects_unknown_status_byte() {
        let state = MineState::random();
        let mut bytes = state.pack();
        bytes[35] = 9; // status byte
        assert!(MineState::unpack(&bytes).is_err());
    }
}
