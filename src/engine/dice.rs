use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Single source of randomness for every engine.
///
/// Dice rolls and mine placement both go through this seam so that engines
/// stay deterministic given (state, command) and tests can script chance.
pub trait Dice: Send + Sync {
    /// Uniform die face, 1..=6.
    fn roll(&self) -> u8;

    /// Uniform index in [0, bound).
    fn pick(&self, bound: usize) -> usize;
}

/// Production dice over the thread-local generator.
pub struct Fair;

impl Dice for Fair {
    fn roll(&self) -> u8 {
        rand::rng().random_range(1..=6)
    }
    fn pick(&self, bound: usize) -> usize {
        rand::rng().random_range(0..bound)
    }
}

/// Scripted dice for tests and replays. Rolls and picks are consumed from
/// front to back; an exhausted script falls back to the lowest face.
pub struct Loaded {
    rolls: Mutex<VecDeque<u8>>,
    picks: Mutex<VecDeque<usize>>,
}

impl Loaded {
    pub fn rolls(script: &[u8]) -> Self {
        Self {
            rolls: Mutex::new(script.iter().copied().collect()),
            picks: Mutex::new(VecDeque::new()),
        }
    }

    pub fn picks(script: &[usize]) -> Self {
        Self {
            rolls: Mutex::new(VecDeque::new()),
            picks: Mutex::new(script.iter().copied().collect()),
        }
    }
}

impl Dice for Loaded {
    fn roll(&self) -> u8 {
        self.rolls
            .lock()
            .expect("dice script poisoned")
            .pop_front()
            .unwrap_or(1)
    }
    fn pick(&self, _bound: usize) -> usize {
        self.picks
            .lock()
            .expect("dice script poisoned")
            .pop_front()
            .unwrap_or(0)
    }
}
