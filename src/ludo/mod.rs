pub mod board;
pub use board::*;

pub mod engine;
pub use engine::*;

pub mod play;
pub use play::*;

pub mod state;
pub use state::*;
