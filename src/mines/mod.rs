pub mod engine;
pub use engine::*;

pub mod payout;
pub use payout::*;

pub mod state;
pub use state::*;
