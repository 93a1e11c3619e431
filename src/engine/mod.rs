pub mod broadcast;
pub use broadcast::*;

pub mod command;
pub use command::*;

pub mod dice;
pub use dice::*;

pub mod error;
pub use error::*;

pub mod event;
pub use event::*;

pub mod outbox;
pub use outbox::*;

pub mod outcome;
pub use outcome::*;

pub mod parlor;
pub use parlor::*;

pub mod rules;
pub use rules::*;

pub mod table;
pub use table::*;
