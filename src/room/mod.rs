pub mod context;
pub use context::*;

pub mod id;
pub use id::*;

pub mod meta;
pub use meta::*;

pub mod service;
pub use service::*;
