pub mod keys;
pub use keys::*;

pub mod kv;
pub use kv::*;

pub mod memory;
pub use memory::*;

// self:: disambiguates from the redis crate itself
pub mod redis;
pub use self::redis::*;

pub mod registry;
pub use registry::*;

pub mod repository;
pub use repository::*;
