//! Authoritative server core for multiplayer room games.
//!
//! Hosts many concurrent rooms of different game types behind a shared
//! key-value store. Each room owns a fixed-size packed state and a meta
//! record; mutations are serialized by a short-TTL distributed lock so the
//! core scales horizontally across nodes. The HTTP/WebSocket edge, identity,
//! and the wallet ledger are external collaborators reached through the
//! `Broadcaster` and `Outbox` seams.

pub mod codec;
pub mod engine;
pub mod ludo;
pub mod mines;
pub mod room;
pub mod store;

/// dimensional analysis types
pub type Seat = u8;
pub type Coins = u64;
pub type Millis = u64;

// room lock parameters
pub const LOCK_WAIT_MILLIS: u64 = 2_000;
pub const LOCK_STEP_MILLIS: u64 = 50;
pub const LOCK_TTL_SECS: u64 = 5;

// room identity parameters
pub const ROOM_ID_LEN: usize = 6;

// turn clock parameters
pub const TURN_TIMEOUT_SECS: u16 = 30;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// wall clock in unix milliseconds
pub fn now() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_millis() as Millis
}

/// wall clock in unix seconds, used to score room recency
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs()
}

/// identity of this process, written as the lock value so that
/// locks abandoned by dead nodes are attributable and self-heal via TTL
pub fn node() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("local"));
    format!("{}:{}", host, std::process::id())
}

/// per-seat turn deadline, overridable for deployments with slower clients
pub fn turn_timeout() -> u16 {
    std::env::var("TURN_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(TURN_TIMEOUT_SECS)
}

/// initialize dual logging (terminal + file) with timestamped log files
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
