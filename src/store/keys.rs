use const_format::concatcp;

/// Key namespace shared by every game type.
pub const NAMESPACE: &str = "game";

/// Global hash: room-id -> game-type tag.
pub const ROOMS_INDEX: &str = concatcp!(NAMESPACE, ":rooms:index");
/// Advisory hash: user-id -> room-id.
pub const ROOMS_USERS: &str = concatcp!(NAMESPACE, ":rooms:user");
/// Per-type recency index prefix; completed as `game:rooms:by:<type>`.
pub const ROOMS_BY: &str = concatcp!(NAMESPACE, ":rooms:by:");

/// Braces are Redis hash-tag boundaries: every key of one room hashes to the
/// same cluster slot, which keeps the load/save batches single-node.
pub fn state(game: &str, room: &str) -> String {
    format!("{}:{}:{{{}}}:state", NAMESPACE, game, room)
}

pub fn meta(game: &str, room: &str) -> String {
    format!("{}:{}:{{{}}}:meta", NAMESPACE, game, room)
}

pub fn lock(game: &str, room: &str) -> String {
    format!("{}:{}:{{{}}}:lock", NAMESPACE, game, room)
}

pub fn by_type(game: &str) -> String {
    format!("{}{}", ROOMS_BY, game)
}
