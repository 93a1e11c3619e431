use super::id::RoomId;
use super::meta::RoomMeta;

/// Ephemeral in-process (id, state, meta) triple.
///
/// Produced by a repository load and consumed by the matching save, always
/// inside one lock window. Never cached or shared across requests.
#[derive(Debug, Clone)]
pub struct RoomContext<S> {
    pub room: RoomId,
    pub state: S,
    pub meta: RoomMeta,
}
