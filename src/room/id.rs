use rand::Rng;

/// Short printable room identifier, e.g. "3fa9c1".
pub type RoomId = String;

const CHARSET: &[u8] = b"0123456789abcdef";

/// Generate a fresh 6-hex-char room id. Uniqueness is probabilistic; the
/// room service retries on the rare collision with a live room.
pub fn fresh() -> RoomId {
    let mut rng = rand::rng();
    (0..crate::ROOM_ID_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
