/// Fixed-size bytewise state representation.
///
/// Game states are small value records with bitmasks, never pointer graphs,
/// so a handwritten little-endian layout is far cheaper than JSON on the hot
/// mutation path. VERSION and SIZE together form a self-describing schema
/// token: a persisted record whose header disagrees with the current pair is
/// routed through the migration registry instead of being byte-copied.
pub trait Packed: Sized {
    const VERSION: u8;
    const SIZE: usize;

    /// Serialize into exactly SIZE bytes.
    fn pack(&self) -> Vec<u8>;

    /// Deserialize from exactly SIZE bytes.
    fn unpack(bytes: &[u8]) -> anyhow::Result<Self>;
}
