use super::migrate::Migrations;
use super::packed::Packed;
use byteorder::LittleEndian;
use byteorder::ReadBytesExt;

/// Bytes before the state payload: [version: u8][size: u32 LE].
pub const HEADER: usize = 5;

/// Wrap a packed state in the versioned wire record.
pub fn encode<S>(state: &S) -> Vec<u8>
where
    S: Packed,
{
    let mut buf = Vec::with_capacity(HEADER + S::SIZE);
    buf.push(S::VERSION);
    buf.extend_from_slice(&(S::SIZE as u32).to_le_bytes());
    buf.extend_from_slice(&state.pack());
    buf
}

/// Recover a state from a persisted record.
///
/// A record whose (version, size) matches the current layout is unpacked
/// directly. Anything else consults the migration registry; a missing route
/// is rejected loudly since it means an operator deployed incompatible
/// schema generations side by side.
pub fn decode<S>(bytes: &[u8], migrations: &Migrations<S>) -> anyhow::Result<S>
where
    S: Packed,
{
    if bytes.len() < HEADER {
        anyhow::bail!("record too short: {} bytes", bytes.len());
    }
    let ref mut header = &bytes[..HEADER];
    let version = header.read_u8()?;
    let size = header.read_u32::<LittleEndian>()? as usize;
    let payload = &bytes[HEADER..];
    if payload.len() != size {
        anyhow::bail!("record size header {} disagrees with payload {}", size, payload.len());
    }
    if version == S::VERSION && size == S::SIZE {
        S::unpack(payload)
    } else {
        migrations.migrate(version, payload).ok_or_else(|| {
            log::error!("no migration route from v{} ({} bytes)", version, size);
            anyhow::anyhow!("no migration route from v{} ({} bytes)", version, size)
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        charge: u32,
        spin: u8,
    }

    impl Packed for Probe {
        const VERSION: u8 = 2;
        const SIZE: usize = 5;
        fn pack(&self) -> Vec<u8> {
            let mut buf = Vec::with_capacity(Self::SIZE);
            buf.extend_from_slice(&self.charge.to_le_bytes());
            buf.push(self.spin);
            buf
        }
        fn unpack(bytes: &[u8]) -> anyhow::Result<Self> {
            let ref mut cursor = &bytes[..];
            Ok(Self {
                charge: cursor.read_u32::<LittleEndian>()?,
                spin: cursor.read_u8()?,
            })
        }
    }

    #[test]
    fn roundtrip() {
        let probe = Probe { charge: 42, spin: 3 };
        let bytes = encode(&probe);
        assert!(bytes.len() == HEADER + Probe::SIZE);
        assert!(bytes[0] == Probe::VERSION);
        let back = decode::<Probe>(&bytes, &Migrations::default()).unwrap();
        assert!(back == probe);
    }

    #[test]
    fn rejects_short_record() {
        let bytes = vec![2u8, 5, 0];
        assert!(decode::<Probe>(&bytes, &Migrations::default()).is_err());
    }

    #[test]
    fn rejects_torn_payload() {
        let mut bytes = encode(&Probe { charge: 1, spin: 1 });
        bytes.truncate(bytes.len() - 1);
        assert!(decode::<Probe>(&bytes, &Migrations::default()).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = encode(&Probe { charge: 1, spin: 1 });
        bytes[0] = 1;
        assert!(decode::<Probe>(&bytes, &Migrations::default()).is_err());
    }

    #[test]
    fn migrates_old_version() {
        // v1 stored only the charge
        let mut old = vec![1u8];
        old.extend_from_slice(&4u32.to_le_bytes());
        old.extend_from_slice(&7u32.to_le_bytes());
        let mut migrations = Migrations::default();
        migrations.register(1, 4, |bytes| {
            let ref mut cursor = &bytes[..];
            Ok(Probe {
                charge: cursor.read_u32::<LittleEndian>()?,
                spin: 0,
            })
        });
        let probe = decode::<Probe>(&old, &migrations).unwrap();
        assert!(probe == Probe { charge: 7, spin: 0 });
    }
}
