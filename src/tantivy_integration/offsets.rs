//! Stored character offsets of the token positions of an annotated field.
//!
//! Layout: one `(from, to)` pair of little-endian `u32` per position.

use zerocopy::{little_endian as le, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
struct OffsetPair {
    from: le::U32,
    to: le::U32,
}

pub fn encode_offsets(offsets: &[(u32, u32)]) -> Vec<u8> {
    let pairs: Vec<OffsetPair> = offsets
        .iter()
        .map(|(from, to)| OffsetPair {
            from: le::U32::new(*from),
            to: le::U32::new(*to),
        })
        .collect();
    pairs.as_slice().as_bytes().to_vec()
}

/// `None` when the bytes are not a whole number of pairs
pub fn decode_offsets(bytes: &[u8]) -> Option<Vec<(u32, u32)>> {
    let pairs = <[OffsetPair]>::ref_from_bytes(bytes).ok()?;
    Some(pairs.iter().map(|p| (p.from.get(), p.to.get())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_layout() {
        let bytes = encode_offsets(&[(0, 3), (4, 9)]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(decode_offsets(&bytes), Some(vec![(0, 3), (4, 9)]));
        assert_eq!(decode_offsets(&bytes[..5]), None);
        assert_eq!(decode_offsets(&[]), Some(vec![]));
    }
}
