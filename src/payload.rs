//! Synthetic payload blocks for transfer sessions.

use rand::Rng;

/// An opaque block of `len` random bytes, ready to send as one segment.
pub fn random_block(len: usize) -> Vec<u8> {
    let mut block = vec![0u8; len];
    rand::rng().fill(&mut block[..]);
    block
}
