//! HSalsa20 subkey derivation for the extended 192-bit nonce.

use crate::backends::double_round;
use crate::{CONSTANTS, STATE_WORDS, le_word};
use zeroize::Zeroize;

/// The HSalsa20 function defined in the paper "Extending the Salsa20 nonce"
///
/// <https://cr.yp.to/snuffle/xsalsa-20110204.pdf>
///
/// HSalsa20 takes 512 bits of input:
///
/// - Constants (`u32` x 4)
/// - Key (`u32` x 8)
/// - First 16 nonce bytes (`u32` x 4)
///
/// and runs the Salsa20 double-round schedule *without* the final
/// add-and-serialize step. The 256-bit output, suitable for use as a Salsa20
/// key, is the little-endian serialization of state words
/// (0, 5, 10, 15, 6, 7, 8, 9). The working state is wiped before returning;
/// the caller owns (and wipes) the subkey.
pub(crate) fn hsalsa(key: &[u8; 32], nonce: &[u8; 16], rounds: usize) -> [u8; 32] {
    let mut state = [0u32; STATE_WORDS];
    state[0] = CONSTANTS[0];
    for (v, chunk) in state[1..5].iter_mut().zip(key[..16].chunks_exact(4)) {
        *v = le_word(chunk);
    }
    state[5] = CONSTANTS[1];
    for (v, chunk) in state[6..10].iter_mut().zip(nonce.chunks_exact(4)) {
        *v = le_word(chunk);
    }
    state[10] = CONSTANTS[2];
    for (v, chunk) in state[11..15].iter_mut().zip(key[16..].chunks_exact(4)) {
        *v = le_word(chunk);
    }
    state[15] = CONSTANTS[3];

    for _ in 0..rounds / 2 {
        double_round(&mut state);
    }

    const KEY_IDX: [usize; 8] = [0, 5, 10, 15, 6, 7, 8, 9];

    let mut subkey = [0u8; 32];
    for (chunk, &idx) in subkey.chunks_exact_mut(4).zip(KEY_IDX.iter()) {
        chunk.copy_from_slice(&state[idx].to_le_bytes());
    }

    state.zeroize();
    subkey
}
