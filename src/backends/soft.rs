//! Portable implementation which does not rely on architecture-specific
//! intrinsics.

use super::double_round;
use crate::{BLOCK_SIZE, STATE_WORDS};

/// Generate one keystream block. `input` is left untouched; the caller
/// advances the counter.
#[inline]
pub(crate) fn block(input: &[u32; STATE_WORDS], rounds: usize, output: &mut [u8; BLOCK_SIZE]) {
    let res = run_rounds(input, rounds);

    for (chunk, val) in output.chunks_exact_mut(4).zip(res.iter()) {
        chunk.copy_from_slice(&val.to_le_bytes());
    }
}

#[inline(always)]
fn run_rounds(state: &[u32; STATE_WORDS], rounds: usize) -> [u32; STATE_WORDS] {
    let mut res = *state;

    for _ in 0..rounds / 2 {
        double_round(&mut res);
    }

    for (s1, s0) in res.iter_mut().zip(state.iter()) {
        *s1 = s1.wrapping_add(*s0);
    }
    res
}
