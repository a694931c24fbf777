#![allow(unsafe_op_in_unsafe_fn)]
//! SSE2 backend: four lane-parallel Salsa20 blocks per step.
//!
//! Lane `j` of every vector holds word `i` of block `counter + j`; the
//! quarter-round schedule runs on scalar word indices while each operation
//! covers all four blocks at once. A 4x4 transpose at store time puts every
//! block back into contiguous little-endian word order, so the serialized
//! output is byte-identical to the portable backend.

use crate::{BLOCK_SIZE, STATE_WORDS};

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

pub(crate) const PAR_BLOCKS: usize = 4;

macro_rules! mm_rol_epi32x {
    ($w:expr, $amt:literal) => {{
        let w = $w;
        _mm_xor_si128(_mm_slli_epi32(w, $amt), _mm_srli_epi32(w, 32 - $amt))
    }};
}

macro_rules! quarter_xmmwords {
    ($x:ident, $a:literal, $b:literal, $c:literal, $d:literal) => {
        $x[$b] = _mm_xor_si128($x[$b], mm_rol_epi32x!(_mm_add_epi32($x[$a], $x[$d]), 7));
        $x[$c] = _mm_xor_si128($x[$c], mm_rol_epi32x!(_mm_add_epi32($x[$b], $x[$a]), 9));
        $x[$d] = _mm_xor_si128($x[$d], mm_rol_epi32x!(_mm_add_epi32($x[$c], $x[$b]), 13));
        $x[$a] = _mm_xor_si128($x[$a], mm_rol_epi32x!(_mm_add_epi32($x[$d], $x[$c]), 18));
    };
}

/// Generate four keystream blocks with counters `c .. c+3` into `out`
/// (block `j` at byte offset `64 * j`). The caller guarantees the counter
/// does not wrap within the batch.
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn blocks(input: &[u32; STATE_WORDS], rounds: usize, out: &mut [u8]) {
    debug_assert_eq!(out.len(), PAR_BLOCKS * BLOCK_SIZE);

    let mut x = [_mm_setzero_si128(); STATE_WORDS];
    for (v, &word) in x.iter_mut().zip(input.iter()) {
        *v = _mm_set1_epi32(word as i32);
    }

    let counter = (input[8] as u64) | ((input[9] as u64) << 32);
    let mut lo = [0u32; PAR_BLOCKS];
    let mut hi = [0u32; PAR_BLOCKS];
    for (lane, (l, h)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
        let c = counter.wrapping_add(lane as u64);
        *l = c as u32;
        *h = (c >> 32) as u32;
    }
    x[8] = _mm_loadu_si128(lo.as_ptr().cast());
    x[9] = _mm_loadu_si128(hi.as_ptr().cast());

    let save = x;
    for _ in 0..rounds / 2 {
        // column round
        quarter_xmmwords!(x, 0, 4, 8, 12);
        quarter_xmmwords!(x, 5, 9, 13, 1);
        quarter_xmmwords!(x, 10, 14, 2, 6);
        quarter_xmmwords!(x, 15, 3, 7, 11);

        // row round
        quarter_xmmwords!(x, 0, 1, 2, 3);
        quarter_xmmwords!(x, 5, 6, 7, 4);
        quarter_xmmwords!(x, 10, 11, 8, 9);
        quarter_xmmwords!(x, 15, 12, 13, 14);
    }
    for (v, s) in x.iter_mut().zip(save.iter()) {
        *v = _mm_add_epi32(*v, *s);
    }

    let out = out.as_mut_ptr();
    for group in 0..4 {
        let t0 = _mm_unpacklo_epi32(x[4 * group], x[4 * group + 1]);
        let t1 = _mm_unpacklo_epi32(x[4 * group + 2], x[4 * group + 3]);
        let t2 = _mm_unpackhi_epi32(x[4 * group], x[4 * group + 1]);
        let t3 = _mm_unpackhi_epi32(x[4 * group + 2], x[4 * group + 3]);

        let lanes = [
            _mm_unpacklo_epi64(t0, t1),
            _mm_unpackhi_epi64(t0, t1),
            _mm_unpacklo_epi64(t2, t3),
            _mm_unpackhi_epi64(t2, t3),
        ];
        for (block, v) in lanes.iter().enumerate() {
            _mm_storeu_si128(out.add(block * BLOCK_SIZE + group * 16).cast(), *v);
        }
    }
}
