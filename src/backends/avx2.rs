#![allow(unsafe_op_in_unsafe_fn)]
//! AVX2 backend: eight lane-parallel Salsa20 blocks per step.
//!
//! Same lane layout as the SSE2 backend, twice as wide. The 8x8 word
//! transpose at store time uses the unpack/permute2x128 sequence so each
//! 256-bit store writes half of one block in scalar word order.

use crate::{BLOCK_SIZE, STATE_WORDS};

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

pub(crate) const PAR_BLOCKS: usize = 8;

macro_rules! mm256_rol_epi32x {
    ($w:expr, $amt:literal) => {{
        let w = $w;
        _mm256_xor_si256(_mm256_slli_epi32(w, $amt), _mm256_srli_epi32(w, 32 - $amt))
    }};
}

macro_rules! quarter_ymmwords {
    ($x:ident, $a:literal, $b:literal, $c:literal, $d:literal) => {
        $x[$b] = _mm256_xor_si256($x[$b], mm256_rol_epi32x!(_mm256_add_epi32($x[$a], $x[$d]), 7));
        $x[$c] = _mm256_xor_si256($x[$c], mm256_rol_epi32x!(_mm256_add_epi32($x[$b], $x[$a]), 9));
        $x[$d] = _mm256_xor_si256($x[$d], mm256_rol_epi32x!(_mm256_add_epi32($x[$c], $x[$b]), 13));
        $x[$a] = _mm256_xor_si256($x[$a], mm256_rol_epi32x!(_mm256_add_epi32($x[$d], $x[$c]), 18));
    };
}

/// Generate eight keystream blocks with counters `c .. c+7` into `out`
/// (block `j` at byte offset `64 * j`). The caller guarantees the counter
/// does not wrap within the batch.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn blocks(input: &[u32; STATE_WORDS], rounds: usize, out: &mut [u8]) {
    debug_assert_eq!(out.len(), PAR_BLOCKS * BLOCK_SIZE);

    let mut x = [_mm256_setzero_si256(); STATE_WORDS];
    for (v, &word) in x.iter_mut().zip(input.iter()) {
        *v = _mm256_set1_epi32(word as i32);
    }

    let counter = (input[8] as u64) | ((input[9] as u64) << 32);
    let mut lo = [0u32; PAR_BLOCKS];
    let mut hi = [0u32; PAR_BLOCKS];
    for (lane, (l, h)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
        let c = counter.wrapping_add(lane as u64);
        *l = c as u32;
        *h = (c >> 32) as u32;
    }
    x[8] = _mm256_loadu_si256(lo.as_ptr().cast());
    x[9] = _mm256_loadu_si256(hi.as_ptr().cast());

    let save = x;
    for _ in 0..rounds / 2 {
        // column round
        quarter_ymmwords!(x, 0, 4, 8, 12);
        quarter_ymmwords!(x, 5, 9, 13, 1);
        quarter_ymmwords!(x, 10, 14, 2, 6);
        quarter_ymmwords!(x, 15, 3, 7, 11);

        // row round
        quarter_ymmwords!(x, 0, 1, 2, 3);
        quarter_ymmwords!(x, 5, 6, 7, 4);
        quarter_ymmwords!(x, 10, 11, 8, 9);
        quarter_ymmwords!(x, 15, 12, 13, 14);
    }
    for (v, s) in x.iter_mut().zip(save.iter()) {
        *v = _mm256_add_epi32(*v, *s);
    }

    let first = transpose8([x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]]);
    let second = transpose8([x[8], x[9], x[10], x[11], x[12], x[13], x[14], x[15]]);

    let out = out.as_mut_ptr();
    for (block, (a, b)) in first.iter().zip(second.iter()).enumerate() {
        _mm256_storeu_si256(out.add(block * BLOCK_SIZE).cast(), *a);
        _mm256_storeu_si256(out.add(block * BLOCK_SIZE + 32).cast(), *b);
    }
}

/// Transpose eight word vectors so result `j` holds lane `j` of every input
/// row, i.e. eight consecutive state words of block `j`.
#[target_feature(enable = "avx2")]
unsafe fn transpose8(r: [__m256i; 8]) -> [__m256i; 8] {
    let a0 = _mm256_unpacklo_epi32(r[0], r[1]);
    let a1 = _mm256_unpackhi_epi32(r[0], r[1]);
    let a2 = _mm256_unpacklo_epi32(r[2], r[3]);
    let a3 = _mm256_unpackhi_epi32(r[2], r[3]);
    let a4 = _mm256_unpacklo_epi32(r[4], r[5]);
    let a5 = _mm256_unpackhi_epi32(r[4], r[5]);
    let a6 = _mm256_unpacklo_epi32(r[6], r[7]);
    let a7 = _mm256_unpackhi_epi32(r[6], r[7]);

    let b0 = _mm256_unpacklo_epi64(a0, a2);
    let b1 = _mm256_unpackhi_epi64(a0, a2);
    let b2 = _mm256_unpacklo_epi64(a1, a3);
    let b3 = _mm256_unpackhi_epi64(a1, a3);
    let b4 = _mm256_unpacklo_epi64(a4, a6);
    let b5 = _mm256_unpackhi_epi64(a4, a6);
    let b6 = _mm256_unpacklo_epi64(a5, a7);
    let b7 = _mm256_unpackhi_epi64(a5, a7);

    [
        _mm256_permute2x128_si256(b0, b4, 0x20),
        _mm256_permute2x128_si256(b1, b5, 0x20),
        _mm256_permute2x128_si256(b2, b6, 0x20),
        _mm256_permute2x128_si256(b3, b7, 0x20),
        _mm256_permute2x128_si256(b0, b4, 0x31),
        _mm256_permute2x128_si256(b1, b5, 0x31),
        _mm256_permute2x128_si256(b2, b6, 0x31),
        _mm256_permute2x128_si256(b3, b7, 0x31),
    ]
}
