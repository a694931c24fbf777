#![allow(unsafe_op_in_unsafe_fn)]
//! AVX-512 backend: sixteen lane-parallel Salsa20 blocks per step.
//!
//! The lane-parallel state is built by broadcasting each of the sixteen
//! words and substituting per-lane counters `c .. c+15`, never by indexing
//! adjacent memory as if sixteen state copies were laid out there. Rotations
//! use the native `vprold` instruction. The 16x16 word transpose at store
//! time runs in three shuffle stages (32-bit unpack, 64-bit unpack, two
//! rounds of 128-bit lane shuffles).

use crate::{BLOCK_SIZE, STATE_WORDS};

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

pub(crate) const PAR_BLOCKS: usize = 16;

macro_rules! quarter_zmmwords {
    ($x:ident, $a:literal, $b:literal, $c:literal, $d:literal) => {
        $x[$b] = _mm512_xor_si512($x[$b], _mm512_rol_epi32::<7>(_mm512_add_epi32($x[$a], $x[$d])));
        $x[$c] = _mm512_xor_si512($x[$c], _mm512_rol_epi32::<9>(_mm512_add_epi32($x[$b], $x[$a])));
        $x[$d] = _mm512_xor_si512($x[$d], _mm512_rol_epi32::<13>(_mm512_add_epi32($x[$c], $x[$b])));
        $x[$a] = _mm512_xor_si512($x[$a], _mm512_rol_epi32::<18>(_mm512_add_epi32($x[$d], $x[$c])));
    };
}

/// Generate sixteen keystream blocks with counters `c .. c+15` into `out`
/// (block `j` at byte offset `64 * j`). The caller guarantees the counter
/// does not wrap within the batch.
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn blocks(input: &[u32; STATE_WORDS], rounds: usize, out: &mut [u8]) {
    debug_assert_eq!(out.len(), PAR_BLOCKS * BLOCK_SIZE);

    let mut x = [_mm512_setzero_si512(); STATE_WORDS];
    for (v, &word) in x.iter_mut().zip(input.iter()) {
        *v = _mm512_set1_epi32(word as i32);
    }

    let counter = (input[8] as u64) | ((input[9] as u64) << 32);
    let mut lo = [0u32; PAR_BLOCKS];
    let mut hi = [0u32; PAR_BLOCKS];
    for (lane, (l, h)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
        let c = counter.wrapping_add(lane as u64);
        *l = c as u32;
        *h = (c >> 32) as u32;
    }
    x[8] = _mm512_loadu_si512(lo.as_ptr().cast());
    x[9] = _mm512_loadu_si512(hi.as_ptr().cast());

    let save = x;
    for _ in 0..rounds / 2 {
        // column round
        quarter_zmmwords!(x, 0, 4, 8, 12);
        quarter_zmmwords!(x, 5, 9, 13, 1);
        quarter_zmmwords!(x, 10, 14, 2, 6);
        quarter_zmmwords!(x, 15, 3, 7, 11);

        // row round
        quarter_zmmwords!(x, 0, 1, 2, 3);
        quarter_zmmwords!(x, 5, 6, 7, 4);
        quarter_zmmwords!(x, 10, 11, 8, 9);
        quarter_zmmwords!(x, 15, 12, 13, 14);
    }
    for (v, s) in x.iter_mut().zip(save.iter()) {
        *v = _mm512_add_epi32(*v, *s);
    }

    let blocks = transpose16(x);
    let out = out.as_mut_ptr();
    for (block, v) in blocks.iter().enumerate() {
        _mm512_storeu_si512(out.add(block * BLOCK_SIZE).cast(), *v);
    }
}

/// Transpose sixteen word vectors so result `j` holds lane `j` of every
/// input row, i.e. the sixteen state words of block `j` in scalar order.
#[target_feature(enable = "avx512f")]
unsafe fn transpose16(r: [__m512i; 16]) -> [__m512i; 16] {
    // interleave word pairs: t[2i] / t[2i+1] hold the even/odd columns of
    // rows 2i and 2i+1 within each 128-bit lane
    let mut t = [_mm512_setzero_si512(); 16];
    for i in 0..8 {
        t[2 * i] = _mm512_unpacklo_epi32(r[2 * i], r[2 * i + 1]);
        t[2 * i + 1] = _mm512_unpackhi_epi32(r[2 * i], r[2 * i + 1]);
    }

    // u[b + k]'s 128-bit lane L holds column 4L + k of four adjacent rows
    let mut u = [_mm512_setzero_si512(); 16];
    for g in 0..4 {
        let b = 4 * g;
        u[b] = _mm512_unpacklo_epi64(t[b], t[b + 2]);
        u[b + 1] = _mm512_unpackhi_epi64(t[b], t[b + 2]);
        u[b + 2] = _mm512_unpacklo_epi64(t[b + 1], t[b + 3]);
        u[b + 3] = _mm512_unpackhi_epi64(t[b + 1], t[b + 3]);
    }

    // gather 128-bit lanes across vectors; after the second pass every
    // vector is one full column
    let mut v = [_mm512_setzero_si512(); 16];
    for k in 0..4 {
        v[k] = _mm512_shuffle_i32x4::<0x88>(u[k], u[k + 4]);
        v[k + 4] = _mm512_shuffle_i32x4::<0xdd>(u[k], u[k + 4]);
        v[k + 8] = _mm512_shuffle_i32x4::<0x88>(u[k + 8], u[k + 12]);
        v[k + 12] = _mm512_shuffle_i32x4::<0xdd>(u[k + 8], u[k + 12]);
    }

    let mut cols = [_mm512_setzero_si512(); 16];
    for k in 0..4 {
        cols[k] = _mm512_shuffle_i32x4::<0x88>(v[k], v[k + 8]);
        cols[k + 4] = _mm512_shuffle_i32x4::<0x88>(v[k + 4], v[k + 12]);
        cols[k + 8] = _mm512_shuffle_i32x4::<0xdd>(v[k], v[k + 8]);
        cols[k + 12] = _mm512_shuffle_i32x4::<0xdd>(v[k + 4], v[k + 12]);
    }
    cols
}
