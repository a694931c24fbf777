use crate::STATE_WORDS;
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        pub(crate) mod avx2;
        pub(crate) mod avx512;
        pub(crate) mod soft;
        pub(crate) mod sse2;
    } else {
        pub(crate) mod soft;
    }
}

/// Widest lane count of any compiled backend; sizes the engine's keystream
/// scratch buffer.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) const MAX_LANES: usize = avx512::PAR_BLOCKS;

/// Generate `backend.lanes()` keystream blocks into `out`, lane-parallel,
/// with block counters `c, c+1, ..` taken from the state. `input` itself is
/// not advanced; the stream engine owns the counter.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) fn generate_par(
    backend: crate::Backend,
    input: &[u32; STATE_WORDS],
    rounds: usize,
    out: &mut [u8],
) {
    use crate::Backend;

    match backend {
        // SAFETY: the selection slot only ever holds a backend whose CPU
        // probe succeeded (both detection and the forced override check
        // availability), so the required target features are present.
        Backend::Sse2 => unsafe { sse2::blocks(input, rounds, out) },
        // SAFETY: as above.
        Backend::Avx2 => unsafe { avx2::blocks(input, rounds, out) },
        // SAFETY: as above.
        Backend::Avx512 => unsafe { avx512::blocks(input, rounds, out) },
        // the scalar backend reports a single-block width, so the engine
        // never requests a wide chunk from it
        Backend::Soft => unreachable!(),
    }
}

#[inline]
#[allow(clippy::many_single_char_names)]
pub(crate) fn quarter_round(
    a: usize,
    b: usize,
    c: usize,
    d: usize,
    state: &mut [u32; STATE_WORDS],
) {
    state[b] ^= state[a].wrapping_add(state[d]).rotate_left(7);
    state[c] ^= state[b].wrapping_add(state[a]).rotate_left(9);
    state[d] ^= state[c].wrapping_add(state[b]).rotate_left(13);
    state[a] ^= state[d].wrapping_add(state[c]).rotate_left(18);
}

/// One column round followed by one row round.
#[inline]
pub(crate) fn double_round(state: &mut [u32; STATE_WORDS]) {
    // column round
    quarter_round(0, 4, 8, 12, state);
    quarter_round(5, 9, 13, 1, state);
    quarter_round(10, 14, 2, 6, state);
    quarter_round(15, 3, 7, 11, state);

    // row round
    quarter_round(0, 1, 2, 3, state);
    quarter_round(5, 6, 7, 4, state);
    quarter_round(10, 11, 8, 9, state);
    quarter_round(15, 12, 13, 14, state);
}
