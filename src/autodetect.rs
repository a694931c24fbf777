//! Runtime backend selection.
//!
//! The backend choice is made once per process, on the first cipher call,
//! and cached in an atomic slot. Detection walks the candidates from widest
//! to narrowest vector width and takes the first one whose CPU probe
//! succeeds, so every thread racing on first use converges to the same
//! value. Tests can pin a specific backend with [`force_backend`] and go
//! back to detection with [`reset_backend`].

use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(avx512_cpuid, "avx512f", "avx512vl");
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(avx2_cpuid, "avx2");
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(sse2_cpuid, "sse2");

/// Sentinel for "no selection has been made yet".
const UNSET: u8 = u8::MAX;

/// The process-wide backend slot. Written with `Release`, read with
/// `Acquire`; it only ever holds the id of a backend whose probe succeeded.
static SELECTED: AtomicU8 = AtomicU8::new(UNSET);

/// A concrete implementation of the cipher operations, ordered by expected
/// throughput.
///
/// The numeric identifiers are stable ([`Backend::id`]). Whichever backend
/// services a request, the keystream is bit-identical; the choice only
/// affects how many blocks are computed per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Backend {
    /// Portable scalar implementation; always available.
    Soft = 0,
    /// 128-bit SSE2 implementation, four blocks per step.
    Sse2 = 1,
    /// 256-bit AVX2 implementation, eight blocks per step.
    Avx2 = 2,
    /// 512-bit AVX-512 implementation, sixteen blocks per step.
    Avx512 = 3,
}

impl Backend {
    /// The stable numeric identifier of this backend.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Whether this backend is compiled for the current target and supported
    /// by the current CPU.
    #[must_use]
    pub fn available(self) -> bool {
        match self {
            Backend::Soft => true,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse2 => sse2_cpuid::get(),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Avx2 => avx2_cpuid::get(),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Avx512 => avx512_cpuid::get(),
            #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
            _ => false,
        }
    }

    /// Number of blocks this backend computes per wide step (1 means the
    /// backend only has the single-block path).
    pub(crate) fn lanes(self) -> usize {
        match self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse2 => crate::backends::sse2::PAR_BLOCKS,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Avx2 => crate::backends::avx2::PAR_BLOCKS,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Avx512 => crate::backends::avx512::PAR_BLOCKS,
            _ => 1,
        }
    }

    fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Backend::Soft),
            1 => Some(Backend::Sse2),
            2 => Some(Backend::Avx2),
            3 => Some(Backend::Avx512),
            _ => None,
        }
    }
}

fn detect() -> Backend {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if avx512_cpuid::get() {
            return Backend::Avx512;
        }
        if avx2_cpuid::get() {
            return Backend::Avx2;
        }
        if sse2_cpuid::get() {
            return Backend::Sse2;
        }
    }
    Backend::Soft
}

/// The backend currently bound, selecting one first if necessary.
pub(crate) fn active() -> Backend {
    match Backend::from_id(SELECTED.load(Ordering::Acquire)) {
        Some(backend) => backend,
        None => {
            let backend = detect();
            SELECTED.store(backend.id(), Ordering::Release);
            backend
        }
    }
}

/// Report which backend services cipher calls, binding one on first use.
#[must_use]
pub fn active_backend() -> Backend {
    active()
}

/// Pin `backend` for all subsequent cipher calls (a test hook).
///
/// Replaces any previous selection or override. A backend that is not
/// [`available`](Backend::available) on this machine is ignored, since
/// running it would fault on the first vector instruction.
pub fn force_backend(backend: Backend) {
    if backend.available() {
        SELECTED.store(backend.id(), Ordering::Release);
    }
}

/// Clear a forced override; the next cipher call re-runs detection.
pub fn reset_backend() {
    SELECTED.store(UNSET, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this binary that touches the process-wide slot; the
    // whole sequence lives in one function so parallel test threads cannot
    // interleave with it.
    #[test]
    fn selection_forcing_and_reset() {
        let detected = active_backend();
        assert!(detected.available());
        // rebinding is stable
        assert_eq!(active_backend(), detected);

        force_backend(Backend::Soft);
        assert_eq!(active_backend(), Backend::Soft);

        reset_backend();
        assert_eq!(active_backend(), detected);
    }

    #[test]
    fn ids_are_abi_stable() {
        assert_eq!(Backend::Soft.id(), 0);
        assert_eq!(Backend::Sse2.id(), 1);
        assert_eq!(Backend::Avx2.id(), 2);
        assert_eq!(Backend::Avx512.id(), 3);
    }
}
