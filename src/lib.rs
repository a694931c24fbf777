//! Implementation of the XSalsa20 stream cipher with runtime-dispatched
//! SIMD acceleration.
//!
//! XSalsa20 extends Salsa20 to a 192-bit (24-byte) nonce by first deriving a
//! fresh 256-bit subkey with the HSalsa20 function, as described in the paper
//! "Extending the Salsa20 nonce":
//!
//! <https://cr.yp.to/snuffle/xsalsa-20081128.pdf>
//!
//! On x86 and x86-64 targets the crate probes the CPU once at first use and
//! binds the widest supported backend (AVX-512, AVX2, SSE2, falling back to
//! the portable implementation). Every backend produces a bit-identical
//! keystream for the same key, nonce and round count, so the selection is
//! purely a throughput concern.
//!
//! # ⚠️ Security Warning: Hazmat!
//!
//! This crate does not ensure ciphertexts are authentic! Thus ciphertext
//! integrity is not verified, which can lead to serious vulnerabilities!
//!
//! USE AT YOUR OWN RISK!
//!
//! # Example
//! ```
//! use xsalsa20::XSalsa20;
//!
//! let key = [0x42; 32];
//! let nonce = [0x24; 24];
//!
//! // 0 rounds selects the Salsa20/20 default
//! let mut cipher = XSalsa20::new(&key, &nonce, 0)?;
//!
//! let mut buffer = *b"A dozen plaintext bytes";
//! cipher.apply_keystream(&mut buffer)?;
//!
//! // decryption is the same operation with a freshly keyed state
//! let mut cipher = XSalsa20::new(&key, &nonce, 0)?;
//! cipher.apply_keystream(&mut buffer)?;
//! assert_eq!(&buffer, b"A dozen plaintext bytes");
//! # Ok::<(), xsalsa20::Error>(())
//! ```

#![no_std]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg"
)]

mod autodetect;
mod backends;
mod xsalsa;

pub use autodetect::{Backend, active_backend, force_backend, reset_backend};
pub use zeroize;

use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of bytes in an XSalsa20 key.
pub const KEY_SIZE: usize = 32;

/// Number of bytes in an XSalsa20 nonce.
pub const NONCE_SIZE: usize = 24;

/// Number of bytes in one Salsa20 keystream block.
pub const BLOCK_SIZE: usize = 64;

/// Number of 32-bit words in the Salsa20 state
const STATE_WORDS: usize = 16;

/// State initialization constant ("expand 32-byte k")
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Round count substituted when a caller passes `rounds == 0`.
const DEFAULT_ROUNDS: usize = 20;

/// Errors produced by the cipher operations.
///
/// The discriminants are stable and match the numeric codes of the C ABI
/// this crate interoperates with; [`Error::code`] exposes them. Success is
/// `Ok(())`, i.e. code `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Error {
    /// The built-in self-test observed a mismatch.
    SelfTestFailed = -1,
    /// A buffer length mismatch, or a cipher call on a state that has not
    /// been keyed (or has been zeroized).
    InvalidArg = -2,
    /// The key is not exactly 32 bytes.
    InvalidKeySize = -3,
    /// The nonce is not exactly 24 bytes.
    InvalidNonceSize = -4,
    /// The round count is odd.
    InvalidRounds = -5,
    /// The 64-bit block counter wrapped. The state has produced its full
    /// keystream and is permanently unusable.
    Overflow = -6,
}

impl Error {
    /// The stable numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::SelfTestFailed => "self-test failed",
            Error::InvalidArg => "invalid argument",
            Error::InvalidKeySize => "invalid key size",
            Error::InvalidNonceSize => "invalid nonce size",
            Error::InvalidRounds => "invalid round count",
            Error::Overflow => "block counter overflow",
        })
    }
}

impl core::error::Error for Error {}

/// The XSalsa20 keystream state.
///
/// Created by [`XSalsa20::new`], driven by [`crypt`](XSalsa20::crypt),
/// [`apply_keystream`](XSalsa20::apply_keystream) and
/// [`keystream`](XSalsa20::keystream). The state buffers keystream bytes
/// internally, so a message may be processed in chunks of any size and the
/// resulting ciphertext is identical to a single-call encryption.
///
/// All state material (subkey, counter, buffered keystream) is zeroized on
/// drop.
pub struct XSalsa20 {
    /// The Salsa20 input matrix: sigma at 0/5/10/15, the HSalsa20 subkey at
    /// 1..5 and 11..15, the last 8 nonce bytes at 6..8 and the 64-bit block
    /// counter at 8..10.
    input: [u32; STATE_WORDS],
    /// Keystream bytes generated but not yet handed to the caller; the live
    /// bytes occupy positions `64 - ksleft ..`.
    kstream: [u8; BLOCK_SIZE],
    /// Number of live bytes in `kstream`.
    ksleft: usize,
    /// Set to 24 by a successful setup; cipher calls refuse anything else.
    ivlen: usize,
    /// Even round count.
    rounds: usize,
    /// Latched when the block counter wraps; the wrapped counter value is
    /// indistinguishable from a fresh one, so permanence needs a flag.
    overflowed: bool,
}

impl XSalsa20 {
    /// Key a new state from `key` (32 bytes), `nonce` (24 bytes) and an even
    /// round count (`0` selects the default of 20).
    ///
    /// The HSalsa20 subkey derivation runs here; its scratch state is wiped
    /// before the function returns. The fresh state has a zero block counter
    /// and no buffered keystream.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKeySize`], [`Error::InvalidNonceSize`] or
    /// [`Error::InvalidRounds`] when the corresponding argument is out of
    /// spec. Nothing is retained from a failed call.
    pub fn new(key: &[u8], nonce: &[u8], rounds: usize) -> Result<Self, Error> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize);
        }
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceSize);
        }
        let rounds = if rounds == 0 { DEFAULT_ROUNDS } else { rounds };
        if rounds % 2 != 0 {
            return Err(Error::InvalidRounds);
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(key);
        let mut nonce_prefix = [0u8; 16];
        nonce_prefix.copy_from_slice(&nonce[..16]);

        let mut subkey = xsalsa::hsalsa(&key_bytes, &nonce_prefix, rounds);

        let mut input = [0u32; STATE_WORDS];
        input[0] = CONSTANTS[0];
        for (v, chunk) in input[1..5].iter_mut().zip(subkey[..16].chunks_exact(4)) {
            *v = le_word(chunk);
        }
        input[5] = CONSTANTS[1];
        for (v, chunk) in input[6..8].iter_mut().zip(nonce[16..].chunks_exact(4)) {
            *v = le_word(chunk);
        }
        input[8] = 0;
        input[9] = 0;
        input[10] = CONSTANTS[2];
        for (v, chunk) in input[11..15].iter_mut().zip(subkey[16..].chunks_exact(4)) {
            *v = le_word(chunk);
        }
        input[15] = CONSTANTS[3];

        subkey.zeroize();
        key_bytes.zeroize();

        Ok(Self {
            input,
            kstream: [0u8; BLOCK_SIZE],
            ksleft: 0,
            ivlen: NONCE_SIZE,
            rounds,
            overflowed: false,
        })
    }

    /// Encrypt (or decrypt) `input` into `output`.
    ///
    /// The two buffers must have the same length. Decryption is the same
    /// operation as encryption. An empty input succeeds without touching the
    /// state.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArg`] on a length mismatch or an unkeyed state;
    /// [`Error::Overflow`] when the 64-bit block counter wraps mid-call, in
    /// which case every byte written before the wrap is valid ciphertext but
    /// the state cannot produce more keystream.
    pub fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        if output.len() != input.len() {
            return Err(Error::InvalidArg);
        }
        if input.is_empty() {
            return Ok(());
        }
        self.check_ready()?;
        output.copy_from_slice(input);
        self.process(output)
    }

    /// Encrypt (or decrypt) `data` in place.
    ///
    /// This is [`crypt`](Self::crypt) for the case where input and output
    /// coincide.
    ///
    /// # Errors
    ///
    /// As for [`crypt`](Self::crypt), minus the length mismatch.
    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<(), Error> {
        self.process(data)
    }

    /// Fill `out` with raw keystream bytes.
    ///
    /// Equivalent to encrypting a zero-filled buffer of the same length and
    /// advances the state identically.
    ///
    /// # Errors
    ///
    /// As for [`apply_keystream`](Self::apply_keystream).
    pub fn keystream(&mut self, out: &mut [u8]) -> Result<(), Error> {
        if out.is_empty() {
            return Ok(());
        }
        self.check_ready()?;
        out.fill(0);
        self.process(out)
    }

    fn check_ready(&self) -> Result<(), Error> {
        if self.ivlen != NONCE_SIZE {
            return Err(Error::InvalidArg);
        }
        if self.overflowed {
            return Err(Error::Overflow);
        }
        Ok(())
    }

    /// XOR keystream into `data`, draining buffered bytes first, then taking
    /// the active backend's wide path while whole chunks remain, then single
    /// blocks.
    fn process(&mut self, data: &mut [u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        self.check_ready()?;

        let backend = autodetect::active();

        let mut pos = 0;
        if self.ksleft > 0 {
            let n = self.ksleft.min(data.len());
            let start = BLOCK_SIZE - self.ksleft;
            for (b, k) in data[..n].iter_mut().zip(self.kstream[start..start + n].iter()) {
                *b ^= *k;
            }
            self.ksleft -= n;
            if n == data.len() {
                return Ok(());
            }
            pos = n;
        }

        pos = self.xor_wide_chunks(backend, data, pos);
        if pos == data.len() {
            return Ok(());
        }

        let mut buf = [0u8; BLOCK_SIZE];
        loop {
            backends::soft::block(&self.input, self.rounds, &mut buf);
            let next = self.block_pos().wrapping_add(1);
            self.set_block_pos(next);
            if next == 0 {
                self.overflowed = true;
                return Err(Error::Overflow);
            }
            let remaining = data.len() - pos;
            if remaining <= BLOCK_SIZE {
                for (b, k) in data[pos..].iter_mut().zip(buf.iter()) {
                    *b ^= *k;
                }
                self.ksleft = BLOCK_SIZE - remaining;
                self.kstream[remaining..].copy_from_slice(&buf[remaining..]);
                return Ok(());
            }
            for (b, k) in data[pos..pos + BLOCK_SIZE].iter_mut().zip(buf.iter()) {
                *b ^= *k;
            }
            pos += BLOCK_SIZE;
        }
    }

    /// Consume as many whole `lanes * 64`-byte chunks as the backend and the
    /// counter headroom allow; returns the new position. Chunks that would
    /// wrap the counter are left to the single-block path so every backend
    /// fails at exactly the same output byte.
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    fn xor_wide_chunks(&mut self, backend: Backend, data: &mut [u8], mut pos: usize) -> usize {
        let lanes = backend.lanes();
        if lanes <= 1 {
            return pos;
        }
        let chunk = lanes * BLOCK_SIZE;
        let mut buf = [0u8; backends::MAX_LANES * BLOCK_SIZE];
        while data.len() - pos >= chunk && self.block_pos().checked_add(lanes as u64).is_some() {
            let kbuf = &mut buf[..chunk];
            backends::generate_par(backend, &self.input, self.rounds, kbuf);
            for (b, k) in data[pos..pos + chunk].iter_mut().zip(kbuf.iter()) {
                *b ^= *k;
            }
            let next = self.block_pos() + lanes as u64;
            self.set_block_pos(next);
            pos += chunk;
        }
        pos
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    fn xor_wide_chunks(&mut self, _backend: Backend, _data: &mut [u8], pos: usize) -> usize {
        pos
    }

    #[inline(always)]
    fn block_pos(&self) -> u64 {
        (self.input[8] as u64) + ((self.input[9] as u64) << 32)
    }

    #[inline(always)]
    fn set_block_pos(&mut self, pos: u64) {
        self.input[8] = (pos & 0xffff_ffff) as u32;
        self.input[9] = ((pos >> 32) & 0xffff_ffff) as u32;
    }
}

impl fmt::Debug for XSalsa20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XSalsa20 {{ rounds: {}, .. }}", self.rounds)
    }
}

impl Zeroize for XSalsa20 {
    fn zeroize(&mut self) {
        self.input.zeroize();
        self.kstream.zeroize();
        self.ksleft.zeroize();
        self.ivlen.zeroize();
        self.rounds.zeroize();
        self.overflowed.zeroize();
    }
}

impl Drop for XSalsa20 {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for XSalsa20 {}

/// One-shot encryption (or decryption) of `input` into `output`.
///
/// Keys a state, runs a single [`XSalsa20::crypt`] call and destroys the
/// state. The state lives on the stack and is zeroized on every exit path,
/// including errors.
///
/// # Errors
///
/// Any error of [`XSalsa20::new`] or [`XSalsa20::crypt`]; the first failure
/// wins.
pub fn crypt_once(
    key: &[u8],
    nonce: &[u8],
    rounds: usize,
    input: &[u8],
    output: &mut [u8],
) -> Result<(), Error> {
    let mut state = XSalsa20::new(key, nonce, rounds)?;
    state.crypt(input, output)
}

/// Run the built-in self-test.
///
/// Validates a streaming and a one-shot round-trip against the classic
/// "Kilroy was here!" vector, then checks that every backend available on
/// this CPU produces the same ciphertext as the portable one over a buffer
/// long enough to exercise each wide path. Any forced backend override is
/// cleared when the test returns.
///
/// # Errors
///
/// [`Error::SelfTestFailed`] on any mismatch, or the first error returned by
/// the exercised operations.
pub fn self_test() -> Result<(), Error> {
    let result = run_self_test();
    reset_backend();
    result
}

fn run_self_test() -> Result<(), Error> {
    const KEY: [u8; KEY_SIZE] = [
        0x1b, 0x27, 0x55, 0x64, 0x73, 0xe9, 0x85, 0xd4, 0x62, 0xcd, 0x51, 0x19, 0x7a, 0x9a, 0x46,
        0xc7, 0x60, 0x09, 0x54, 0x9e, 0xac, 0x64, 0x74, 0xf2, 0x06, 0xc4, 0xee, 0x08, 0x44, 0xf6,
        0x83, 0x89,
    ];
    const NONCE: [u8; NONCE_SIZE] = [
        0x69, 0x69, 0x6e, 0xe9, 0x55, 0xb6, 0x2b, 0x73, 0xcd, 0x62, 0xbd, 0xa8, 0x75, 0xfc, 0x73,
        0xd6, 0x82, 0x19, 0xe0, 0x03, 0x6b, 0x7a, 0x0b, 0x37,
    ];
    // includes the trailing NUL
    const MSG: &[u8; 17] = b"Kilroy was here!\0";

    let mut ciphertext = [0u8; 17];
    let mut decrypted = [0u8; 17];

    let mut st = XSalsa20::new(&KEY, &NONCE, 20)?;
    st.crypt(MSG, &mut ciphertext)?;
    drop(st);

    let mut st = XSalsa20::new(&KEY, &NONCE, 20)?;
    st.crypt(&ciphertext, &mut decrypted)?;
    drop(st);

    if &decrypted != MSG {
        return Err(Error::SelfTestFailed);
    }

    crypt_once(&KEY, &NONCE, 20, MSG, &mut ciphertext)?;
    crypt_once(&KEY, &NONCE, 20, &ciphertext, &mut decrypted)?;
    if &decrypted != MSG {
        return Err(Error::SelfTestFailed);
    }

    // 25 blocks plus a 17-byte tail: long enough for one AVX-512 chunk,
    // several AVX2/SSE2 chunks and a partial trailing block.
    let mut msg = [0u8; 1617];
    for (b, v) in msg.iter_mut().zip((0u8..=255).cycle()) {
        *b = v;
    }

    force_backend(Backend::Soft);
    let mut reference = [0u8; 1617];
    crypt_once(&KEY, &NONCE, 20, &msg, &mut reference)?;

    let mut out = [0u8; 1617];
    for backend in [Backend::Sse2, Backend::Avx2, Backend::Avx512] {
        if !backend.available() {
            continue;
        }
        force_backend(backend);
        crypt_once(&KEY, &NONCE, 20, &msg, &mut out)?;
        if out != reference {
            return Err(Error::SelfTestFailed);
        }
    }

    Ok(())
}

#[inline(always)]
#[allow(clippy::unwrap_used, reason = "callers pass 4-byte chunks")]
pub(crate) fn le_word(chunk: &[u8]) -> u32 {
    u32::from_le_bytes(chunk.try_into().unwrap())
}
