//! XSalsa20 known-answer, round-trip and argument-validation tests

use hex_literal::hex;
use xsalsa20::{Error, KEY_SIZE, NONCE_SIZE, XSalsa20, crypt_once};

const KEY: [u8; KEY_SIZE] = *b"this is 32-byte key for xsalsa20";

const NONCE: [u8; NONCE_SIZE] = *b"24-byte nonce for xsalsa";

const EXPECTED_KEYSTREAM: [u8; 64] = hex!(
    "4848297feb1fb52fb66d81609bd547fa"
    "bcbe7026edc8b5e5e449d088bfa69c08"
    "8f5d8da1d791267c2c195a7f8cae9c4b"
    "4050d08ce6d3a151ec265f3a58e47648"
);

const EXPECTED_HELLO_WORLD: [u8; 12] = hex!("002d4513843fc240c401e541");

const KILROY_KEY: [u8; KEY_SIZE] =
    hex!("1b27556473e985d462cd51197a9a46c76009549eac6474f206c4ee0844f68389");

const KILROY_NONCE: [u8; NONCE_SIZE] = hex!("69696ee955b62b73cd62bda875fc73d68219e0036b7a0b37");

#[test]
fn xsalsa20_keystream_of_zeros() {
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut buf = [0u8; 64];
    cipher.apply_keystream(&mut buf).unwrap();
    assert_eq!(buf, EXPECTED_KEYSTREAM);
}

#[test]
fn xsalsa20_keystream_call_matches_crypt_of_zeros() {
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut buf = [0xff_u8; 64];
    cipher.keystream(&mut buf).unwrap();
    assert_eq!(buf, EXPECTED_KEYSTREAM);
}

#[test]
fn xsalsa20_encrypt_hello_world() {
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut buf = *b"Hello world!";
    cipher.apply_keystream(&mut buf).unwrap();
    assert_eq!(buf, EXPECTED_HELLO_WORLD);
}

#[test]
fn kilroy_round_trip_streaming() {
    // the classic LibTomCrypt vector, trailing NUL included
    let msg = b"Kilroy was here!\0";

    let mut cipher = XSalsa20::new(&KILROY_KEY, &KILROY_NONCE, 20).unwrap();
    let mut ciphertext = [0u8; 17];
    cipher.crypt(msg, &mut ciphertext).unwrap();
    assert_ne!(&ciphertext, msg);

    let mut cipher = XSalsa20::new(&KILROY_KEY, &KILROY_NONCE, 20).unwrap();
    let mut decrypted = [0u8; 17];
    cipher.crypt(&ciphertext, &mut decrypted).unwrap();
    assert_eq!(&decrypted, msg);
}

#[test]
fn kilroy_round_trip_one_shot() {
    let msg = b"Kilroy was here!\0";

    let mut ciphertext = [0u8; 17];
    crypt_once(&KILROY_KEY, &KILROY_NONCE, 20, msg, &mut ciphertext).unwrap();

    let mut decrypted = [0u8; 17];
    crypt_once(&KILROY_KEY, &KILROY_NONCE, 20, &ciphertext, &mut decrypted).unwrap();
    assert_eq!(&decrypted, msg);
}

#[test]
fn one_shot_matches_streaming() {
    let msg = [0x5a_u8; 300];

    let mut streamed = [0u8; 300];
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    cipher.crypt(&msg, &mut streamed).unwrap();

    let mut oneshot = [0u8; 300];
    crypt_once(&KEY, &NONCE, 20, &msg, &mut oneshot).unwrap();

    assert_eq!(streamed, oneshot);
}

#[test]
fn rounds_zero_selects_twenty() {
    let mut defaulted = XSalsa20::new(&KEY, &NONCE, 0).unwrap();
    let mut explicit = XSalsa20::new(&KEY, &NONCE, 20).unwrap();

    let mut a = [0u8; 128];
    let mut b = [0u8; 128];
    defaulted.keystream(&mut a).unwrap();
    explicit.keystream(&mut b).unwrap();
    assert_eq!(a, b);
    assert_eq!(&a[..64], &EXPECTED_KEYSTREAM[..]);
}

#[test]
fn reduced_round_variants_round_trip() {
    for rounds in [8usize, 12] {
        let msg = b"attack at dawn";

        let mut ciphertext = [0u8; 14];
        crypt_once(&KEY, &NONCE, rounds, msg, &mut ciphertext).unwrap();
        assert_ne!(&ciphertext, msg);

        let mut decrypted = [0u8; 14];
        crypt_once(&KEY, &NONCE, rounds, &ciphertext, &mut decrypted).unwrap();
        assert_eq!(&decrypted, msg);
    }
}

#[test]
fn setup_rejects_bad_arguments() {
    assert_eq!(
        XSalsa20::new(&KEY[..31], &NONCE, 20).unwrap_err(),
        Error::InvalidKeySize
    );
    assert_eq!(
        XSalsa20::new(&[0u8; 33], &NONCE, 20).unwrap_err(),
        Error::InvalidKeySize
    );
    assert_eq!(
        XSalsa20::new(&KEY, &NONCE[..23], 20).unwrap_err(),
        Error::InvalidNonceSize
    );
    assert_eq!(
        XSalsa20::new(&KEY, &NONCE, 3).unwrap_err(),
        Error::InvalidRounds
    );

    assert_eq!(Error::InvalidKeySize.code(), -3);
    assert_eq!(Error::InvalidNonceSize.code(), -4);
    assert_eq!(Error::InvalidRounds.code(), -5);
}

#[test]
fn crypt_rejects_mismatched_buffers() {
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut out = [0u8; 4];
    assert_eq!(cipher.crypt(b"hello", &mut out), Err(Error::InvalidArg));

    // the failed call must not have advanced the state
    let mut fresh = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    cipher.keystream(&mut a).unwrap();
    fresh.keystream(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_input_is_a_no_op() {
    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    cipher.crypt(&[], &mut []).unwrap();
    cipher.apply_keystream(&mut []).unwrap();
    cipher.keystream(&mut []).unwrap();

    let mut buf = [0u8; 64];
    cipher.apply_keystream(&mut buf).unwrap();
    assert_eq!(buf, EXPECTED_KEYSTREAM);
}
