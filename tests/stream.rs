//! Chunk-boundary behavior of the streaming interface: any split of a
//! message must produce the same ciphertext as a single call.

use xsalsa20::{KEY_SIZE, NONCE_SIZE, XSalsa20};

const KEY: [u8; KEY_SIZE] = *b"this is 32-byte key for xsalsa20";

const NONCE: [u8; NONCE_SIZE] = *b"24-byte nonce for xsalsa";

fn encrypt_split(msg: &[u8], splits: &[usize]) -> Vec<u8> {
    assert_eq!(splits.iter().sum::<usize>(), msg.len());

    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut out = vec![0u8; msg.len()];
    let mut offset = 0;
    for &len in splits {
        cipher
            .crypt(&msg[offset..offset + len], &mut out[offset..offset + len])
            .unwrap();
        offset += len;
    }
    out
}

#[test]
fn chunk_invariance_over_200_zero_bytes() {
    let msg = [0u8; 200];

    let whole = encrypt_split(&msg, &[200]);
    assert_eq!(encrypt_split(&msg, &[64, 64, 64, 8]), whole);
    assert_eq!(encrypt_split(&msg, &[1, 63, 136]), whole);
}

#[test]
fn chunk_invariance_at_awkward_offsets() {
    let mut msg = [0u8; 1617];
    for (b, v) in msg.iter_mut().zip((0u8..=255).cycle()) {
        *b = v;
    }

    let whole = encrypt_split(&msg, &[1617]);
    assert_eq!(encrypt_split(&msg, &[1, 1, 1, 62, 1488, 64]), whole);
    assert_eq!(encrypt_split(&msg, &[65, 63, 385, 1024, 80]), whole);
    assert_eq!(encrypt_split(&msg, &[1023, 1, 593]), whole);
    assert_eq!(
        encrypt_split(&msg, &[7, 256, 256, 256, 512, 256, 74]),
        whole
    );
}

#[test]
fn byte_at_a_time_equals_bulk() {
    let mut msg = [0u8; 130];
    for (b, v) in msg.iter_mut().zip((1u8..).map(|v| v.wrapping_mul(31))) {
        *b = v;
    }

    let whole = encrypt_split(&msg, &[130]);
    let trickled = encrypt_split(&msg, &[1; 130]);
    assert_eq!(trickled, whole);
}

#[test]
fn in_place_matches_buffer_to_buffer() {
    let mut msg = [0u8; 333];
    for (b, v) in msg.iter_mut().zip((0u8..=255).cycle()) {
        *b = v;
    }

    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut separate = [0u8; 333];
    cipher.crypt(&msg, &mut separate).unwrap();

    let mut cipher = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut in_place = msg;
    cipher.apply_keystream(&mut in_place).unwrap();

    assert_eq!(in_place, separate);
}

#[test]
fn keystream_equals_crypt_of_zero_stream() {
    let mut direct = XSalsa20::new(&KEY, &NONCE, 20).unwrap();
    let mut zeros = XSalsa20::new(&KEY, &NONCE, 20).unwrap();

    // interleave uneven requests on both states
    let mut ks = vec![0u8; 777];
    let mut zs = vec![0u8; 777];
    let mut offset = 0;
    for len in [5usize, 59, 64, 129, 256, 264] {
        direct.keystream(&mut ks[offset..offset + len]).unwrap();
        zeros.crypt(&vec![0u8; len], &mut zs[offset..offset + len]).unwrap();
        offset += len;
    }
    assert_eq!(ks, zs);
}

#[test]
fn decryption_round_trips_across_different_splits() {
    let mut msg = [0u8; 500];
    for (b, v) in msg.iter_mut().zip((0u8..=255).cycle()) {
        *b = v;
    }

    let ciphertext = encrypt_split(&msg, &[500]);
    let decrypted = encrypt_split(&ciphertext, &[33, 400, 67]);
    assert_eq!(decrypted, msg);
}
