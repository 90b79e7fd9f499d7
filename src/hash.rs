//! Key hashing for `HashTable`.
//!
//! Bob Jenkins' lookup2 ("evahash", 1996, public domain), see
//! <http://burtleburtle.net/bob/hash/evahash.html>. Hashing is over raw key
//! bytes; with `fold` set every byte is ASCII-lowercased on the fly so
//! `"Foo"` and `"foo"` produce the same value without an intermediate copy.

const GOLDEN_RATIO: u32 = 0x9e37_79b9;
const INITVAL: u32 = 0xb33f_f00d;

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
}

#[inline]
fn byte(b: u8, fold: bool) -> u32 {
    u32::from(if fold { b.to_ascii_lowercase() } else { b })
}

/// Little-endian word from up to four bytes.
#[inline]
fn word(bytes: &[u8], fold: bool) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc.wrapping_add(byte(b, fold) << (8 * i)))
}

/// Full (non-reduced) 32-bit hash of `key`.
pub fn lookup2(key: &[u8], fold: bool) -> u32 {
    let mut a = GOLDEN_RATIO;
    let mut b = GOLDEN_RATIO;
    let mut c = INITVAL;

    let mut blocks = key.chunks_exact(12);
    for block in &mut blocks {
        a = a.wrapping_add(word(&block[0..4], fold));
        b = b.wrapping_add(word(&block[4..8], fold));
        c = c.wrapping_add(word(&block[8..12], fold));
        mix(&mut a, &mut b, &mut c);
    }

    // Only the low 32 bits of the length take part, as in the reference.
    c = c.wrapping_add(key.len() as u32);

    let tail = blocks.remainder();
    let (lo, rest) = tail.split_at(tail.len().min(4));
    let (mid, hi) = rest.split_at(rest.len().min(4));
    a = a.wrapping_add(word(lo, fold));
    b = b.wrapping_add(word(mid, fold));
    // The low byte of c is taken by the length.
    c = c.wrapping_add(word(hi, fold) << 8);
    mix(&mut a, &mut b, &mut c);

    c
}
