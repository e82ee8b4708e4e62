//! Code for the quick creation of random identifier strings

use rand::seq::IndexedRandom;

pub(crate) const ALPHANUM: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Create a string of `len` characters drawn from `ALPHANUM` without
/// repetition.
///
/// Lengths beyond the size of the alphabet are clamped to it, there being no
/// way to satisfy the request otherwise.
pub(crate) fn distinct_alphanum<R>(rng: &mut R, len: usize) -> String
where
    R: rand::Rng + ?Sized,
{
    ALPHANUM
        .choose_multiple(rng, len)
        .map(|&c| char::from(c))
        .collect()
}
