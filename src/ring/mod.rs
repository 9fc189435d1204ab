//! Ring elements and the share containers built on them.
//!
//! Shares live in one of a closed set of rings, picked by type when a
//! protocol is instantiated:
//!
//! - [Z2k]: integers modulo a power of two (up to 128 bits);
//! - [Zq]: integers modulo a wide modulus given by a [WideModulus] marker;
//! - [Angle]: angles modulo 2π, stored as 64-bit fractions of a turn.
//!
//! All of them implement [RingElement]. The integer rings additionally
//! implement [IntegerRing], which exposes the modulus and the centered
//! big-integer representative needed to move shares into ciphertexts.

mod angle;
mod matrix;
mod z2k;
mod zq;

use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::{BigInt, BigUint};
use rand::RngCore;

pub use angle::Angle;
pub use matrix::RMat;
pub use z2k::Z2k;
pub use zq::{Mersenne127, WideModulus, Zq, Z127};

/// The algebraic interface shared by every ring.
///
/// Arithmetic wraps modulo the ring's modulus. Fixed-point conversion uses a
/// signed, centered representative: `from_f64(v, f)` stores `round(v * 2^f)`.
pub trait RingElement:
    Clone
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    fn zero() -> Self;

    fn one() -> Self;

    /// Uniformly random ring element.
    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self;

    fn from_f64(value: f64, frac_bits: u32) -> Self;

    fn to_f64(&self, frac_bits: u32) -> f64;

    /// Width of the serialized form.
    fn byte_len() -> usize;

    /// Write exactly [Self::byte_len] little-endian bytes.
    fn write_bytes(&self, out: &mut [u8]);

    fn read_bytes(bytes: &[u8]) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Rings of integers modulo some `M`.
pub trait IntegerRing: RingElement {
    fn modulus() -> BigUint;

    /// Centered representative, at most `M/2` away from zero. For even `M`
    /// the range is `[-M/2, M/2)`.
    fn to_bigint(&self) -> BigInt;

    /// Reduce an arbitrary integer modulo `M`.
    fn from_bigint(value: &BigInt) -> Self;
}

/// Fixed-point encoding of a slice of reals.
pub fn vec_from_f64<T: RingElement>(values: &[f64], frac_bits: u32) -> Vec<T> {
    values.iter().map(|&v| T::from_f64(v, frac_bits)).collect()
}

pub fn vec_to_f64<T: RingElement>(values: &[T], frac_bits: u32) -> Vec<f64> {
    values.iter().map(|v| v.to_f64(frac_bits)).collect()
}

/// Sample a vector of uniformly random ring elements.
pub fn random_vec<T: RingElement, R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Vec<T> {
    (0..len).map(|_| T::random(rng)).collect()
}

/// Split `secret` into `count` additive shares.
pub fn additive_shares<T: RingElement, R: RngCore + ?Sized>(rng: &mut R, secret: &T, count: usize) -> Vec<T> {
    assert!(count > 0, "[Invalid argument] At least one share is required.");
    let mut shares: Vec<T> = (1..count).map(|_| T::random(rng)).collect();
    let residual = shares.iter().fold(secret.clone(), |acc, s| acc - s.clone());
    shares.push(residual);
    shares
}
