use std::f64::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

use rand::RngCore;

use super::RingElement;

const TURN: f64 = 2.0 * PI;
const WORD_SCALE: f64 = 18446744073709551616.0; // 2^64

/// Angles modulo 2π.
///
/// An angle is held as a 64-bit fraction of a full turn, so that addition
/// wraps exactly at the period. Multiplication is that of `Z/2^64` and only
/// exists to satisfy the ring interface.
///
/// The fixed-point conversions ignore `frac_bits`: the encoding precision is
/// fixed at `2π / 2^64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Angle(u64);

impl Angle {
    pub fn from_radians(radians: f64) -> Self {
        let turns = (radians / TURN).rem_euclid(1.0);
        // turns may round up to exactly 1.0
        Self((turns * WORD_SCALE) as u128 as u64)
    }

    /// Angle in `[-π, π)`.
    pub fn radians(&self) -> f64 {
        (self.0 as i64) as f64 / WORD_SCALE * TURN
    }
}

impl Add for Angle {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Mul for Angle {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(self.0.wrapping_mul(rhs.0))
    }
}

impl Neg for Angle {
    type Output = Self;
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl RingElement for Angle {
    fn zero() -> Self {
        Self(0)
    }

    fn one() -> Self {
        Self(1)
    }

    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self(rng.next_u64())
    }

    fn from_f64(value: f64, _frac_bits: u32) -> Self {
        Self::from_radians(value)
    }

    fn to_f64(&self, _frac_bits: u32) -> f64 {
        self.radians()
    }

    fn byte_len() -> usize {
        8
    }

    fn write_bytes(&self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.0.to_le_bytes());
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        Self(u64::from_le_bytes(word))
    }
}
