use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::ToPrimitive;
use rand::RngCore;

use super::{IntegerRing, RingElement};

/// Integers modulo `2^BITS`, `1 <= BITS <= 128`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Z2k<const BITS: u32>(u128);

impl<const BITS: u32> Z2k<BITS> {
    const MASK: u128 = if BITS >= 128 { u128::MAX } else { (1u128 << BITS) - 1 };

    pub fn new(value: u128) -> Self {
        assert!(BITS >= 1 && BITS <= 128, "[Invalid argument] Z2k supports 1 to 128 bits.");
        Self(value & Self::MASK)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    /// Two's-complement signed view of the element.
    pub fn signed(&self) -> i128 {
        if BITS >= 128 {
            self.0 as i128
        } else if self.0 >> (BITS - 1) == 1 {
            (self.0 as i128).wrapping_sub(1i128.wrapping_shl(BITS))
        } else {
            self.0 as i128
        }
    }
}

impl<const BITS: u32> Add for Z2k<BITS> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0) & Self::MASK)
    }
}

impl<const BITS: u32> Sub for Z2k<BITS> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0) & Self::MASK)
    }
}

impl<const BITS: u32> Mul for Z2k<BITS> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(self.0.wrapping_mul(rhs.0) & Self::MASK)
    }
}

impl<const BITS: u32> Neg for Z2k<BITS> {
    type Output = Self;
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg() & Self::MASK)
    }
}

impl<const BITS: u32> AddAssign for Z2k<BITS> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const BITS: u32> SubAssign for Z2k<BITS> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const BITS: u32> RingElement for Z2k<BITS> {
    fn zero() -> Self {
        Self(0)
    }

    fn one() -> Self {
        Self(1)
    }

    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let value = ((rng.next_u64() as u128) << 64) | rng.next_u64() as u128;
        Self(value & Self::MASK)
    }

    fn from_f64(value: f64, frac_bits: u32) -> Self {
        let scaled = (value * 2f64.powi(frac_bits as i32)).round();
        Self((scaled as i128) as u128 & Self::MASK)
    }

    fn to_f64(&self, frac_bits: u32) -> f64 {
        self.signed() as f64 / 2f64.powi(frac_bits as i32)
    }

    fn byte_len() -> usize {
        ((BITS + 7) / 8) as usize
    }

    fn write_bytes(&self, out: &mut [u8]) {
        let len = Self::byte_len();
        out[..len].copy_from_slice(&self.0.to_le_bytes()[..len]);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        let len = Self::byte_len();
        let mut buffer = [0u8; 16];
        buffer[..len].copy_from_slice(&bytes[..len]);
        Self(u128::from_le_bytes(buffer) & Self::MASK)
    }
}

impl<const BITS: u32> IntegerRing for Z2k<BITS> {
    fn modulus() -> BigUint {
        BigUint::from(1u8) << BITS
    }

    fn to_bigint(&self) -> BigInt {
        BigInt::from(self.signed())
    }

    fn from_bigint(value: &BigInt) -> Self {
        let modulus = BigInt::from(Self::modulus());
        let reduced = value.mod_floor(&modulus);
        // reduced < 2^BITS <= 2^128
        Self(reduced.to_u128().unwrap_or(0) & Self::MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type R = Z2k<62>;

    #[test]
    fn test_wrapping_arithmetic() {
        let max = R::new((1 << 62) - 1);
        assert_eq!(max + R::one(), R::zero());
        assert_eq!(R::zero() - R::one(), max);
        assert_eq!(-R::one(), max);
        assert_eq!(max.signed(), -1);
        let a = R::from_f64(1.5, 20);
        let b = R::from_f64(-2.0, 20);
        // products carry twice the fractional bits
        assert_eq!((a * b).to_f64(40), -3.0);
    }

    #[test]
    fn test_bigint_conversion() {
        let a = R::from_f64(-7.0, 0);
        assert_eq!(a.to_bigint(), BigInt::from(-7));
        assert_eq!(R::from_bigint(&BigInt::from(-7)), a);
        let wrapped = BigInt::from(5) + BigInt::from(R::modulus()) * 3;
        assert_eq!(R::from_bigint(&wrapped), R::new(5));
    }

    #[test]
    fn test_full_width_ring() {
        type W = Z2k<128>;
        assert_eq!(W::byte_len(), 16);
        let a = W::from_f64(-0.25, 40);
        let mut bytes = [0u8; 16];
        a.write_bytes(&mut bytes);
        assert_eq!(W::read_bytes(&bytes), a);
        assert_eq!((a * a).to_f64(80), 0.0625);
    }

    #[test]
    fn test_byte_width() {
        assert_eq!(R::byte_len(), 8);
        assert_eq!(Z2k::<64>::byte_len(), 8);
        assert_eq!(Z2k::<65>::byte_len(), 9);
    }
}
