use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::OnceLock;

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use rand::RngCore;

use super::{IntegerRing, RingElement};

/// Marker for a modulus too wide for machine words.
pub trait WideModulus: Send + Sync + 'static {
    fn modulus() -> &'static BigUint;
}

/// The Mersenne prime `2^127 - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mersenne127;

impl WideModulus for Mersenne127 {
    fn modulus() -> &'static BigUint {
        static MODULUS: OnceLock<BigUint> = OnceLock::new();
        MODULUS.get_or_init(|| (BigUint::from(1u8) << 127u32) - 1u8)
    }
}

/// Integers modulo `M::modulus()`, kept in `[0, M)`.
pub struct Zq<M: WideModulus> {
    value: BigUint,
    _modulus: PhantomData<M>,
}

pub type Z127 = Zq<Mersenne127>;

impl<M: WideModulus> Zq<M> {
    pub fn new(value: BigUint) -> Self {
        Self::reduced(value % M::modulus())
    }

    fn reduced(value: BigUint) -> Self {
        Self { value, _modulus: PhantomData }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }
}

impl<M: WideModulus> Clone for Zq<M> {
    fn clone(&self) -> Self {
        Self::reduced(self.value.clone())
    }
}

impl<M: WideModulus> PartialEq for Zq<M> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<M: WideModulus> fmt::Debug for Zq<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Zq({})", self.value)
    }
}

impl<M: WideModulus> Add for Zq<M> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let sum = self.value + rhs.value;
        let modulus = M::modulus();
        if &sum >= modulus {
            Self::reduced(sum - modulus)
        } else {
            Self::reduced(sum)
        }
    }
}

impl<M: WideModulus> Sub for Zq<M> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        if self.value >= rhs.value {
            Self::reduced(self.value - rhs.value)
        } else {
            Self::reduced(self.value + M::modulus() - rhs.value)
        }
    }
}

impl<M: WideModulus> Mul for Zq<M> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::reduced((self.value * rhs.value) % M::modulus())
    }
}

impl<M: WideModulus> Neg for Zq<M> {
    type Output = Self;
    fn neg(self) -> Self {
        if self.value.is_zero() {
            self
        } else {
            Self::reduced(M::modulus() - self.value)
        }
    }
}

impl<M: WideModulus> RingElement for Zq<M> {
    fn zero() -> Self {
        Self::reduced(BigUint::zero())
    }

    fn one() -> Self {
        Self::reduced(BigUint::from(1u8))
    }

    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::reduced(rng.gen_biguint_below(M::modulus()))
    }

    fn from_f64(value: f64, frac_bits: u32) -> Self {
        let scaled = (value * 2f64.powi(frac_bits as i32)).round();
        let integer = BigInt::from_f64(scaled).unwrap_or_default();
        Self::from_bigint(&integer)
    }

    fn to_f64(&self, frac_bits: u32) -> f64 {
        let signed = self.to_bigint().to_f64().unwrap_or(f64::NAN);
        signed / 2f64.powi(frac_bits as i32)
    }

    fn byte_len() -> usize {
        ((M::modulus().bits() + 7) / 8) as usize
    }

    fn write_bytes(&self, out: &mut [u8]) {
        let len = Self::byte_len();
        let bytes = self.value.to_bytes_le();
        out[..len].fill(0);
        out[..bytes.len()].copy_from_slice(&bytes);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        Self::new(BigUint::from_bytes_le(&bytes[..Self::byte_len()]))
    }
}

impl<M: WideModulus> IntegerRing for Zq<M> {
    fn modulus() -> BigUint {
        M::modulus().clone()
    }

    fn to_bigint(&self) -> BigInt {
        let modulus = M::modulus();
        if &self.value > &(modulus >> 1u32) {
            BigInt::from_biguint(Sign::Minus, modulus - &self.value)
        } else {
            BigInt::from(self.value.clone())
        }
    }

    fn from_bigint(value: &BigInt) -> Self {
        let modulus = BigInt::from(M::modulus().clone());
        let reduced = value.mod_floor(&modulus);
        Self::reduced(reduced.to_biguint().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modular_arithmetic() {
        let minus_one = -Z127::one();
        assert_eq!(minus_one.clone() + Z127::one(), Z127::zero());
        assert_eq!(minus_one.clone() * minus_one.clone(), Z127::one());
        assert_eq!(minus_one.to_bigint(), BigInt::from(-1));
        assert_eq!(Z127::zero() - Z127::one(), minus_one);
        assert_eq!(Z127::byte_len(), 16);
    }

    #[test]
    fn test_fixed_point() {
        let a = Z127::from_f64(-3.5, 40);
        let b = Z127::from_f64(0.5, 40);
        assert_eq!(a.to_f64(40), -3.5);
        assert_eq!((a * b).to_f64(80), -1.75);
    }

    #[test]
    fn test_bytes() {
        let a = Z127::from_f64(-2.0, 10);
        let mut bytes = vec![0xffu8; Z127::byte_len()];
        a.write_bytes(&mut bytes);
        assert_eq!(Z127::read_bytes(&bytes), a);
    }
}
