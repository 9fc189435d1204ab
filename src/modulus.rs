use std::cmp::Ordering;

use crate::{
    error::{MpcError, Result},
    util,
};

/// Largest bit count of a single RNS prime.
pub const MOD_BIT_COUNT_MAX: usize = 61;

/// Represent an integer modulus of up to 61 bits.
///
/// The primes of the coefficient modulus chain are represented by instances
/// of Modulus. All arithmetic helpers take their operands already reduced.
///
/// - See [EncryptionParameters](crate::EncryptionParameters) for a description of the encryption parameters.
#[derive(Debug, Eq, Clone, Copy, Default)]
pub struct Modulus {
    value: u64,
    bit_count: usize,
    is_prime: bool,
}

impl Ord for Modulus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl PartialOrd for Modulus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Modulus {

    /// Create a new Modulus instance with the given value.
    pub fn new(value: u64) -> Self {
        if (value >> MOD_BIT_COUNT_MAX != 0) || (value < 2) {
            panic!("[Invalid argument] Value can be at most 61-bit and must be at least 2.");
        }
        Modulus {
            value,
            bit_count: 64 - value.leading_zeros() as usize,
            is_prime: util::is_prime(value),
        }
    }

    /// Reduce a [u64].
    #[inline]
    pub fn reduce(&self, value: u64) -> u64 {
        value % self.value
    }

    /// Reduce a [u128].
    #[inline]
    pub fn reduce_u128(&self, value: u128) -> u64 {
        (value % self.value as u128) as u64
    }

    /// Reduce a signed integer into `[0, value)`.
    #[inline]
    pub fn reduce_i64(&self, value: i64) -> u64 {
        value.rem_euclid(self.value as i64) as u64
    }

    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        let sum = a + b;
        if sum >= self.value {sum - self.value} else {sum}
    }

    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        if a >= b {a - b} else {a + self.value - b}
    }

    #[inline]
    pub fn negate(&self, a: u64) -> u64 {
        if a == 0 {0} else {self.value - a}
    }

    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128)
    }

    pub fn pow(&self, mut base: u64, mut exponent: u64) -> u64 {
        let mut result = 1;
        base = self.reduce(base);
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exponent >>= 1;
        }
        result
    }

    /// Inverse modulo a prime.
    pub fn inverse(&self, a: u64) -> Option<u64> {
        util::try_invert_u64_mod_u64(a, self.value)
    }

    /// The [u64] value.
    pub fn value(&self) -> u64 {self.value}
    /// Is the value a prime number?
    pub fn is_prime(&self) -> bool {self.is_prime}
    /// How many bits are there in the modulus?
    pub fn bit_count(&self) -> usize {self.bit_count}

}

impl std::fmt::Display for Modulus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Modulus ({})", self.value)
    }
}

/// Static methods for creating a coefficient modulus chain.
pub struct CoeffModulus;

impl CoeffModulus {

    /// Returns a custom coefficient modulus suitable for use with the specified
    /// poly_modulus_degree. The return value will be a vector consisting of
    /// Modulus elements representing distinct prime numbers such that:
    /// 1) have bit-lengths as given in the bit_sizes parameter (at most 60 bits) and
    /// 2) are congruent to 1 modulo 2*poly_modulus_degree.
    ///
    /// The search is deterministic, so every party derives the same chain.
    pub fn create(poly_modulus_degree: usize, bit_sizes: &[usize]) -> Result<Vec<Modulus>> {
        if poly_modulus_degree < 2 || !poly_modulus_degree.is_power_of_two() {
            return Err(MpcError::Parameters(format!(
                "poly modulus degree {} is not a power of two", poly_modulus_degree)));
        }
        if bit_sizes.is_empty() {
            return Err(MpcError::Parameters("coefficient modulus bit sizes are empty".into()));
        }
        if bit_sizes.iter().any(|&b| !(20..=60).contains(&b)) {
            return Err(MpcError::Parameters("coefficient modulus bit sizes must be in 20..=60".into()));
        }
        let factor = 2 * poly_modulus_degree as u64;
        let mut result: Vec<Modulus> = Vec::with_capacity(bit_sizes.len());
        for &size in bit_sizes {
            let taken = result.iter().filter(|m| m.bit_count() == size).count();
            let primes = util::get_primes(factor, size, taken + 1)
                .ok_or_else(|| MpcError::Parameters(format!(
                    "not enough {}-bit primes congruent to 1 mod {}", size, factor)))?;
            result.push(primes[taken]);
        }
        Ok(result)
    }

}
