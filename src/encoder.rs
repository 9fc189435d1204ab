use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use crate::{
    context::HeContext,
    ring::IntegerRing,
    util::polymod,
    Plaintext,
};

/// Encodes fixed-point ring values into plaintext coefficients.
///
/// Each of the `poly_modulus_degree` coefficients is one slot. A value `v`
/// with `frac_bits` fractional bits becomes the integer `v * 2^scale_bits`, that
/// is, the centered representative shifted left by `scale_bits - frac_bits`.
/// Decoding divides by the same factor with rounding and reduces into the ring.
pub struct FixedPointEncoder {
    context: Arc<HeContext>,
    frac_bits: u32,
}

impl FixedPointEncoder {

    pub fn new(context: Arc<HeContext>, frac_bits: u32) -> Self {
        assert!(frac_bits <= context.scale_bits(),
            "[Invalid argument] Encoding scale must cover the fractional bits.");
        Self { context, frac_bits }
    }

    pub fn slot_count(&self) -> usize {
        self.context.slot_count()
    }

    /// `scale_bits - frac_bits`: how far values are shifted into the plaintext.
    pub fn shift(&self) -> u32 {
        self.context.scale_bits() - self.frac_bits
    }

    /// Encode up to `slot_count` ring values; remaining slots are zero.
    pub fn encode<T: IntegerRing>(&self, values: &[T], level: usize) -> Plaintext {
        let shift = self.shift();
        let coefficients: Vec<BigInt> = values.iter().map(|v| v.to_bigint() << shift).collect();
        self.encode_integers(&coefficients, level)
    }

    /// Encode raw integer coefficients.
    pub fn encode_integers(&self, coefficients: &[BigInt], level: usize) -> Plaintext {
        let context_data = self.context.context_data(level);
        let degree = context_data.poly_modulus_degree();
        if coefficients.len() > degree {
            panic!("[Invalid argument] {} values exceed {} slots.", coefficients.len(), degree);
        }
        let mut plain = Plaintext::zeros(&self.context, level);
        for (j, modulus) in context_data.coeff_modulus().iter().enumerate() {
            let q = BigInt::from(modulus.value());
            let block = &mut plain.data_mut()[j * degree..(j + 1) * degree];
            for (slot, c) in block.iter_mut().zip(coefficients) {
                *slot = c.mod_floor(&q).to_u64().unwrap_or(0);
            }
        }
        polymod::ntt_p(plain.data_mut(), degree, context_data.small_ntt_tables());
        plain
    }

    /// Centered integer coefficients of a plaintext.
    pub fn decode_integers(&self, plain: &Plaintext) -> Vec<BigInt> {
        let context_data = self.context.context_data(plain.level());
        let degree = context_data.poly_modulus_degree();
        let mut data = plain.data().to_vec();
        polymod::intt_p(&mut data, degree, context_data.small_ntt_tables());
        let total = context_data.total_coeff_modulus();
        let half = total >> 1u32;
        let moduli_count = context_data.coeff_modulus().len();
        (0..degree).map(|i| {
            let mut value = BigUint::zero();
            for (j, basis) in context_data.crt_basis().iter().enumerate().take(moduli_count) {
                value += basis * data[j * degree + i];
            }
            value %= total;
            if value > half {
                BigInt::from(value) - BigInt::from(total.clone())
            } else {
                BigInt::from(value)
            }
        }).collect()
    }

    /// Decode every slot into the ring.
    pub fn decode<T: IntegerRing>(&self, plain: &Plaintext) -> Vec<T> {
        let shift = self.shift();
        let divisor = BigInt::one() << shift;
        let half = if shift == 0 { BigInt::zero() } else { BigInt::one() << (shift - 1) };
        self.decode_integers(plain)
            .into_iter()
            .map(|c| T::from_bigint(&(c + &half).div_floor(&divisor)))
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::HeConfig, ring::{RingElement, Z2k}, EncryptionParameters};

    type R = Z2k<62>;

    #[test]
    fn test_encode_decode() {
        let config = HeConfig { poly_modulus_degree: 32, coeff_modulus_bits: vec![50, 50, 50], scale_bits: 30 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let encoder = FixedPointEncoder::new(context.clone(), 20);
        let values: Vec<R> = [0.5, -1.25, 3.0, 0.0, -1000.0].iter().map(|&v| R::from_f64(v, 20)).collect();
        for level in [2, 0] {
            let plain = encoder.encode(&values, level);
            let decoded: Vec<R> = encoder.decode(&plain);
            assert_eq!(decoded.len(), 32);
            assert_eq!(&decoded[..5], &values[..]);
            assert!(decoded[5..].iter().all(|v| v.is_zero()));
        }
    }

    #[test]
    fn test_decode_rounds_to_nearest() {
        let config = HeConfig { poly_modulus_degree: 8, coeff_modulus_bits: vec![40, 40], scale_bits: 30 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let encoder = FixedPointEncoder::new(context, 10);
        // shift is 20 bits: 3 * 2^20 + small noise decodes to 3
        let noisy = vec![BigInt::from(3i64 << 20) + 1000, BigInt::from(-(3i64 << 20)) - 1000, BigInt::from(1 << 19)];
        let plain = encoder.encode_integers(&noisy, 1);
        assert_eq!(encoder.decode_integers(&plain)[..3], noisy[..]);
        let decoded: Vec<R> = encoder.decode(&plain);
        assert_eq!(decoded[0], R::new(3));
        assert_eq!(decoded[1], -R::new(3));
        assert_eq!(decoded[2], R::new(1));
    }
}
