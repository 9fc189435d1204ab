use std::sync::Arc;

use crate::{
    util::polymod,
    CipherMatrix, Ciphertext, HeContext, Plaintext,
};

/// Provides the homomorphic operations the share bridge needs on [Ciphertext]
/// objects: addition, plain addition and moving down the modulus chain.
///
/// Binary operations require both operands at the same level and panic
/// otherwise.
pub struct Evaluator {
    context: Arc<HeContext>,
}

impl Evaluator {

    pub fn new(context: Arc<HeContext>) -> Self {
        Self { context }
    }

    fn check_same_level(a: usize, b: usize) {
        if a != b {
            panic!("[Invalid argument] Operands at different levels ({} and {}).", a, b);
        }
    }

    pub fn add_inplace(&self, cipher: &mut Ciphertext, other: &Ciphertext) {
        Self::check_same_level(cipher.level(), other.level());
        let context_data = self.context.context_data(cipher.level());
        let degree = context_data.poly_modulus_degree();
        polymod::add_inplace_p(cipher.data_mut(), other.data(), degree, context_data.coeff_modulus());
    }

    pub fn add(&self, cipher: &Ciphertext, other: &Ciphertext) -> Ciphertext {
        let mut result = cipher.clone();
        self.add_inplace(&mut result, other);
        result
    }

    pub fn add_plain_inplace(&self, cipher: &mut Ciphertext, plain: &Plaintext) {
        Self::check_same_level(cipher.level(), plain.level());
        let context_data = self.context.context_data(cipher.level());
        let degree = context_data.poly_modulus_degree();
        polymod::add_inplace_p(cipher.poly_mut(0), plain.data(), degree, context_data.coeff_modulus());
    }

    /// Drop primes until the ciphertext sits at `level`.
    pub fn drop_to_level(&self, cipher: &mut Ciphertext, level: usize) {
        cipher.truncate_to_level(&self.context, level);
    }

    /// Bring every ciphertext of the matrix to the lowest level found in it,
    /// returning that level.
    pub fn flatten_levels(&self, matrix: &mut CipherMatrix) -> usize {
        let level = matrix.iter().flatten()
            .map(|c| c.level())
            .min()
            .unwrap_or_else(|| self.context.max_level());
        for cipher in matrix.iter_mut().flatten() {
            self.drop_to_level(cipher, level);
        }
        level
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HeConfig, ring::{RingElement, Z2k}, Decryptor, EncryptionParameters, Encryptor,
        FixedPointEncoder, KeyGenerator,
    };

    type R = Z2k<62>;

    #[test]
    fn test_add_and_flatten() {
        let config = HeConfig { poly_modulus_degree: 64, coeff_modulus_bits: vec![55, 55, 55], scale_bits: 50 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let keygen = KeyGenerator::new(context.clone());
        let encryptor = Encryptor::new(context.clone(), keygen.create_public_key());
        let decryptor = Decryptor::new(context.clone(), keygen.secret_key().clone());
        let encoder = FixedPointEncoder::new(context.clone(), 20);
        let evaluator = Evaluator::new(context.clone());

        let a: Vec<R> = [1.5, -2.0].iter().map(|&v| R::from_f64(v, 20)).collect();
        let b: Vec<R> = [0.25, 4.0].iter().map(|&v| R::from_f64(v, 20)).collect();
        let ca = encryptor.encrypt(&encoder.encode(&a, 2));
        let cb = encryptor.encrypt(&encoder.encode(&b, 1));

        let mut matrix: CipherMatrix = vec![vec![ca.clone()], vec![cb.clone()]];
        assert_eq!(evaluator.flatten_levels(&mut matrix), 1);
        assert!(matrix.iter().flatten().all(|c| c.level() == 1));

        let sum = evaluator.add(&matrix[0][0], &matrix[1][0]);
        let decoded: Vec<R> = encoder.decode(&decryptor.decrypt(&sum));
        assert_eq!(decoded[0], R::from_f64(1.75, 20));
        assert_eq!(decoded[1], R::from_f64(2.0, 20));

        let mut plain_sum = cb;
        evaluator.add_plain_inplace(&mut plain_sum, &encoder.encode(&a, 1));
        let decoded: Vec<R> = encoder.decode(&decryptor.decrypt(&plain_sum));
        assert_eq!(decoded[1], R::from_f64(2.0, 20));
    }

    #[test]
    #[should_panic]
    fn test_add_rejects_mixed_levels() {
        let config = HeConfig { poly_modulus_degree: 16, coeff_modulus_bits: vec![30, 30], scale_bits: 20 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let evaluator = Evaluator::new(context.clone());
        let mut a = Ciphertext::zeros(&context, 1);
        evaluator.add_inplace(&mut a, &Ciphertext::zeros(&context, 0));
    }
}
