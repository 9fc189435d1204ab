use std::sync::Arc;

use crate::{
    util::{polymod, rlwe},
    Ciphertext, HeContext, Plaintext, PublicKey, SecretKey,
};

/// Encrypts [Plaintext] objects into [Ciphertext] objects under a public key.
///
/// In the multiparty setting the public key is the collective key, so that
/// decryption needs the cooperation of every key holder.
///
/// ```rust
/// use trigon::*;
/// let config = HeConfig { poly_modulus_degree: 64, coeff_modulus_bits: vec![40, 40], scale_bits: 30 };
/// let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
/// let keygen = KeyGenerator::new(context.clone());
/// let encryptor = Encryptor::new(context.clone(), keygen.create_public_key());
/// let encoder = FixedPointEncoder::new(context.clone(), 10);
/// let plain = encoder.encode(&[Z2k::<62>::from_f64(1.5, 10)], context.max_level());
/// let cipher = encryptor.encrypt(&plain);
/// assert_eq!(cipher.level(), context.max_level());
/// ```
pub struct Encryptor {
    context: Arc<HeContext>,
    public_key: PublicKey,
}

impl Encryptor {

    pub fn new(context: Arc<HeContext>, public_key: PublicKey) -> Self {
        Self { context, public_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Encrypt at the level of the plaintext:
    /// `(p0 * u + e0 + m, p1 * u + e1)` with ternary `u`.
    pub fn encrypt(&self, plain: &Plaintext) -> Ciphertext {
        let level = plain.level();
        let context_data = self.context.context_data(level);
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();
        let tables = context_data.small_ntt_tables();
        let len = context_data.poly_len();
        let mut rng = self.context.create_random_generator();

        let mut u = vec![0; len];
        rlwe::sample::ternary(&mut rng, degree, moduli, &mut u);
        polymod::ntt_p(&mut u, degree, tables);

        let pk = self.public_key.as_ciphertext();
        let mut cipher = Ciphertext::zeros(&self.context, level);
        let mut noise = vec![0; len];
        for id in 0..2 {
            let poly = cipher.poly_mut(id);
            poly.copy_from_slice(&pk.poly(id)[..len]);
            polymod::dyadic_product_inplace_p(poly, &u, degree, moduli);
            rlwe::sample::gaussian(&mut rng, rlwe::sample::NOISE_STANDARD_DEVIATION, degree, moduli, &mut noise);
            polymod::ntt_p(&mut noise, degree, tables);
            polymod::add_inplace_p(poly, &noise, degree, moduli);
        }
        polymod::add_inplace_p(cipher.poly_mut(0), plain.data(), degree, moduli);
        cipher
    }

}

/// Decrypts [Ciphertext] objects with a full secret key.
///
/// Multiparty decryption never assembles the key; this type serves callers
/// that hold one, such as tests summing every party's share.
pub struct Decryptor {
    context: Arc<HeContext>,
    secret_key: SecretKey,
}

impl Decryptor {

    pub fn new(context: Arc<HeContext>, secret_key: SecretKey) -> Self {
        Self { context, secret_key }
    }

    /// `c0 + c1 * s` at the level of the ciphertext.
    pub fn decrypt(&self, cipher: &Ciphertext) -> Plaintext {
        let level = cipher.level();
        let context_data = self.context.context_data(level);
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();
        let mut plain = Plaintext::zeros(&self.context, level);
        let data = plain.data_mut();
        data.copy_from_slice(cipher.poly(1));
        polymod::dyadic_product_inplace_p(data, self.secret_key.data_at_level(&self.context, level), degree, moduli);
        polymod::add_inplace_p(data, cipher.poly(0), degree, moduli);
        plain
    }

}
