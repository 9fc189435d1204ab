use std::sync::Arc;

use crate::{
    Plaintext,
    ParmsID,
    Ciphertext,
    util::{polymod, rlwe},
    context::HeContext,
};

/// Struct to store a secret key (or, in the multiparty setting, one party's
/// additive share of the collective secret key).
///
/// Internally and mathematically the secret key is a [Plaintext] object, held
/// in NTT form at the top level of the modulus chain.
///
/// - See [KeyGenerator] for the class that generates the secret key.
/// - See [PublicKey] for the class that stores the public key.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SecretKey {
    sk: Plaintext
}

impl SecretKey {

    /// Create a new secret key from a [Plaintext] object.
    pub fn new(sk: Plaintext) -> Self {
        Self {sk}
    }

    /// The [ParmsID] of the secret key.
    pub fn parms_id(&self) -> &ParmsID {
        self.sk.parms_id()
    }

    /// The inner [Plaintext] object.
    pub fn as_plaintext(&self) -> &Plaintext {
        &self.sk
    }

    /// The data of the secret key.
    pub fn data(&self) -> &[u64] {
        self.sk.data()
    }

    /// The key restricted to the primes of a lower level.
    pub fn data_at_level(&self, context: &HeContext, level: usize) -> &[u64] {
        &self.sk.data()[..context.context_data(level).poly_len()]
    }

    /// Sum of secret keys. Summing every party's share yields the collective key.
    pub fn add(&self, other: &SecretKey, context: &HeContext) -> SecretKey {
        let context_data = context.top_context_data();
        let mut sum = self.sk.clone();
        polymod::add_inplace_p(sum.data_mut(), other.data(),
            context_data.poly_modulus_degree(), context_data.coeff_modulus());
        SecretKey::new(sum)
    }

}

/// Struct to store a public key `(p0, p1) = (-a * s + e, a)`.
///
/// Internally a public key is a [Ciphertext] object encrypting zero.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PublicKey {
    pk: Ciphertext
}

impl PublicKey {

    /// Create a new public key from a [Ciphertext] object.
    pub fn new(pk: Ciphertext) -> Self {
        Self {pk}
    }

    /// Assemble the collective public key from the aggregated `p0` and the
    /// common reference polynomial `a`.
    pub fn from_parts(context: &HeContext, p0: &[u64], crp: &[u64]) -> Self {
        let mut pk = Ciphertext::zeros(context, context.max_level());
        pk.poly_mut(0).copy_from_slice(p0);
        pk.poly_mut(1).copy_from_slice(crp);
        Self {pk}
    }

    /// The [ParmsID] of the public key.
    pub fn parms_id(&self) -> &ParmsID {
        self.pk.parms_id()
    }

    /// The inner [Ciphertext] object.
    pub fn as_ciphertext(&self) -> &Ciphertext {
        &self.pk
    }

}

/// Generates secret key shares and the matching public key shares.
pub struct KeyGenerator {
    context: Arc<HeContext>,
    secret_key: SecretKey,
}

impl KeyGenerator {

    /// Creates a KeyGenerator initialized with a fresh ternary secret key.
    pub fn new(context: Arc<HeContext>) -> Self {
        let context_data = context.top_context_data().clone();
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();
        let mut sk = Plaintext::zeros(&context, context.max_level());
        let mut rng = context.create_random_generator();
        rlwe::sample::ternary(&mut rng, degree, moduli, sk.data_mut());
        polymod::ntt_p(sk.data_mut(), degree, context_data.small_ntt_tables());
        Self { context, secret_key: SecretKey::new(sk) }
    }

    /// Creates a KeyGenerator from an existing secret key.
    pub fn from_sk(context: Arc<HeContext>, secret_key: SecretKey) -> Self {
        Self { context, secret_key }
    }

    /// The secret key (share).
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// `-a * s + e` for the common reference polynomial `a` (NTT form, top level).
    pub fn public_key_share(&self, crp: &[u64]) -> Vec<u64> {
        let context_data = self.context.top_context_data();
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();
        let mut p0 = crp.to_vec();
        polymod::dyadic_product_inplace_p(&mut p0, self.secret_key.data(), degree, moduli);
        polymod::negate_inplace_p(&mut p0, degree, moduli);
        let mut noise = vec![0; context_data.poly_len()];
        let mut rng = self.context.create_random_generator();
        rlwe::sample::gaussian(&mut rng, rlwe::sample::NOISE_STANDARD_DEVIATION, degree, moduli, &mut noise);
        polymod::ntt_p(&mut noise, degree, context_data.small_ntt_tables());
        polymod::add_inplace_p(&mut p0, &noise, degree, moduli);
        p0
    }

    /// A single-party public key `(-a * s + e, a)`.
    pub fn create_public_key(&self) -> PublicKey {
        let context_data = self.context.top_context_data();
        let mut crp = vec![0; context_data.poly_len()];
        let mut rng = self.context.create_random_generator();
        rlwe::sample::uniform(&mut rng, context_data.poly_modulus_degree(), context_data.coeff_modulus(), &mut crp);
        let p0 = self.public_key_share(&crp);
        PublicKey::from_parts(&self.context, &p0, &crp)
    }

}
