use std::collections::BTreeMap;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::Arc;

use crate::{
    util::{polymod, rlwe},
    Ciphertext, HeContext, KeyGenerator, PolynomialSerializer, PublicKey, SecretKey,
};

/// One key holder of the collective key.
pub struct Participant {
    context: Arc<HeContext>,
    key_generator: KeyGenerator,
    pub participant_id: usize,
}

/// Sums one RNS polynomial per contributor.
///
/// The aggregator starts from its own polynomial, receives the others in any
/// order with [PolynomialAggregation::receive] and adds them up in
/// [PolynomialAggregation::finish]. Contributors send with
/// [PolynomialAggregation::send].
pub struct PolynomialAggregation<'a> {
    context: &'a HeContext,
    level: usize,
    broadcasted: BTreeMap<usize, Option<Vec<u64>>>,
    result: Vec<u64>,
}

impl Participant {

    /// A participant with a fresh ternary key share.
    pub fn new(context: Arc<HeContext>, participant_id: usize) -> Self {
        let key_generator = KeyGenerator::new(context.clone());
        Self { context, key_generator, participant_id }
    }

    pub fn from_secret_key(context: Arc<HeContext>, participant_id: usize, secret_key: SecretKey) -> Self {
        let key_generator = KeyGenerator::from_sk(context.clone(), secret_key);
        Self { context, key_generator, participant_id }
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    pub fn secret_key(&self) -> &SecretKey {
        self.key_generator.secret_key()
    }

    /// Start aggregating `p0 = Σ (-a * s_i + e_i)` for the common reference
    /// polynomial `crp`. `others` lists the ids expected to contribute.
    pub fn generate_public_key<I>(&self, crp: &[u64], others: I) -> PolynomialAggregation<'_>
    where
        I: IntoIterator<Item = usize>,
    {
        let share = self.key_generator.public_key_share(crp);
        PolynomialAggregation::new(&self.context, self.context.max_level(), share, others)
    }

    /// Assemble the collective key once `p0` is known.
    pub fn public_key(&self, p0: &[u64], crp: &[u64]) -> PublicKey {
        PublicKey::from_parts(&self.context, p0, crp)
    }

    /// `s_i * c1 + mask + e_i` at the level of `cipher`, in NTT form.
    ///
    /// `mask` must already be in NTT form at that level. Summing the shares of
    /// every key holder and adding `c0` yields `m + Σ mask + noise`.
    pub fn decryption_share(&self, cipher: &Ciphertext, mask: &[u64], noise_sigma: f64) -> Vec<u64> {
        let level = cipher.level();
        let context_data = self.context.context_data(level);
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();

        let mut share = self.secret_key().data_at_level(&self.context, level).to_vec();
        polymod::dyadic_product_inplace_p(&mut share, cipher.poly(1), degree, moduli);
        polymod::add_inplace_p(&mut share, mask, degree, moduli);

        let mut noise = vec![0; share.len()];
        let mut rng = self.context.create_random_generator();
        rlwe::sample::gaussian(&mut rng, noise_sigma, degree, moduli, &mut noise);
        polymod::ntt_p(&mut noise, degree, context_data.small_ntt_tables());
        polymod::add_inplace_p(&mut share, &noise, degree, moduli);
        share
    }

}

impl<'a> PolynomialAggregation<'a> {

    pub fn new<I>(context: &'a HeContext, level: usize, own: Vec<u64>, others: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        assert_eq!(own.len(), context.context_data(level).poly_len(),
            "[Invalid argument] Polynomial does not match its level.");
        Self {
            context,
            level,
            broadcasted: others.into_iter().map(|id| (id, None)).collect(),
            result: own,
        }
    }

    pub fn receive<T: Read>(&mut self, sender_id: usize, stream: &mut T) -> Result<()> {
        let (polynomial, level) = PolynomialSerializer::deserialize_polynomial(self.context, stream)?;
        if level != self.level {
            return Err(Error::new(ErrorKind::InvalidData, "Polynomial at an unexpected level"));
        }
        match self.broadcasted.get_mut(&sender_id) {
            None => Err(Error::new(ErrorKind::InvalidData, "Polynomial from unexpected sender")),
            Some(slot) if slot.is_some() => Err(Error::new(ErrorKind::InvalidData, "Duplicate polynomial from sender")),
            Some(slot) => {
                *slot = Some(polynomial);
                Ok(())
            }
        }
    }

    pub fn send<T: Write>(&self, stream: &mut T) -> Result<()> {
        let parms_id = *self.context.context_data(self.level).parms_id();
        PolynomialSerializer::serialize_polynomial(self.context, stream, &self.result, parms_id)?;
        Ok(())
    }

    pub fn finish(mut self) -> Vec<u64> {
        let context_data = self.context.context_data(self.level);
        let degree = context_data.poly_modulus_degree();
        let moduli = context_data.coeff_modulus();
        for (id, polynomial) in &self.broadcasted {
            match polynomial {
                Some(p) => polymod::add_inplace_p(&mut self.result, p, degree, moduli),
                None => panic!("[Logic error] Participant {} has not sent its polynomial.", id),
            }
        }
        self.result
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HeConfig, ring::{RingElement, Z2k}, Decryptor, EncryptionParameters, Encryptor,
        FixedPointEncoder,
    };

    type R = Z2k<62>;

    fn setup() -> (Arc<HeContext>, Vec<Participant>, PublicKey) {
        let config = HeConfig { poly_modulus_degree: 256, coeff_modulus_bits: vec![55, 55, 55], scale_bits: 50 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let parties: Vec<Participant> = (1..=3).map(|id| Participant::new(context.clone(), id)).collect();

        let top = context.top_context_data().clone();
        let mut crp = vec![0; top.poly_len()];
        let mut rng = context.create_random_generator();
        rlwe::sample::uniform(&mut rng, top.poly_modulus_degree(), top.coeff_modulus(), &mut crp);

        // party 1 aggregates
        let mut protocol1 = parties[0].generate_public_key(&crp, [2, 3]);
        for sender in &parties[1..] {
            let mut msg = Vec::new();
            sender.generate_public_key(&crp, []).send(&mut msg).unwrap();
            protocol1.receive(sender.participant_id, &mut msg.as_slice()).unwrap();
        }
        let p0 = protocol1.finish();
        let public_key = parties[0].public_key(&p0, &crp);
        (context, parties, public_key)
    }

    #[test]
    fn test_gen_public_key() {
        let (context, parties, public_key) = setup();
        let secret_key = parties[1..].iter()
            .fold(parties[0].secret_key().clone(), |acc, p| acc.add(p.secret_key(), &context));
        let encoder = FixedPointEncoder::new(context.clone(), 20);
        let values: Vec<R> = [1.0, 3.0, 5.0, -7.0].iter().map(|&v| R::from_f64(v, 20)).collect();
        let cipher = Encryptor::new(context.clone(), public_key).encrypt(&encoder.encode(&values, 2));
        let decoded: Vec<R> = encoder.decode(&Decryptor::new(context, secret_key).decrypt(&cipher));
        assert_eq!(&decoded[..4], &values[..]);
    }

    #[test]
    fn test_decrypt() {
        let (context, parties, public_key) = setup();
        let encoder = FixedPointEncoder::new(context.clone(), 20);
        let values: Vec<R> = [0.5, -1.25, 3.0, 0.0].iter().map(|&v| R::from_f64(v, 20)).collect();
        let cipher = Encryptor::new(context.clone(), public_key).encrypt(&encoder.encode(&values, 1));

        let zero_mask = vec![0; context.context_data(1).poly_len()];
        let own = parties[0].decryption_share(&cipher, &zero_mask, rlwe::sample::NOISE_STANDARD_DEVIATION);
        let mut protocol = PolynomialAggregation::new(&context, 1, own, [2, 3]);
        for sender in &parties[1..] {
            let share = sender.decryption_share(&cipher, &zero_mask, rlwe::sample::NOISE_STANDARD_DEVIATION);
            let mut msg = Vec::new();
            PolynomialAggregation::new(&context, 1, share, []).send(&mut msg).unwrap();
            protocol.receive(sender.participant_id, &mut msg.as_slice()).unwrap();
        }
        let mut plain = crate::Plaintext::zeros(&context, 1);
        plain.data_mut().copy_from_slice(&protocol.finish());
        let degree = context.poly_modulus_degree();
        polymod::add_inplace_p(plain.data_mut(), cipher.poly(0), degree, context.context_data(1).coeff_modulus());
        let decoded: Vec<R> = encoder.decode(&plain);
        assert_eq!(&decoded[..4], &values[..]);
    }

    #[test]
    fn test_unexpected_sender_rejected() {
        let (context, _, _) = setup();
        let len = context.top_context_data().poly_len();
        let mut protocol = PolynomialAggregation::new(&context, 2, vec![0; len], [2]);
        let mut msg = Vec::new();
        PolynomialAggregation::new(&context, 2, vec![1; len], []).send(&mut msg).unwrap();
        assert!(protocol.receive(3, &mut msg.as_slice()).is_err());
        protocol.receive(2, &mut msg.as_slice()).unwrap();
        assert!(protocol.receive(2, &mut msg.as_slice()).is_err());
        assert_eq!(protocol.finish(), vec![1; len]);
    }
}
