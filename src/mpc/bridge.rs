//! Moving values between additive shares and collective ciphertexts.
//!
//! The workers hold shares of a secret key `s = Σ s_i` and the matching
//! collective public key, both produced by [Mpc::setup_mhe]. The dealer holds
//! no key and only keeps its streams in step.
//!
//! Shares to ciphertext: every worker hides its share behind a small centered
//! mask, the masked value is opened, and each worker encrypts an integer
//! partial (the hub the opened value plus its own mask, the others their
//! masks). The partials sum to the secret over the integers as long as the
//! masks stay below [mask_bound], so the hub can add the ciphertexts.
//!
//! Ciphertext to shares: every worker publishes `s_i * c1 + mask_i + e_i`,
//! the hub adds them to `c0` and decodes `m + Σ mask_i`; subtracting the
//! decoded masks leaves each worker with a share of `m`.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::RngCore;
use tracing::debug;

use crate::{
    error::{MpcError, Result},
    multiparty::{Participant, PolynomialAggregation},
    ring::{IntegerRing, RMat, RingElement},
    util::{polymod, rlwe},
    CipherMatrix, CipherVector, Ciphertext, Encryptor, Evaluator, FixedPointEncoder, HeContext,
    Plaintext, PublicKey,
};

use super::Mpc;

/// Largest magnitude (exclusive) of a bridge mask for a modulus `modulus`
/// shared among `party_count` parties: `modulus / (4 * (party_count - 1))`.
///
/// Up to `party_count - 1` such masks sum to less than a quarter of the
/// modulus, which leaves the other quarter of the centered range to the data.
pub fn mask_bound(modulus: &BigUint, party_count: usize) -> BigUint {
    assert!(party_count > 1, "[Invalid argument] Masks need at least two parties.");
    modulus / BigUint::from(4 * (party_count as u64 - 1))
}

/// Uniform integer in `(-bound, bound)`.
pub fn sample_centered<R: RngCore + ?Sized>(rng: &mut R, bound: &BigUint) -> BigInt {
    let high = BigInt::from(bound.clone());
    let low = BigInt::one() - &high;
    if low >= high {
        return BigInt::default();
    }
    rng.gen_bigint_range(&low, &high)
}

/// Fail unless values of magnitude `data` plus `masks` stay below half of
/// `modulus`, where they decode without wrapping.
fn check_capacity(what: &str, data: BigUint, masks: BigUint, modulus: &BigUint) -> Result<()> {
    if (data + masks) << 1u32 >= *modulus {
        return Err(MpcError::Parameters(format!(
            "{}: a {}-bit ciphertext modulus cannot hold the ring and its masks",
            what, modulus.bits())));
    }
    Ok(())
}

/// Per-party state of the multiparty HE scheme.
pub struct MheState {
    context: Arc<HeContext>,
    encoder: FixedPointEncoder,
    evaluator: Evaluator,
    keys: Option<(Participant, Encryptor)>,
}

impl MheState {

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    pub fn encoder(&self) -> &FixedPointEncoder {
        &self.encoder
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// This worker's key holder. `None` on the dealer.
    pub fn participant(&self) -> Option<&Participant> {
        self.keys.as_ref().map(|(p, _)| p)
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.keys.as_ref().map(|(_, e)| e.public_key())
    }

    fn encryptor(&self) -> Result<&Encryptor> {
        self.keys.as_ref().map(|(_, e)| e).ok_or(MpcError::MissingKeys)
    }

}

/// Ciphertexts needed for a row of `cols` values.
fn ciphers_per_row(cols: usize, slots: usize) -> usize {
    (cols + slots - 1) / slots
}

impl Mpc {

    pub fn mhe(&self) -> Option<&MheState> {
        self.mhe.as_ref()
    }

    fn mhe_state(&self) -> Result<&MheState> {
        self.mhe.as_ref().ok_or(MpcError::MissingKeys)
    }

    /// Generate the collective keys.
    ///
    /// Every worker samples its key share; the common reference polynomial
    /// comes from the stream shared by all parties. The hub sums the public
    /// key shares and sends the result back to the other workers.
    pub fn setup_mhe(&mut self, context: Arc<HeContext>) -> Result<()> {
        let top = context.top_context_data().clone();
        let mut crp = vec![0; top.poly_len()];
        self.rand.with_common(|r| {
            rlwe::sample::uniform(r, top.poly_modulus_degree(), top.coeff_modulus(), &mut crp)
        });

        let keys = if self.is_dealer() {
            None
        } else {
            let (pid, hub) = (self.pid(), self.hub_pid());
            let participant = Participant::new(context.clone(), pid);
            let others: Vec<usize> = self.worker_ids().filter(|&j| j != hub).collect();
            let p0 = if pid == hub {
                let mut aggregation = participant.generate_public_key(&crp, others.iter().copied());
                for &from in &others {
                    let payload = self.network.receive_poly_bytes(from)?;
                    aggregation.receive(from, &mut payload.as_slice())
                        .map_err(|e| MpcError::codec("public key share", e.to_string()))?;
                }
                let p0 = aggregation.finish();
                for &to in &others {
                    self.network.send_poly(to, &context, &p0, *top.parms_id())?;
                }
                p0
            } else {
                let mut payload = Vec::new();
                participant.generate_public_key(&crp, []).send(&mut payload)?;
                self.network.send_framed(hub, &payload)?;
                let (p0, _) = self.network.receive_poly(hub, &context)?;
                p0
            };
            let public_key = participant.public_key(&p0, &crp);
            let encryptor = Encryptor::new(context.clone(), public_key);
            Some((participant, encryptor))
        };
        debug!("party {} finished key generation", self.pid());

        self.mhe = Some(MheState {
            encoder: FixedPointEncoder::new(context.clone(), self.frac_bits()),
            evaluator: Evaluator::new(context.clone()),
            context,
            keys,
        });
        Ok(())
    }

    /// Encrypt the shared matrix `x` under the collective key.
    ///
    /// Each row becomes `ceil(cols / slot_count)` ciphertexts at the top
    /// level. Every worker returns the same aggregated matrix; the dealer
    /// returns an empty one. Entries of `x` must lie within a quarter of the
    /// ring modulus around zero, and the top-level modulus must hold the
    /// shifted ring with its masks, or [MpcError::Parameters] is returned.
    pub fn ss_to_cipher_mat<T: IntegerRing>(&mut self, x: &RMat<T>) -> Result<CipherMatrix> {
        if self.is_dealer() {
            return Ok(Vec::new());
        }
        let mhe = self.mhe_state()?;
        mhe.encryptor()?;
        let modulus = T::modulus();
        let bound = mask_bound(&modulus, self.party_count());
        let masks = &bound * BigUint::from(self.party_count() as u64 - 1);
        let top = mhe.context.context_data(mhe.context.max_level());
        check_capacity("shares to ciphertext", ((&modulus >> 1u32) + masks) << mhe.encoder.shift(),
            BigUint::zero(), top.total_coeff_modulus())?;

        let (rows, cols) = x.dims();
        let mask = RMat::from_data(rows, cols,
            (0..rows * cols).map(|_| T::from_bigint(&sample_centered(&mut self.rand, &bound))).collect());
        self.encrypt_masked(x, mask)
    }

    /// Open `x - mask`, encrypt this worker's integer partial and aggregate.
    fn encrypt_masked<T: IntegerRing>(&mut self, x: &RMat<T>, mask: RMat<T>) -> Result<CipherMatrix> {
        let rows = x.rows();
        let mut masked = x.clone();
        masked.sub_assign(&mask);
        let opened = self.reveal_sym_mat(&masked)?;
        let partial = if self.pid() == self.hub_pid() {
            let mut partial = opened;
            partial.add_assign(&mask);
            partial
        } else {
            mask
        };

        let mhe = self.mhe_state()?;
        let (context, encoder) = (&mhe.context, &mhe.encoder);
        let encryptor = mhe.encryptor()?;
        let slots = encoder.slot_count();
        let level = context.max_level();
        let ciphers: CipherMatrix = (0..rows).map(|i| {
            partial.row(i).chunks(slots)
                .map(|chunk| encryptor.encrypt(&encoder.encode(chunk, level)))
                .collect()
        }).collect();
        self.aggregate_ciphers(ciphers)
    }

    /// Sum every worker's matrix at the hub and hand the sum back.
    fn aggregate_ciphers(&self, mut ciphers: CipherMatrix) -> Result<CipherMatrix> {
        let mhe = self.mhe_state()?;
        let context = &mhe.context;
        let hub = self.hub_pid();
        if self.pid() != hub {
            self.network.send_cipher_matrix(hub, &ciphers, context)?;
            return self.network.receive_cipher_matrix(hub, context);
        }
        let others: Vec<usize> = self.worker_ids().filter(|&j| j != hub).collect();
        for &from in &others {
            let received = self.network.receive_cipher_matrix(from, context)?;
            let same_shape = received.len() == ciphers.len()
                && received.iter().zip(&ciphers).all(|(a, b)| a.len() == b.len());
            if !same_shape {
                return Err(MpcError::codec("cipher matrix", format!("party {} sent a matrix of another shape", from)));
            }
            for (row, other) in ciphers.iter_mut().zip(&received) {
                for (cipher, contribution) in row.iter_mut().zip(other) {
                    mhe.evaluator.add_inplace(cipher, contribution);
                }
            }
        }
        for &to in &others {
            self.network.send_cipher_matrix(to, &ciphers, context)?;
        }
        Ok(ciphers)
    }

    /// Encrypt a shared vector. The dealer gets an empty vector.
    pub fn ss_to_cipher_vec<T: IntegerRing>(&mut self, x: &[T]) -> Result<CipherVector> {
        if x.is_empty() {
            panic!("[Invalid argument] Cannot encrypt an empty vector.");
        }
        Ok(self.ss_to_cipher_mat(&RMat::row_vector(x.to_vec()))?.pop().unwrap_or_default())
    }

    /// Encrypt between one and `slot_count` shared values into one
    /// ciphertext. The dealer gets an empty ciphertext.
    pub fn ss_to_ciphertext<T: IntegerRing>(&mut self, x: &[T]) -> Result<Ciphertext> {
        let slots = self.mhe_state()?.encoder.slot_count();
        if x.is_empty() || x.len() > slots {
            panic!("[Invalid argument] One ciphertext holds 1 to {} values, got {}.", slots, x.len());
        }
        let mut cv = self.ss_to_cipher_vec(x)?;
        Ok(cv.pop().unwrap_or_default())
    }

    /// Turn an encrypted `rows` by `cols` matrix into worker shares.
    ///
    /// With `source_pid == 0` every worker must pass the same matrix. With a
    /// worker as `source_pid` only that worker's matrix is used and it is
    /// broadcast to the others first. The dealer returns zeros.
    pub fn cipher_mat_to_ss<T: IntegerRing>(
        &mut self,
        cm: &CipherMatrix,
        source_pid: usize,
        rows: usize,
        cols: usize,
    ) -> Result<RMat<T>> {
        if self.is_dealer() {
            return Ok(RMat::zeros(rows, cols));
        }
        if source_pid >= self.party_count() {
            panic!("[Invalid argument] Source party {} does not exist.", source_pid);
        }
        let pid = self.pid();
        let context = self.mhe_state()?.context.clone();
        let mut cm = if source_pid == 0 {
            cm.clone()
        } else if pid == source_pid {
            for to in self.worker_ids().filter(|&j| j != pid) {
                self.network.send_cipher_matrix(to, cm, &context)?;
            }
            cm.clone()
        } else {
            self.network.receive_cipher_matrix(source_pid, &context)?
        };
        if cm.len() != rows {
            panic!("[Invalid argument] Expected {} ciphertext rows, got {}.", rows, cm.len());
        }

        let mhe = self.mhe.as_ref().ok_or(MpcError::MissingKeys)?;
        let per_row = ciphers_per_row(cols, mhe.encoder.slot_count());
        if let Some(row) = cm.iter().find(|row| row.len() != per_row) {
            panic!("[Invalid argument] Expected {} ciphertexts per row, got {}.", per_row, row.len());
        }
        let participant = mhe.participant().ok_or(MpcError::MissingKeys)?;
        let level = mhe.evaluator.flatten_levels(&mut cm);
        let context_data = context.context_data(level).clone();
        let degree = context_data.poly_modulus_degree();
        let bound = mask_bound(context_data.total_coeff_modulus(), self.party_count());
        check_capacity("ciphertext to shares", (T::modulus() >> 1u32) << mhe.encoder.shift(),
            &bound * BigUint::from(self.party_count() as u64 - 1), context_data.total_coeff_modulus())?;
        let sigma = self.config.share_noise_sigma;

        // one mask and one decryption share per ciphertext
        let mut masks: Vec<Vec<Plaintext>> = Vec::with_capacity(rows);
        let mut shares: Vec<Vec<Vec<u64>>> = Vec::with_capacity(rows);
        for row in &cm {
            let mut mask_row = Vec::with_capacity(row.len());
            let mut share_row = Vec::with_capacity(row.len());
            for cipher in row {
                let coefficients: Vec<BigInt> = (0..degree)
                    .map(|_| sample_centered(&mut self.rand, &bound))
                    .collect();
                let mask = mhe.encoder.encode_integers(&coefficients, level);
                share_row.push(participant.decryption_share(cipher, mask.data(), sigma));
                mask_row.push(mask);
            }
            masks.push(mask_row);
            shares.push(share_row);
        }

        let hub = self.hub_pid();
        let parms_id = *context_data.parms_id();
        let mut out = RMat::zeros(rows, cols);
        if pid != hub {
            for share in shares.iter().flatten() {
                self.network.send_poly(hub, &context, share, parms_id)?;
            }
        } else {
            let others: Vec<usize> = self.worker_ids().filter(|&j| j != hub).collect();
            let mut aggregations: Vec<PolynomialAggregation<'_>> = shares.into_iter().flatten()
                .map(|own| PolynomialAggregation::new(&context, level, own, others.iter().copied()))
                .collect();
            for &from in &others {
                for aggregation in aggregations.iter_mut() {
                    let payload = self.network.receive_poly_bytes(from)?;
                    aggregation.receive(from, &mut payload.as_slice())
                        .map_err(|e| MpcError::codec("decryption share", e.to_string()))?;
                }
            }
            let mut summed = aggregations.into_iter().map(PolynomialAggregation::finish);
            for (i, row) in cm.iter().enumerate() {
                for (j, cipher) in row.iter().enumerate() {
                    let Some(share_sum) = summed.next() else { break };
                    let mut plain = Plaintext::zeros(&context, level);
                    plain.data_mut().copy_from_slice(cipher.poly(0));
                    polymod::add_inplace_p(plain.data_mut(), &share_sum, degree, context_data.coeff_modulus());
                    let values: Vec<T> = mhe.encoder.decode(&plain);
                    let start = j * degree;
                    for (k, v) in values.into_iter().take(cols.saturating_sub(start)).enumerate() {
                        out.set(i, start + k, v);
                    }
                }
            }
        }

        for (i, mask_row) in masks.iter().enumerate() {
            for (j, mask) in mask_row.iter().enumerate() {
                let values: Vec<T> = mhe.encoder.decode(mask);
                let start = j * degree;
                for (k, v) in values.into_iter().take(cols.saturating_sub(start)).enumerate() {
                    let current = out.get(i, start + k).clone();
                    out.set(i, start + k, current - v);
                }
            }
        }
        Ok(out)
    }

    pub fn cipher_vec_to_ss<T: IntegerRing>(&mut self, cv: &CipherVector, source_pid: usize, len: usize) -> Result<Vec<T>> {
        let cm = vec![cv.clone()];
        Ok(self.cipher_mat_to_ss(&cm, source_pid, 1, len)?.into_data())
    }

    /// Shares of the first `len` slots of one ciphertext. When `source_pid`
    /// is a worker, the dealer and the other workers may pass `None`; with
    /// `source_pid == 0` every worker must pass the ciphertext.
    pub fn ciphertext_to_ss<T: IntegerRing>(&mut self, cipher: Option<&Ciphertext>, source_pid: usize, len: usize) -> Result<Vec<T>> {
        if self.is_dealer() {
            return Ok(vec![T::zero(); len]);
        }
        let cv: CipherVector = match cipher {
            Some(c) => vec![c.clone()],
            None if source_pid == 0 => {
                panic!("[Invalid argument] Party {} has no ciphertext and no source party is named.", self.pid())
            }
            None if source_pid == self.pid() => {
                panic!("[Invalid argument] Source party {} has no ciphertext to send.", source_pid)
            }
            None => Vec::new(),
        };
        self.cipher_vec_to_ss(&cv, source_pid, len)
    }

}

#[cfg(test)]
mod tests {
    use num_bigint::{BigInt, BigUint};
    use num_integer::Integer;
    use num_traits::{One, Signed, Zero};
    use rand::SeedableRng;

    use super::*;
    use crate::{
        config::{HeConfig, ProtocolConfig},
        ring::{vec_from_f64, vec_to_f64, RMat, Z2k},
        simulation::{open, open_mat, run_in_process, run_with_config, share_among_workers},
        util::{BlakeRNG, PRNGSeed},
        Decryptor, EncryptionParameters,
    };

    type R = Z2k<62>;

    fn context() -> Arc<HeContext> {
        let config = HeConfig { poly_modulus_degree: 512, coeff_modulus_bits: vec![55, 55, 55], scale_bits: 50 };
        HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let values = [0.5, -1.25, 3.0, 0.0, 1024.125, -77.5];
        let encoded: Vec<R> = vec_from_f64(&values, 20);
        let context = context();
        let shares = run_in_process(3, move |mpc| {
            mpc.setup_mhe(context.clone())?;
            let x = share_among_workers(mpc.pid(), mpc.party_count(), &encoded, 17);
            let cv = mpc.ss_to_cipher_vec(&x)?;
            mpc.cipher_vec_to_ss::<R>(&cv, 0, x.len())
        }).unwrap();
        assert!(shares[0].iter().all(|v| v.is_zero()));
        let result = vec_to_f64(&open(&shares), 20);
        for (got, want) in result.iter().zip(values) {
            assert!((got - want).abs() < 1e-4, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_aggregate_decrypts_under_summed_key() {
        let values = [2.5, -0.75, 6.0];
        let encoded: Vec<R> = vec_from_f64(&values, 20);
        let context = context();
        let ctx = context.clone();
        let results = run_in_process(4, move |mpc| {
            mpc.setup_mhe(ctx.clone())?;
            let x = share_among_workers(mpc.pid(), mpc.party_count(), &encoded, 23);
            let cipher = mpc.ss_to_ciphertext(&x)?;
            let key = mpc.mhe().and_then(|m| m.participant()).map(|p| p.secret_key().clone());
            Ok((cipher, key))
        }).unwrap();
        assert!(results[0].1.is_none());
        let keys: Vec<_> = results[1..].iter().map(|(_, k)| k.clone().unwrap()).collect();
        let secret_key = keys[1..].iter().fold(keys[0].clone(), |acc, k| acc.add(k, &context));
        for (cipher, _) in &results[2..] {
            assert_eq!(cipher, &results[1].0);
        }
        let encoder = FixedPointEncoder::new(context.clone(), 20);
        let decoded: Vec<R> = encoder.decode(&Decryptor::new(context, secret_key).decrypt(&results[1].0));
        assert_eq!(vec_to_f64(&decoded[..3], 20), values);
    }

    #[test]
    fn test_matrix_from_single_source() {
        let config = ProtocolConfig { hub_party_id: 2, ..ProtocolConfig::default() };
        let slots = 512;
        let data: Vec<f64> = (0..2 * 600).map(|i| (i as f64 - 600.0) / 8.0).collect();
        let encoded = RMat::<R>::from_f64(2, 600, &data, 20);
        let context = context();
        let shares = run_with_config(&config, &PRNGSeed([1; 64]), move |mpc| {
            mpc.setup_mhe(context.clone())?;
            let x = share_among_workers(mpc.pid(), mpc.party_count(), encoded.data(), 5);
            let cm = mpc.ss_to_cipher_mat(&RMat::from_data(2, 600, x))?;
            if mpc.pid() > 0 {
                assert_eq!(cm.len(), 2);
                assert_eq!(cm[0].len(), ciphers_per_row(600, slots));
            }
            let source = if mpc.pid() == 1 { cm } else { Vec::new() };
            mpc.cipher_mat_to_ss::<R>(&source, 1, 2, 600)
        }).unwrap();
        let result = open_mat(&shares).to_f64(20);
        for (got, want) in result.iter().zip(&data) {
            assert!((got - want).abs() < 1e-4);
        }
    }

    #[test]
    fn test_bridge_requires_keys() {
        let results = run_in_process(3, |mpc| Ok(mpc.ss_to_cipher_vec(&[R::one()]).err())).unwrap();
        assert!(results[0].is_none());
        assert!(matches!(results[1], Some(MpcError::MissingKeys)));
    }

    /// The integer sum of the encoded partials of one value: the hub's
    /// centered partial plus the masks of the other workers.
    fn integer_sum(x: R, others: &[BigInt]) -> BigInt {
        let hub_partial = others.iter().fold(x, |acc, m| acc - R::from_bigint(m));
        others.iter().fold(hub_partial.to_bigint(), |acc, m| acc + m)
    }

    #[test]
    fn test_masks_within_bound_sum_exactly() {
        let modulus = R::modulus();
        let mut rng = BlakeRNG::seed_from_u64(99);
        for party_count in [3, 4, 6] {
            let bound = mask_bound(&modulus, party_count);
            let data_bound = &modulus >> 2u32;
            for _ in 0..500 {
                let others: Vec<BigInt> = (0..party_count - 2).map(|_| sample_centered(&mut rng, &bound)).collect();
                assert!(others.iter().all(|m| m.abs() < BigInt::from(bound.clone())));
                let x = R::from_bigint(&sample_centered(&mut rng, &data_bound));
                assert_eq!(integer_sum(x, &others), x.to_bigint());
            }
        }
    }

    #[test]
    fn test_mask_past_bound_wraps_in_ciphertext() {
        let context = context();
        let ctx = context.clone();
        let modulus = R::modulus();
        let half = BigInt::from(&modulus >> 1u32);
        let bound = BigInt::from(mask_bound(&modulus, 3));
        // centered values of Z2k lie in [-M/2, M/2)
        let x = R::from_bigint(&(&half - &bound));
        let inside = -(&bound - BigInt::one());
        let outside = &inside - BigInt::one();

        let results = run_in_process(3, move |mpc| {
            mpc.setup_mhe(ctx.clone())?;
            let share = share_among_workers(mpc.pid(), mpc.party_count(), &[x], 31);
            let mut ciphers = Vec::new();
            if !mpc.is_dealer() {
                for worker_mask in [&inside, &outside] {
                    // the hub adds no mask of its own
                    let mask = if mpc.pid() == mpc.hub_pid() { R::zero() } else { R::from_bigint(worker_mask) };
                    let cm = mpc.encrypt_masked(&RMat::row_vector(share.clone()), RMat::row_vector(vec![mask]))?;
                    ciphers.push(cm[0][0].clone());
                }
            }
            let key = mpc.mhe().and_then(|m| m.participant()).map(|p| p.secret_key().clone());
            Ok((ciphers, key))
        }).unwrap();

        let keys: Vec<_> = results[1..].iter().map(|(_, k)| k.clone().unwrap()).collect();
        let secret_key = keys[1..].iter().fold(keys[0].clone(), |acc, k| acc.add(k, &context));
        let decryptor = Decryptor::new(context.clone(), secret_key);
        let encoder = FixedPointEncoder::new(context, 20);
        let scale = BigInt::one() << encoder.shift();
        let decrypt = |cipher: &Ciphertext| {
            let coefficient = encoder.decode_integers(&decryptor.decrypt(cipher))[0].clone();
            (coefficient + (&scale >> 1u32)).div_floor(&scale)
        };
        let hub = &results[1].0;
        assert_eq!(decrypt(&hub[0]), x.to_bigint());
        assert_eq!(decrypt(&hub[1]), x.to_bigint() - BigInt::from(modulus));
    }

    #[test]
    fn test_small_modulus_is_rejected() {
        let config = HeConfig { poly_modulus_degree: 512, coeff_modulus_bits: vec![55], scale_bits: 30 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let values: Vec<R> = vec_from_f64(&[0.5, -1.25, 3.0, 0.0], 20);
        let results = run_in_process(3, move |mpc| {
            mpc.setup_mhe(context.clone())?;
            let x = share_among_workers(mpc.pid(), mpc.party_count(), &values, 3);
            let to_cipher = mpc.ss_to_cipher_vec(&x).err();
            let cipher = mpc.mhe_state()?.keys.as_ref()
                .map(|(_, encryptor)| encryptor.encrypt(&Plaintext::zeros(&context, context.max_level())));
            let to_shares = mpc.ciphertext_to_ss::<R>(cipher.as_ref(), 0, 4).err();
            Ok((to_cipher, to_shares))
        }).unwrap();
        assert!(results[0].0.is_none() && results[0].1.is_none());
        for (to_cipher, to_shares) in &results[1..] {
            assert!(matches!(to_cipher, Some(MpcError::Parameters(_))));
            assert!(matches!(to_shares, Some(MpcError::Parameters(_))));
        }
    }

    #[test]
    #[should_panic(expected = "[Invalid argument]")]
    fn test_empty_vector_is_rejected() {
        let context = context();
        let _ = run_in_process(3, move |mpc| {
            mpc.setup_mhe(context.clone())?;
            mpc.ss_to_ciphertext::<R>(&[])
        });
    }

    #[test]
    #[should_panic(expected = "[Invalid argument]")]
    fn test_missing_ciphertext_without_source() {
        let context = context();
        let _ = run_in_process(3, move |mpc| {
            mpc.setup_mhe(context.clone())?;
            mpc.ciphertext_to_ss::<R>(None, 0, 4)
        });
    }

    #[test]
    fn test_single_ciphertext_from_source() {
        let values = [1.5, -2.0, 0.125];
        let encoded: Vec<R> = vec_from_f64(&values, 20);
        let context = context();
        let shares = run_in_process(3, move |mpc| {
            mpc.setup_mhe(context.clone())?;
            let x = share_among_workers(mpc.pid(), mpc.party_count(), &encoded, 8);
            let cipher = mpc.ss_to_ciphertext(&x)?;
            let source = (mpc.pid() == 2).then_some(&cipher);
            mpc.ciphertext_to_ss::<R>(source, 2, 3)
        }).unwrap();
        assert!(shares[0].iter().all(|v| v.is_zero()));
        for (got, want) in vec_to_f64(&open(&shares), 20).iter().zip(values) {
            assert!((got - want).abs() < 1e-4, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_sample_centered_degenerate_bound() {
        let mut rng = BlakeRNG::seed_from_u64(1);
        assert!(sample_centered(&mut rng, &BigUint::zero()).is_zero());
        assert!(sample_centered(&mut rng, &BigUint::one()).is_zero());
    }
}
