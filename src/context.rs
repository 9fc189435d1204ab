use std::collections::HashMap;
use std::sync::Arc;

use num_bigint::BigUint;

use crate::{
    error::{MpcError, Result},
    util::{BlakeRNG, BlakeRNGFactory, NTTTables},
    EncryptionParameters, Modulus, ParmsID,
};

/// Precomputation for one level of the modulus chain.
///
/// Level `l` uses the first `l + 1` primes of the chain. Besides the NTT
/// tables, each level keeps what is needed to lift an RNS coefficient back to
/// an integer modulo `Q_l`: the total modulus and the CRT basis
/// `(Q_l / q_i) * ((Q_l / q_i)^{-1} mod q_i)`.
#[derive(Debug)]
pub struct ContextData {
    level: usize,
    parms: EncryptionParameters,
    ntt_tables: Vec<NTTTables>,
    total_coeff_modulus: BigUint,
    crt_basis: Vec<BigUint>,
}

impl ContextData {

    fn new(parms: EncryptionParameters, level: usize) -> Result<Self> {
        let degree = parms.poly_modulus_degree();
        let coeff_count_power = degree.trailing_zeros() as usize;
        let ntt_tables = NTTTables::create_ntt_tables(coeff_count_power, parms.coeff_modulus())
            .map_err(MpcError::Parameters)?;
        let total_coeff_modulus: BigUint = parms.coeff_modulus().iter()
            .map(|q| BigUint::from(q.value()))
            .product();
        let mut crt_basis = Vec::with_capacity(parms.coeff_modulus().len());
        for q in parms.coeff_modulus() {
            let punctured = &total_coeff_modulus / q.value();
            let residue = (&punctured % q.value()).iter_u64_digits().next().unwrap_or(0);
            let inverse = q.inverse(residue)
                .ok_or_else(|| MpcError::Parameters("coefficient moduli are not coprime".into()))?;
            crt_basis.push(punctured * inverse);
        }
        Ok(Self { level, parms, ntt_tables, total_coeff_modulus, crt_basis })
    }

    pub fn level(&self) -> usize {self.level}
    pub fn parms(&self) -> &EncryptionParameters {&self.parms}
    pub fn parms_id(&self) -> &ParmsID {self.parms.parms_id()}
    pub fn coeff_modulus(&self) -> &[Modulus] {self.parms.coeff_modulus()}
    pub fn poly_modulus_degree(&self) -> usize {self.parms.poly_modulus_degree()}
    pub fn small_ntt_tables(&self) -> &[NTTTables] {&self.ntt_tables}
    pub fn total_coeff_modulus(&self) -> &BigUint {&self.total_coeff_modulus}
    pub fn crt_basis(&self) -> &[BigUint] {&self.crt_basis}

    /// Word count of one polynomial at this level.
    pub fn poly_len(&self) -> usize {
        self.poly_modulus_degree() * self.coeff_modulus().len()
    }

}

/// Encryption parameters together with the precomputation of every level.
///
/// Levels are indexed from `0` (a single prime) up to [HeContext::max_level]
/// (the full chain). Fresh encryptions live at the top level; dropping primes
/// moves a ciphertext down.
pub struct HeContext {
    levels: Vec<Arc<ContextData>>,
    level_by_parms_id: HashMap<ParmsID, usize>,
    random_generator_factory: BlakeRNGFactory,
}

impl HeContext {

    /// Create [HeContext] with the given parameters.
    pub fn new(parms: EncryptionParameters) -> Result<Arc<Self>> {
        let moduli_count = parms.coeff_modulus().len();
        if moduli_count == 0 {
            return Err(MpcError::Parameters("coefficient modulus is empty".into()));
        }
        if !parms.poly_modulus_degree().is_power_of_two() || parms.poly_modulus_degree() < 2 {
            return Err(MpcError::Parameters("poly modulus degree must be a power of two".into()));
        }
        let mut levels = Vec::with_capacity(moduli_count);
        let mut level_by_parms_id = HashMap::new();
        for level in 0..moduli_count {
            let data = ContextData::new(parms.truncated(level + 1), level)?;
            level_by_parms_id.insert(*data.parms_id(), level);
            levels.push(Arc::new(data));
        }
        Ok(Arc::new(HeContext {
            levels,
            level_by_parms_id,
            random_generator_factory: BlakeRNGFactory::new(),
        }))
    }

    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn context_data(&self, level: usize) -> &Arc<ContextData> {
        match self.levels.get(level) {
            Some(data) => data,
            None => panic!("[Invalid argument] Level {} exceeds the modulus chain.", level),
        }
    }

    pub fn top_context_data(&self) -> &Arc<ContextData> {
        self.context_data(self.max_level())
    }

    /// Get the level of the specified [ParmsID].
    pub fn level_of(&self, parms_id: &ParmsID) -> Option<usize> {
        self.level_by_parms_id.get(parms_id).copied()
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.levels[0].poly_modulus_degree()
    }

    /// Values carried by one ciphertext.
    pub fn slot_count(&self) -> usize {
        self.poly_modulus_degree()
    }

    pub fn scale_bits(&self) -> u32 {
        self.levels[0].parms().scale_bits()
    }

    /// Get a [BlakeRNG] random generator seeded from entropy.
    pub(crate) fn create_random_generator(&self) -> BlakeRNG {
        self.random_generator_factory.get_rng()
    }

}
