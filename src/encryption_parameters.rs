/// A unique identifier for a set (level) of encryption parameters.
pub type ParmsID = crate::util::hash::HashBlock;

/// The default zero ParmsID, never assigned to a valid level.
pub const PARMS_ID_ZERO: ParmsID = crate::util::hash::HASH_ZERO_BLOCK;

use crate::{
    config::HeConfig,
    error::{MpcError, Result},
    modulus::CoeffModulus,
    util, Modulus,
};

/// A set of parameters defining the encryption scheme.
///
/// It includes the polynomial modulus degree, the coefficient moduli chain and
/// the log2 of the fixed-point encoding scale. Dropping the last modulus of the
/// chain gives the parameters of the next lower level; each level is identified
/// by its own [ParmsID], a sha256 hash of its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptionParameters {
    poly_modulus_degree: usize,
    coeff_modulus: Vec<Modulus>,
    scale_bits: u32,
    parms_id: ParmsID,
}

impl Default for EncryptionParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionParameters {

    /// Creates an empty set of encryption parameters.
    pub fn new() -> Self {
        Self {
            poly_modulus_degree: 0,
            coeff_modulus: vec![],
            scale_bits: 0,
            parms_id: PARMS_ID_ZERO,
        }
    }

    /// Builds the parameters described by an [HeConfig], searching the
    /// coefficient primes.
    pub fn from_config(config: &HeConfig) -> Result<Self> {
        let coeff_modulus = CoeffModulus::create(config.poly_modulus_degree, &config.coeff_modulus_bits)?;
        if config.scale_bits == 0 {
            return Err(MpcError::Parameters("scale bits must be positive".into()));
        }
        Ok(Self::new()
            .set_poly_modulus_degree(config.poly_modulus_degree)
            .set_coeff_modulus(&coeff_modulus)
            .set_scale_bits(config.scale_bits))
    }

    /// Degree of the polynomial modulus `x^n + 1`; also the slot count.
    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    pub fn coeff_modulus(&self) -> &[Modulus] {
        &self.coeff_modulus
    }

    pub fn scale_bits(&self) -> u32 {
        self.scale_bits
    }

    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    pub fn set_poly_modulus_degree(mut self, degree: usize) -> Self {
        self.poly_modulus_degree = degree;
        self.compute_parms_id();
        self
    }

    pub fn set_coeff_modulus(mut self, coeff_modulus: &[Modulus]) -> Self {
        self.coeff_modulus = coeff_modulus.to_vec();
        self.compute_parms_id();
        self
    }

    pub fn set_scale_bits(mut self, scale_bits: u32) -> Self {
        self.scale_bits = scale_bits;
        self.compute_parms_id();
        self
    }

    /// Parameters of the level that keeps the first `count` moduli.
    pub fn truncated(&self, count: usize) -> Self {
        assert!(count >= 1 && count <= self.coeff_modulus.len(),
            "[Invalid argument] Cannot keep {} of {} moduli.", count, self.coeff_modulus.len());
        self.clone().set_coeff_modulus(&self.coeff_modulus[..count])
    }

    fn compute_parms_id(&mut self) {
        let mut param_data = Vec::with_capacity(2 + self.coeff_modulus.len());
        param_data.push(self.poly_modulus_degree as u64);
        param_data.push(self.scale_bits as u64);
        param_data.extend(self.coeff_modulus.iter().map(|x| x.value()));
        util::hash::hash(&param_data, &mut self.parms_id);
        // Did we somehow manage to get a zero block as result? This is reserved.
        if self.parms_id == PARMS_ID_ZERO {
            panic!("[Logic error] Parm_id cannot be zero.");
        }
    }

}
