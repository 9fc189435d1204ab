use crate::{context::HeContext, ParmsID, PARMS_ID_ZERO};

/// Struct to store a plaintext element.
///
/// The plaintext polynomial is always stored in NTT form with respect to each
/// of the primes of its level, so the backing array holds
/// `(level + 1) * poly_modulus_degree` words. The [ParmsID] identifies the
/// level.
///
/// See [Ciphertext] for the class that stores ciphertexts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Plaintext {
    level: usize,
    poly_modulus_degree: usize,
    data: Vec<u64>,
    parms_id: ParmsID,
}

impl Default for Plaintext {
    fn default() -> Self {
        Plaintext { level: 0, poly_modulus_degree: 0, data: vec![], parms_id: PARMS_ID_ZERO }
    }
}

impl Plaintext {

    /// Creates a zero plaintext at the given level.
    pub fn zeros(context: &HeContext, level: usize) -> Self {
        let context_data = context.context_data(level);
        Plaintext {
            level,
            poly_modulus_degree: context_data.poly_modulus_degree(),
            data: vec![0; context_data.poly_len()],
            parms_id: *context_data.parms_id(),
        }
    }

    /// The [ParmsID] of the plaintext.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    /// The RNS words, component-major.
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u64] {
        &mut self.data
    }

}

/// Struct to store a ciphertext element.
///
/// A ciphertext holds two polynomials `(c0, c1)` in NTT form at some level of
/// the modulus chain. It decrypts under `s` to `c0 + c1 * s`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ciphertext {
    level: usize,
    poly_modulus_degree: usize,
    coeff_modulus_size: usize,
    data: Vec<u64>,
    parms_id: ParmsID,
}

impl Default for Ciphertext {
    fn default() -> Self {
        Ciphertext { level: 0, poly_modulus_degree: 0, coeff_modulus_size: 0, data: vec![], parms_id: PARMS_ID_ZERO }
    }
}

/// A row of plaintexts.
pub type PlainVector = Vec<Plaintext>;
/// Rows of plaintexts.
pub type PlainMatrix = Vec<PlainVector>;
/// A row of ciphertexts, each carrying up to `slot_count` values.
pub type CipherVector = Vec<Ciphertext>;
/// Rows of ciphertexts.
pub type CipherMatrix = Vec<CipherVector>;

/// Number of polynomials in a fresh ciphertext.
pub const CIPHERTEXT_SIZE: usize = 2;

impl Ciphertext {

    /// Creates the transparent zero ciphertext at the given level.
    pub fn zeros(context: &HeContext, level: usize) -> Self {
        let context_data = context.context_data(level);
        Ciphertext {
            level,
            poly_modulus_degree: context_data.poly_modulus_degree(),
            coeff_modulus_size: context_data.coeff_modulus().len(),
            data: vec![0; CIPHERTEXT_SIZE * context_data.poly_len()],
            parms_id: *context_data.parms_id(),
        }
    }

    /// The [ParmsID] of the ciphertext.
    pub fn parms_id(&self) -> &ParmsID {
        &self.parms_id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    pub fn coeff_modulus_size(&self) -> usize {
        self.coeff_modulus_size
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u64] {
        &mut self.data
    }

    fn poly_len(&self) -> usize {
        self.poly_modulus_degree * self.coeff_modulus_size
    }

    /// Get the polynomial at the given index.
    pub fn poly(&self, id: usize) -> &[u64] {
        let d = self.poly_len();
        &self.data[id * d..(id + 1) * d]
    }

    pub fn poly_mut(&mut self, id: usize) -> &mut [u64] {
        let d = self.poly_len();
        &mut self.data[id * d..(id + 1) * d]
    }

    /// Both polynomials, mutably.
    pub fn polys_mut(&mut self) -> (&mut [u64], &mut [u64]) {
        let d = self.poly_len();
        self.data.split_at_mut(d)
    }

    /// Keep only the primes of `level`, in place.
    pub fn truncate_to_level(&mut self, context: &HeContext, level: usize) {
        if level > self.level {
            panic!("[Invalid argument] Cannot raise a ciphertext from level {} to {}.", self.level, level);
        }
        if level == self.level {
            return;
        }
        let context_data = context.context_data(level);
        let keep = context_data.poly_len();
        let old = self.poly_len();
        let mut data = Vec::with_capacity(CIPHERTEXT_SIZE * keep);
        for id in 0..CIPHERTEXT_SIZE {
            data.extend_from_slice(&self.data[id * old..id * old + keep]);
        }
        self.data = data;
        self.level = level;
        self.coeff_modulus_size = context_data.coeff_modulus().len();
        self.parms_id = *context_data.parms_id();
    }

}
