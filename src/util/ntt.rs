use crate::Modulus;
use super::number_theory::minimal_primitive_root;

fn reverse_bits(value: usize, bit_count: usize) -> usize {
    if bit_count == 0 {0} else {value.reverse_bits() >> (usize::BITS as usize - bit_count)}
}

/// Precomputed tables of the negacyclic number-theoretic transform over one
/// RNS prime.
///
/// Root powers are stored in bit-reversed order; the forward transform maps
/// natural order to bit-reversed order and the inverse maps back.
#[derive(Clone, Debug, Default)]
pub struct NTTTables {
    root: u64,
    coeff_count_power: usize,
    coeff_count: usize,
    modulus: Modulus,
    root_powers: Vec<u64>,
    inv_root_powers: Vec<u64>,
    inv_degree_modulo: u64,
}

impl NTTTables {

    pub fn new(coeff_count_power: usize, modulus: &Modulus) -> Result<Self, String> {
        let coeff_count = 1usize << coeff_count_power;
        let root = minimal_primitive_root(2 * coeff_count as u64, modulus)
            .ok_or_else(|| format!("{} has no primitive {}-th root of unity", modulus, 2 * coeff_count))?;
        let inv_root = modulus.inverse(root)
            .ok_or_else(|| format!("root {} is not invertible modulo {}", root, modulus.value()))?;
        let mut root_powers = vec![0; coeff_count];
        let mut inv_root_powers = vec![0; coeff_count];
        let mut power = 1;
        let mut inv_power = 1;
        for i in 0..coeff_count {
            let index = reverse_bits(i, coeff_count_power);
            root_powers[index] = power;
            inv_root_powers[index] = inv_power;
            power = modulus.mul(power, root);
            inv_power = modulus.mul(inv_power, inv_root);
        }
        let inv_degree_modulo = modulus.inverse(coeff_count as u64)
            .ok_or_else(|| format!("degree is not invertible modulo {}", modulus.value()))?;
        Ok(Self {
            root,
            coeff_count_power,
            coeff_count,
            modulus: *modulus,
            root_powers,
            inv_root_powers,
            inv_degree_modulo,
        })
    }

    pub fn root(&self) -> u64 {self.root}
    pub fn coeff_count_power(&self) -> usize {self.coeff_count_power}
    pub fn coeff_count(&self) -> usize {self.coeff_count}
    pub fn modulus(&self) -> &Modulus {&self.modulus}

    pub fn create_ntt_tables(coeff_count_power: usize, moduli: &[Modulus]) -> Result<Vec<NTTTables>, String> {
        moduli.iter().map(|m| NTTTables::new(coeff_count_power, m)).collect()
    }

    /// Cooley-Tukey butterflies, natural order in, bit-reversed order out.
    pub fn ntt_negacyclic(&self, operand: &mut [u64]) {
        let q = &self.modulus;
        let n = self.coeff_count;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let s = self.root_powers[m + i];
                for j in j1..j1 + t {
                    let u = operand[j];
                    let v = q.mul(operand[j + t], s);
                    operand[j] = q.add(u, v);
                    operand[j + t] = q.sub(u, v);
                }
            }
            m <<= 1;
        }
    }

    /// Gentleman-Sande butterflies, bit-reversed order in, natural order out.
    pub fn inverse_ntt_negacyclic(&self, operand: &mut [u64]) {
        let q = &self.modulus;
        let n = self.coeff_count;
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.inv_root_powers[h + i];
                for j in j1..j1 + t {
                    let u = operand[j];
                    let v = operand[j + t];
                    operand[j] = q.add(u, v);
                    operand[j + t] = q.mul(q.sub(u, v), s);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        for x in operand.iter_mut().take(n) {
            *x = q.mul(*x, self.inv_degree_modulo);
        }
    }

}
