//! Arithmetic on RNS polynomials.
//!
//! A polynomial over `moduli` is stored component-major: `moduli.len()` blocks
//! of `degree` words, block `i` reduced modulo `moduli[i]`. Functions with a
//! `_p` suffix act on a whole polynomial, the unsuffixed ones on one block.

use crate::Modulus;

use super::NTTTables;

pub fn negate_inplace(component: &mut [u64], modulus: &Modulus) {
    component.iter_mut().for_each(|x| *x = modulus.negate(*x));
}
#[inline]
pub fn negate_inplace_p(poly: &mut [u64], degree: usize, moduli: &[Modulus]) {
    for (block, modulus) in poly.chunks_exact_mut(degree).zip(moduli) {
        negate_inplace(block, modulus);
    }
}

pub fn add_inplace(comp1: &mut [u64], comp2: &[u64], modulus: &Modulus) {
    comp1.iter_mut().zip(comp2).for_each(|(a, &b)| *a = modulus.add(*a, b));
}
#[inline]
pub fn add_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((block1, block2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        add_inplace(block1, block2, modulus);
    }
}

pub fn sub_inplace(comp1: &mut [u64], comp2: &[u64], modulus: &Modulus) {
    comp1.iter_mut().zip(comp2).for_each(|(a, &b)| *a = modulus.sub(*a, b));
}
#[inline]
pub fn sub_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((block1, block2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        sub_inplace(block1, block2, modulus);
    }
}

pub fn dyadic_product_inplace(comp1: &mut [u64], comp2: &[u64], modulus: &Modulus) {
    comp1.iter_mut().zip(comp2).for_each(|(a, &b)| *a = modulus.mul(*a, b));
}
#[inline]
pub fn dyadic_product_inplace_p(poly1: &mut [u64], poly2: &[u64], degree: usize, moduli: &[Modulus]) {
    for ((block1, block2), modulus) in poly1.chunks_exact_mut(degree).zip(poly2.chunks_exact(degree)).zip(moduli) {
        dyadic_product_inplace(block1, block2, modulus);
    }
}

/// Write signed coefficients into every RNS block.
pub fn from_signed_p(coefficients: &[i64], degree: usize, moduli: &[Modulus], result: &mut [u64]) {
    for (block, modulus) in result.chunks_exact_mut(degree).zip(moduli) {
        for (r, &c) in block.iter_mut().zip(coefficients) {
            *r = modulus.reduce_i64(c);
        }
    }
}

#[inline]
pub fn ntt_p(poly: &mut [u64], degree: usize, tables: &[NTTTables]) {
    for (block, table) in poly.chunks_exact_mut(degree).zip(tables) {
        table.ntt_negacyclic(block);
    }
}

#[inline]
pub fn intt_p(poly: &mut [u64], degree: usize, tables: &[NTTTables]) {
    for (block, table) in poly.chunks_exact_mut(degree).zip(tables) {
        table.inverse_ntt_negacyclic(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rns_block_arithmetic() {
        let moduli = [Modulus::new(17), Modulus::new(97)];
        let mut a = vec![16, 1, 96, 2];
        let b = vec![1, 16, 1, 96];
        add_inplace_p(&mut a, &b, 2, &moduli);
        assert_eq!(a, vec![0, 0, 0, 1]);
        sub_inplace_p(&mut a, &b, 2, &moduli);
        assert_eq!(a, vec![16, 1, 96, 2]);
        negate_inplace_p(&mut a, 2, &moduli);
        assert_eq!(a, vec![1, 16, 1, 95]);
        dyadic_product_inplace_p(&mut a, &b, 2, &moduli);
        assert_eq!(a, vec![1, 1, 1, 95 * 96 % 97]);
        let mut c = vec![0; 4];
        from_signed_p(&[-1, 3], 2, &moduli, &mut c);
        assert_eq!(c, vec![16, 3, 96, 3]);
    }
}
