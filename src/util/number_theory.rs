use crate::modulus::Modulus;

// Bases making Miller-Rabin deterministic below 2^64.
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

#[inline]
fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    (a as u128 * b as u128 % modulus as u128) as u64
}

fn pow_mod(mut base: u64, mut exponent: u64, modulus: u64) -> u64 {
    let mut result = 1 % modulus;
    base %= modulus;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exponent >>= 1;
    }
    result
}

/// Inverse of `value` modulo `modulus` by the extended Euclidean algorithm,
/// `None` when they are not coprime.
pub fn try_invert_u64_mod_u64(value: u64, modulus: u64) -> Option<u64> {
    if value == 0 || modulus < 2 {
        return None;
    }
    let (mut r0, mut r1) = (modulus as i128, (value % modulus) as i128);
    let (mut t0, mut t1) = (0i128, 1i128);
    while r1 != 0 {
        let q = r0 / r1;
        (r0, r1) = (r1, r0 - q * r1);
        (t0, t1) = (t1, t0 - q * t1);
    }
    if r0 != 1 {
        return None;
    }
    Some(t0.rem_euclid(modulus as i128) as u64)
}

pub fn is_prime(value: u64) -> bool {
    if value < 2 {return false;}
    for &p in MILLER_RABIN_BASES.iter() {
        if value == p {return true;}
        if value % p == 0 {return false;}
    }
    // Find r and odd d that satisfy value = 2^r * d + 1.
    let mut d = value - 1;
    let mut r = 0;
    while (d & 1) == 0 {d >>= 1; r += 1;}
    'witness: for &a in MILLER_RABIN_BASES.iter() {
        let mut x = pow_mod(a, d, value);
        if x == 1 || x == value - 1 {continue;}
        for _ in 1..r {
            x = mul_mod(x, x, value);
            if x == value - 1 {continue 'witness;}
        }
        return false;
    }
    true
}

/// Largest `count` primes of exactly `bit_size` bits congruent to 1 mod `factor`,
/// in decreasing order.
pub fn get_primes(factor: u64, bit_size: usize, mut count: usize) -> Option<Vec<Modulus>> {
    let mut destination = vec![];
    // Start with (2^bit_size - 1) / factor * factor + 1
    let mut value = ((0x1u64 << bit_size) - 1) / factor * factor + 1;
    let lower_bound = 0x1 << (bit_size - 1);
    while count > 0 && value > lower_bound {
        if is_prime(value) {
            destination.push(Modulus::new(value));
            count -= 1;
        }
        value -= factor;
    }
    if count > 0 {None} else {Some(destination)}
}

pub fn is_primitive_root(root: u64, degree: u64, modulus: &Modulus) -> bool {
    if root == 0 {
        false
    } else {
        // We check if root is a degree-th root of unity in integers modulo modulus,
        // where degree is a power of two. It suffices to check that root^(degree/2)
        // is -1 modulo modulus.
        modulus.pow(root, degree >> 1) == (modulus.value() - 1)
    }
}

/// Smallest primitive `degree`-th root of unity, `degree` a power of two.
///
/// The result only depends on its inputs, so independent parties agree on it.
pub fn minimal_primitive_root(degree: u64, modulus: &Modulus) -> Option<u64> {
    let size_entire_group = modulus.value() - 1;
    if size_entire_group % degree != 0 {
        return None;
    }
    let size_quotient_group = size_entire_group / degree;
    let root = (2..modulus.value().min(1 << 20))
        .map(|candidate| modulus.pow(candidate, size_quotient_group))
        .find(|&candidate| is_primitive_root(candidate, degree, modulus))?;
    // Odd powers of a primitive root are exactly the primitive roots.
    let generator_sq = modulus.mul(root, root);
    let mut current_generator = root;
    let mut minimal = root;
    for _ in 0..((degree+1)/2) {
        minimal = minimal.min(current_generator);
        current_generator = modulus.mul(current_generator, generator_sq);
    }
    Some(minimal)
}
