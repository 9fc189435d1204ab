pub mod sample {
    use rand::{Rng, distributions::Uniform, prelude::Distribution};
    use crate::Modulus;

    pub const NOISE_STANDARD_DEVIATION: f64 = 3.19;
    pub const NOISE_DISTRIBUTION_WITH_MULTIPLIER: f64 = 6.0;

    #[derive(Clone, Copy)]
    struct ClippedNormal {
        normal: rand_distr::Normal<f64>,
        max_deviation: f64,
    }

    impl Distribution<f64> for ClippedNormal {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
            let mean = self.normal.mean();
            loop {
                let sample = self.normal.sample(rng);
                if (sample - mean).abs() <= self.max_deviation {
                    break sample;
                }
            }
        }
    }

    impl ClippedNormal {
        fn new(mean: f64, standard_deviation: f64, max_deviation: f64) -> Option<Self> {
            if max_deviation <= 0.0 || standard_deviation <= 0.0 {
                return None;
            }
            Some(Self {
                normal: rand_distr::Normal::new(mean, standard_deviation).ok()?,
                max_deviation,
            })
        }
    }

    fn write_signed(sampled: i64, coeff_index: usize, coeff_count: usize, moduli: &[Modulus], destination: &mut [u64]) {
        for (j, modulus) in moduli.iter().enumerate() {
            destination[coeff_index + j * coeff_count] = modulus.reduce_i64(sampled);
        }
    }

    pub fn ternary<T: Rng + ?Sized>(rng: &mut T, coeff_count: usize, moduli: &[Modulus], destination: &mut [u64]) {
        let distribution = Uniform::new_inclusive(-1i64, 1);
        for i in 0..coeff_count {
            let sampled = distribution.sample(rng);
            write_signed(sampled, i, coeff_count, moduli, destination);
        }
    }

    /// Rounded Gaussian clipped at six standard deviations. A zero deviation
    /// yields the zero polynomial.
    pub fn gaussian<T: Rng + ?Sized>(rng: &mut T, standard_deviation: f64, coeff_count: usize, moduli: &[Modulus], destination: &mut [u64]) {
        let distribution = match ClippedNormal::new(
            0.0, standard_deviation, standard_deviation * NOISE_DISTRIBUTION_WITH_MULTIPLIER
        ) {
            Some(distribution) => distribution,
            None => {
                destination[..coeff_count * moduli.len()].fill(0);
                return;
            }
        };
        for i in 0..coeff_count {
            let sampled = distribution.sample(rng).round() as i64;
            write_signed(sampled, i, coeff_count, moduli, destination);
        }
    }

    pub fn uniform<T: Rng + ?Sized>(rng: &mut T, coeff_count: usize, moduli: &[Modulus], destination: &mut [u64]) {
        for (j, modulus) in moduli.iter().enumerate() {
            let distribution = Uniform::new_inclusive(0, modulus.value() - 1);
            for i in 0..coeff_count {
                destination[i + j * coeff_count] = distribution.sample(rng);
            }
        }
    }

}
