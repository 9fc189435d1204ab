//! Sine, cosine and the logistic sigmoid on partitioned values.
//!
//! After a partition the dealer knows `am` and every worker knows `ar`, each
//! of which alone looks random. Both sides evaluate the function on what they
//! see in floating point; the dealer then deals its results as worker shares
//! through [Mpc::beaver_reconstruct_mat], and the workers combine them with
//! their own results through an addition identity of the function. Sine and
//! cosine carry `2 * frac_bits` fractional bits; the sigmoid factors use
//! `sigmoid_frac_bits` instead, since they get much closer to zero.

use rayon::prelude::*;

use crate::{
    error::Result,
    ring::{RMat, RingElement},
};

use super::{beaver::FIRST_WORKER_PID, Mpc};

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn check_lens<A>(ar: &[A], am: &[A]) {
    if ar.len() != am.len() {
        panic!("[Invalid argument] Remainder and mask lengths differ: {} and {}.", ar.len(), am.len());
    }
}

impl Mpc {

    /// Deal two rows of values held by the dealer as worker shares. Workers
    /// get their shares, the dealer gets zeros.
    fn deal_rows<R: RingElement>(&mut self, len: usize, rows: Option<(Vec<R>, Vec<R>)>) -> Result<(Vec<R>, Vec<R>)> {
        let dealt = match rows {
            Some((mut data, mut second)) => {
                data.append(&mut second);
                RMat::from_data(2, len, data)
            }
            None => RMat::zeros(2, len),
        };
        let shares = self.beaver_reconstruct_mat(&dealt)?;
        Ok((shares.row(0).to_vec(), shares.row(1).to_vec()))
    }

    /// Shares of `sin(x)` and `cos(x)` for `x = ar + am`.
    ///
    /// Input ring `A` should wrap at the period (see [crate::ring::Angle]);
    /// the outputs are fixed point in `R`. Workers use
    /// `sin(x) = sin(am)cos(ar) + cos(am)sin(ar)` and
    /// `cos(x) = cos(am)cos(ar) - sin(am)sin(ar)`
    /// with their shares of `sin(am)` and `cos(am)`.
    pub fn beaver_sin_cos_vec<A, R>(&mut self, ar: &[A], am: &[A]) -> Result<(Vec<R>, Vec<R>)>
    where
        A: RingElement,
        R: RingElement,
    {
        check_lens(ar, am);
        let f = self.frac_bits();
        let n = am.len();
        if self.is_dealer() {
            let angles: Vec<f64> = am.iter().map(|m| m.to_f64(f)).collect();
            let sin = angles.iter().map(|t| R::from_f64(t.sin(), f)).collect();
            let cos = angles.iter().map(|t| R::from_f64(t.cos(), f)).collect();
            self.deal_rows(n, Some((sin, cos)))?;
            return Ok((vec![R::zero(); n], vec![R::zero(); n]));
        }

        let (mask_sin, mask_cos) = self.deal_rows::<R>(n, None)?;
        Ok(self.pool.install(|| {
            (0..n).into_par_iter().map(|i| {
                let t = ar[i].to_f64(f);
                let (sin_r, cos_r) = (R::from_f64(t.sin(), f), R::from_f64(t.cos(), f));
                let sin = mask_sin[i].clone() * cos_r.clone() + mask_cos[i].clone() * sin_r.clone();
                let cos = mask_cos[i].clone() * cos_r - mask_sin[i].clone() * sin_r;
                (sin, cos)
            }).unzip()
        }))
    }

    pub fn beaver_sin_cos<A: RingElement, R: RingElement>(&mut self, ar: &A, am: &A) -> Result<(R, R)> {
        let (mut sin, mut cos) = self.beaver_sin_cos_vec(std::slice::from_ref(ar), std::slice::from_ref(am))?;
        Ok((sin.remove(0), cos.remove(0)))
    }

    /// Shares of a numerator and a denominator whose quotient is `σ(x)`.
    ///
    /// Uses `σ(x) = σ(ar)σ(am) / (σ(ar)σ(am) + σ(-ar)σ(-am))`. The dealer
    /// deals `σ(am) - 1` and `1 - σ(am)`; the first worker adds `σ(ar)` to both
    /// sums so that the ones cancel. Inputs are read at `frac_bits`; both
    /// outputs carry `2 * sigmoid_frac_bits` fractional bits.
    pub fn beaver_sigmoid_vec<A, R>(&mut self, ar: &[A], am: &[A]) -> Result<(Vec<R>, Vec<R>)>
    where
        A: RingElement,
        R: RingElement,
    {
        check_lens(ar, am);
        let f = self.frac_bits();
        let fs = self.config.sigmoid_frac_bits;
        let n = am.len();
        if self.is_dealer() {
            let masks: Vec<f64> = am.iter().map(|m| m.to_f64(f)).collect();
            let below = masks.iter().map(|&m| R::from_f64(-logistic(-m), fs)).collect();
            let above = masks.iter().map(|&m| R::from_f64(logistic(-m), fs)).collect();
            self.deal_rows(n, Some((below, above)))?;
            return Ok((vec![R::zero(); n], vec![R::zero(); n]));
        }

        let (below, above) = self.deal_rows::<R>(n, None)?;
        let one = R::from_f64(1.0, fs);
        let first = self.pid() == FIRST_WORKER_PID;
        Ok(self.pool.install(|| {
            (0..n).into_par_iter().map(|i| {
                let t = ar[i].to_f64(f);
                let (sig, sig_neg) = (R::from_f64(logistic(t), fs), R::from_f64(logistic(-t), fs));
                let mut num = sig.clone() * below[i].clone();
                let mut den = num.clone() + sig_neg * above[i].clone();
                if first {
                    let correction = sig * one.clone();
                    num = num + correction.clone();
                    den = den + correction;
                }
                (num, den)
            }).unzip()
        }))
    }

    pub fn beaver_sigmoid<A: RingElement, R: RingElement>(&mut self, ar: &A, am: &A) -> Result<(R, R)> {
        let (mut num, mut den) = self.beaver_sigmoid_vec(std::slice::from_ref(ar), std::slice::from_ref(am))?;
        Ok((num.remove(0), den.remove(0)))
    }

    /// Shares of `sin(a)` and `cos(a)` for shared angles `a`.
    pub fn ss_trig_vec<A: RingElement, R: RingElement>(&mut self, a: &[A]) -> Result<(Vec<R>, Vec<R>)> {
        let (ar, am) = self.beaver_partition_vec(a)?;
        self.beaver_sin_cos_vec(&ar, &am)
    }

    /// Numerator and denominator shares of `σ(a)`.
    ///
    /// The input is partitioned with masks bounded by
    /// `nonlinear_mask_bound` per worker, so the remainder the workers
    /// evaluate stays within `(party_count - 1) * nonlinear_mask_bound` of
    /// `a`. [ProtocolConfig::validate](crate::config::ProtocolConfig::validate)
    /// checks that `σ` stays representable over that reach.
    pub fn ss_sigmoid_vec<A: RingElement, R: RingElement>(&mut self, a: &[A]) -> Result<(Vec<R>, Vec<R>)> {
        let bound = self.config.nonlinear_mask_bound;
        let (ar, am) = self.beaver_partition_bounded_vec(a, bound)?;
        self.beaver_sigmoid_vec(&ar, &am)
    }

}
