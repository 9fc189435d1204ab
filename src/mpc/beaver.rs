//! Dealer-assisted Beaver multiplication.
//!
//! A shared value `x` is partitioned into an opened remainder `ar` known to
//! every worker and a mask `am` known to the dealer, additively shared among
//! the workers as `[am]_i`. With both operands partitioned, the product
//! `(ar + am)(br + bm)` splits into
//!
//! - `am * bm`, computed by the dealer in the clear;
//! - `ar * [bm]_i + [am]_i * br` on every worker;
//! - `ar * br`, added once by the first worker.
//!
//! Reconstruct then turns the dealer's `am * bm` back into worker shares, so
//! that the workers alone hold shares of the product.

use rand::Rng;
use rayon::prelude::*;

use crate::{
    config::DEALER_PID,
    error::Result,
    prg::CorrelatedRandomness,
    ring::{random_vec, RMat, RingElement},
};

use super::Mpc;

/// The worker that adds the `ar * br` correction.
pub const FIRST_WORKER_PID: usize = 1;

fn random_mat<T: RingElement>(rand: &mut CorrelatedRandomness, rows: usize, cols: usize) -> RMat<T> {
    RMat::from_data(rows, cols, random_vec(rand, rows * cols))
}

fn check_dims<T: RingElement>(operands: [&RMat<T>; 4]) {
    let dims = operands[0].dims();
    if operands.iter().any(|m| m.dims() != dims) {
        panic!("[Invalid argument] Beaver operands have different dimensions: {:?}.",
            operands.iter().map(|m| m.dims()).collect::<Vec<_>>());
    }
}

/// `ar * bm + br * am`, plus `ar * br` on the first worker.
#[inline]
fn worker_cell<T: RingElement>(pid: usize, ar: &T, am: &T, br: &T, bm: &T) -> T {
    let mut out = ar.clone() * bm.clone() + br.clone() * am.clone();
    if pid == FIRST_WORKER_PID {
        out = out + ar.clone() * br.clone();
    }
    out
}

impl Mpc {

    fn partition_with<T, F>(&mut self, a: &RMat<T>, mut sample: F) -> Result<(RMat<T>, RMat<T>)>
    where
        T: RingElement,
        F: FnMut(&mut CorrelatedRandomness, usize, usize) -> RMat<T>,
    {
        let (rows, cols) = a.dims();
        if self.is_dealer() {
            let mut am = RMat::zeros(rows, cols);
            for p in self.worker_ids() {
                let mask = self.rand.with_peer(p, |r| sample(r, rows, cols));
                am.add_assign(&mask);
            }
            return Ok((RMat::zeros(rows, cols), am));
        }

        let mask = self.rand.with_peer(DEALER_PID, |r| sample(r, rows, cols));
        let mut ar = a.clone();
        if cols > 0 {
            self.pool.install(|| {
                ar.data_mut()
                    .par_chunks_mut(cols)
                    .zip(mask.data().par_chunks(cols))
                    .for_each(|(row, mask_row)| {
                        for (x, m) in row.iter_mut().zip(mask_row) {
                            *x = x.clone() - m.clone();
                        }
                    });
            });
        }
        let ar = self.reveal_sym_mat(&ar)?;
        Ok((ar, mask))
    }

    /// Split shares of `a` into the opened remainder and the mask shares.
    ///
    /// The dealer returns `(0, am)` with `am` the sum of every worker's mask;
    /// each worker returns `(ar, [am]_i)` with the same `ar` everywhere.
    pub fn beaver_partition_mat<T: RingElement>(&mut self, a: &RMat<T>) -> Result<(RMat<T>, RMat<T>)> {
        self.partition_with(a, random_mat)
    }

    pub fn beaver_partition_vec<T: RingElement>(&mut self, a: &[T]) -> Result<(Vec<T>, Vec<T>)> {
        let (ar, am) = self.beaver_partition_mat(&RMat::row_vector(a.to_vec()))?;
        Ok((ar.into_data(), am.into_data()))
    }

    pub fn beaver_partition<T: RingElement>(&mut self, a: &T) -> Result<(T, T)> {
        let (mut ar, mut am) = self.beaver_partition_vec(std::slice::from_ref(a))?;
        Ok((ar.remove(0), am.remove(0)))
    }

    /// Partition with each worker's mask drawn uniformly from
    /// `[-bound, bound]` at the configured precision rather than from the
    /// whole ring. `ar` then stays close to `x`, which keeps a float
    /// evaluation of `ar` and `am` meaningful in rings that do not wrap at a
    /// period.
    pub fn beaver_partition_bounded_vec<T: RingElement>(&mut self, a: &[T], bound: f64) -> Result<(Vec<T>, Vec<T>)> {
        let frac_bits = self.frac_bits();
        let (ar, am) = self.partition_with(&RMat::row_vector(a.to_vec()), |r, rows, cols| {
            let data = (0..rows * cols)
                .map(|_| T::from_f64(r.gen_range(-bound..=bound), frac_bits))
                .collect();
            RMat::from_data(rows, cols, data)
        })?;
        Ok((ar.into_data(), am.into_data()))
    }

    /// Turn a dealer-held value into worker shares and add each worker's
    /// share to its partial result.
    ///
    /// The dealer subtracts one correlated mask per worker but the last and
    /// sends the residual to the last worker; it returns zeros. Workers return
    /// `a + share`.
    pub fn beaver_reconstruct_mat<T: RingElement>(&mut self, a: &RMat<T>) -> Result<RMat<T>> {
        let (rows, cols) = a.dims();
        let last = self.last_pid();
        if self.is_dealer() {
            let mut residual = a.clone();
            for to in 1..last {
                let share = self.rand.with_peer(to, |r| random_mat::<T>(r, rows, cols));
                residual.sub_assign(&share);
            }
            self.network.send_rmat(last, &residual)?;
            return Ok(RMat::zeros(rows, cols));
        }

        let share = if self.pid() == last {
            self.network.receive_rmat(DEALER_PID, rows, cols)?
        } else {
            self.rand.with_peer(DEALER_PID, |r| random_mat(r, rows, cols))
        };
        let mut out = a.clone();
        out.add_assign(&share);
        Ok(out)
    }

    pub fn beaver_reconstruct_vec<T: RingElement>(&mut self, a: &[T]) -> Result<Vec<T>> {
        Ok(self.beaver_reconstruct_mat(&RMat::row_vector(a.to_vec()))?.into_data())
    }

    pub fn beaver_reconstruct<T: RingElement>(&mut self, a: &T) -> Result<T> {
        Ok(self.beaver_reconstruct_vec(std::slice::from_ref(a))?.remove(0))
    }

    /// Partial product share of two partitioned scalars.
    pub fn beaver_mult<T: RingElement>(&self, ar: &T, am: &T, br: &T, bm: &T) -> T {
        if self.is_dealer() {
            return am.clone() * bm.clone();
        }
        worker_cell(self.pid(), ar, am, br, bm)
    }

    /// Elementwise partial products. Workers compute one cell per task on the
    /// party's pool and return once every cell is written.
    pub fn beaver_mult_elem_mat<T: RingElement>(&self, ar: &RMat<T>, am: &RMat<T>, br: &RMat<T>, bm: &RMat<T>) -> RMat<T> {
        check_dims([ar, am, br, bm]);
        if self.is_dealer() {
            return am.mul_elem(bm);
        }
        let pid = self.pid();
        let (rows, cols) = am.dims();
        let mut out = RMat::zeros(rows, cols);
        let (ar, am, br, bm) = (ar.data(), am.data(), br.data(), bm.data());
        self.pool.install(|| {
            out.data_mut().par_iter_mut().enumerate().for_each(|(idx, cell)| {
                *cell = worker_cell(pid, &ar[idx], &am[idx], &br[idx], &bm[idx]);
            });
        });
        out
    }

    pub fn beaver_mult_elem_vec<T: RingElement>(&self, ar: &[T], am: &[T], br: &[T], bm: &[T]) -> Vec<T> {
        let lift = |v: &[T]| RMat::row_vector(v.to_vec());
        self.beaver_mult_elem_mat(&lift(ar), &lift(am), &lift(br), &lift(bm)).into_data()
    }

    /// Partial shares of the matrix product `(ar + am)(br + bm)`.
    pub fn beaver_mult_mat<T: RingElement>(&self, ar: &RMat<T>, am: &RMat<T>, br: &RMat<T>, bm: &RMat<T>) -> RMat<T> {
        if self.is_dealer() {
            return am.matmul(bm);
        }
        let mut out = ar.matmul(bm);
        out.add_assign(&am.matmul(br));
        if self.pid() == FIRST_WORKER_PID {
            out.add_assign(&ar.matmul(br));
        }
        out
    }

    pub fn ss_mult_elem<T: RingElement>(&mut self, a: &T, b: &T) -> Result<T> {
        let (ar, am) = self.beaver_partition(a)?;
        let (br, bm) = self.beaver_partition(b)?;
        let x = self.beaver_mult(&ar, &am, &br, &bm);
        self.beaver_reconstruct(&x)
    }

    pub fn ss_mult_elem_vec<T: RingElement>(&mut self, a: &[T], b: &[T]) -> Result<Vec<T>> {
        let (ar, am) = self.beaver_partition_vec(a)?;
        let (br, bm) = self.beaver_partition_vec(b)?;
        let x = self.beaver_mult_elem_vec(&ar, &am, &br, &bm);
        self.beaver_reconstruct_vec(&x)
    }

    pub fn ss_mult_elem_mat<T: RingElement>(&mut self, a: &RMat<T>, b: &RMat<T>) -> Result<RMat<T>> {
        let (ar, am) = self.beaver_partition_mat(a)?;
        let (br, bm) = self.beaver_partition_mat(b)?;
        let x = self.beaver_mult_elem_mat(&ar, &am, &br, &bm);
        self.beaver_reconstruct_mat(&x)
    }

    pub fn ss_mult_mat<T: RingElement>(&mut self, a: &RMat<T>, b: &RMat<T>) -> Result<RMat<T>> {
        let (ar, am) = self.beaver_partition_mat(a)?;
        let (br, bm) = self.beaver_partition_mat(b)?;
        let x = self.beaver_mult_mat(&ar, &am, &br, &bm);
        self.beaver_reconstruct_mat(&x)
    }

    /// Every entry of `a` times the shared scalar `b`.
    pub fn ss_mult_elem_vec_scalar<T: RingElement>(&mut self, a: &[T], b: &T) -> Result<Vec<T>> {
        let (ar, am) = self.beaver_partition_vec(a)?;
        let (br, bm) = self.beaver_partition(b)?;
        let x: Vec<T> = ar.iter().zip(&am)
            .map(|(ar, am)| self.beaver_mult(ar, am, &br, &bm))
            .collect();
        self.beaver_reconstruct_vec(&x)
    }

    pub fn ss_square_elem_vec<T: RingElement>(&mut self, a: &[T]) -> Result<Vec<T>> {
        let (ar, am) = self.beaver_partition_vec(a)?;
        let x = self.beaver_mult_elem_vec(&ar, &am, &ar, &am);
        self.beaver_reconstruct_vec(&x)
    }

}
