//! Opening values held in additive shares among the workers.

use crate::{
    error::Result,
    ring::{RMat, RingElement},
};

use super::Mpc;

impl Mpc {

    /// Every worker sends its share to every other worker and sums what it
    /// receives, so all workers end up with the same opened value. The dealer
    /// takes no part and gets its input back.
    pub fn reveal_sym_mat<T: RingElement>(&mut self, x: &RMat<T>) -> Result<RMat<T>> {
        if self.is_dealer() {
            return Ok(x.clone());
        }
        let pid = self.pid();
        for to in self.worker_ids().filter(|&j| j != pid) {
            self.network.send_rmat(to, x)?;
        }
        let mut sum = x.clone();
        for from in self.worker_ids().filter(|&j| j != pid) {
            sum.add_assign(&self.network.receive_rmat(from, x.rows(), x.cols())?);
        }
        Ok(sum)
    }

    pub fn reveal_sym_vec<T: RingElement>(&mut self, x: &[T]) -> Result<Vec<T>> {
        Ok(self.reveal_sym_mat(&RMat::row_vector(x.to_vec()))?.into_data())
    }

    pub fn reveal_sym<T: RingElement>(&mut self, x: &T) -> Result<T> {
        if self.is_dealer() {
            return Ok(x.clone());
        }
        let pid = self.pid();
        for to in self.worker_ids().filter(|&j| j != pid) {
            self.network.send_relem(to, x)?;
        }
        let mut sum = x.clone();
        for from in self.worker_ids().filter(|&j| j != pid) {
            sum = sum + self.network.receive_relem(from)?;
        }
        Ok(sum)
    }

}

#[cfg(test)]
mod tests {
    use crate::ring::{RMat, RingElement, Z2k};
    use crate::simulation::run_in_process;

    type R = Z2k<62>;

    #[test]
    fn test_reveal_same_value_for_all_workers() {
        let results = run_in_process(3, |mpc| {
            let pid = mpc.pid() as u128;
            let share = RMat::from_data(1, 2, vec![R::new(10 * pid), R::new(pid)]);
            let opened = mpc.reveal_sym_mat(&share)?;
            let scalar = mpc.reveal_sym(&R::new(pid + 100))?;
            Ok((opened, scalar))
        }).unwrap();
        // dealer: its own input
        assert_eq!(results[0].0.data(), &[R::zero(), R::zero()]);
        assert_eq!(results[0].1, R::new(100));
        for (opened, scalar) in &results[1..] {
            assert_eq!(opened.data(), &[R::new(30), R::new(3)]);
            assert_eq!(*scalar, R::new(203));
        }
    }
}
