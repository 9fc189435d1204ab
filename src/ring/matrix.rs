use crate::error::{MpcError, Result};

use super::RingElement;

/// Row-major matrix of ring elements.
///
/// Binary operations require equal dimensions and panic otherwise: a mismatch
/// means the parties are running different protocols.
#[derive(Clone, Debug, PartialEq)]
pub struct RMat<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: RingElement> RMat<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![T::zero(); rows * cols] }
    }

    pub fn from_data(rows: usize, cols: usize, data: Vec<T>) -> Self {
        if data.len() != rows * cols {
            panic!("[Invalid argument] Matrix data has {} elements, expected {}x{}.", data.len(), rows, cols);
        }
        Self { rows, cols, data }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            panic!("[Invalid argument] Rows have different lengths.");
        }
        Self { rows: row_count, cols, data: rows.into_iter().flatten().collect() }
    }

    /// Lift a vector to a `1 x n` matrix.
    pub fn row_vector(values: Vec<T>) -> Self {
        Self { rows: 1, cols: values.len(), data: values }
    }

    pub fn from_f64(rows: usize, cols: usize, values: &[f64], frac_bits: u32) -> Self {
        Self::from_data(rows, cols, super::vec_from_f64(values, frac_bits))
    }

    pub fn to_f64(&self, frac_bits: u32) -> Vec<f64> {
        super::vec_to_f64(&self.data, frac_bits)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.cols + j] = value;
    }

    fn check_same_dims(&self, other: &Self, op: &str) {
        if self.dims() != other.dims() {
            panic!("[Invalid argument] Cannot {} {}x{} and {}x{} matrices.",
                op, self.rows, self.cols, other.rows, other.cols);
        }
    }

    pub fn add_assign(&mut self, other: &Self) {
        self.check_same_dims(other, "add");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = a.clone() + b.clone();
        }
    }

    pub fn sub_assign(&mut self, other: &Self) {
        self.check_same_dims(other, "subtract");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = a.clone() - b.clone();
        }
    }

    pub fn negate(&mut self) {
        for a in self.data.iter_mut() {
            *a = -a.clone();
        }
    }

    /// Elementwise product.
    pub fn mul_elem(&self, other: &Self) -> Self {
        self.check_same_dims(other, "multiply elementwise");
        let data = self.data.iter().zip(other.data.iter())
            .map(|(a, b)| a.clone() * b.clone())
            .collect();
        Self { rows: self.rows, cols: self.cols, data }
    }

    pub fn mul_scalar(&self, scalar: &T) -> Self {
        let data = self.data.iter().map(|a| a.clone() * scalar.clone()).collect();
        Self { rows: self.rows, cols: self.cols, data }
    }

    /// Matrix product.
    pub fn matmul(&self, other: &Self) -> Self {
        if self.cols != other.rows {
            panic!("[Invalid argument] Cannot multiply {}x{} by {}x{}.",
                self.rows, self.cols, other.rows, other.cols);
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = &self.data[i * self.cols + k];
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.cols {
                    let idx = i * other.cols + j;
                    out.data[idx] = out.data[idx].clone() + a.clone() * other.data[k * other.cols + j].clone();
                }
            }
        }
        out
    }

    /// Elements back to back, each [RingElement::byte_len] wide.
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = T::byte_len();
        let mut bytes = vec![0u8; width * self.data.len()];
        for (chunk, value) in bytes.chunks_exact_mut(width).zip(self.data.iter()) {
            value.write_bytes(chunk);
        }
        bytes
    }

    pub fn from_bytes(rows: usize, cols: usize, bytes: &[u8]) -> Result<Self> {
        let width = T::byte_len();
        if bytes.len() != rows * cols * width {
            return Err(MpcError::codec("ring matrix",
                format!("{} bytes for a {}x{} matrix of {}-byte elements", bytes.len(), rows, cols, width)));
        }
        let data = bytes.chunks_exact(width).map(T::read_bytes).collect();
        Ok(Self { rows, cols, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Z2k;

    type R = Z2k<62>;

    fn mat(rows: usize, cols: usize, values: &[f64]) -> RMat<R> {
        RMat::from_f64(rows, cols, values, 0)
    }

    #[test]
    fn test_elementwise() {
        let mut a = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = mat(2, 2, &[-1.0, 1.0, 0.0, 2.0]);
        assert_eq!(a.mul_elem(&b).to_f64(0), vec![-1.0, 2.0, 0.0, 8.0]);
        a.sub_assign(&b);
        assert_eq!(a.to_f64(0), vec![2.0, 1.0, 3.0, 2.0]);
        a.add_assign(&b);
        a.negate();
        assert_eq!(a.to_f64(0), vec![-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn test_matmul() {
        let a = mat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = mat(3, 1, &[1.0, 0.0, -1.0]);
        assert_eq!(a.matmul(&b).to_f64(0), vec![-2.0, -2.0]);
    }

    #[test]
    #[should_panic(expected = "Invalid argument")]
    fn test_dimension_mismatch_panics() {
        let mut a = RMat::<R>::zeros(2, 2);
        a.add_assign(&RMat::zeros(2, 3));
    }

    #[test]
    fn test_bytes_length_checked() {
        let a = mat(1, 3, &[1.0, -1.0, 7.0]);
        let bytes = a.to_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(RMat::<R>::from_bytes(1, 3, &bytes).unwrap(), a);
        assert!(RMat::<R>::from_bytes(1, 2, &bytes).is_err());
    }
}
