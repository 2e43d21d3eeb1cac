//! Dense row-major matrix with owned storage and borrowed, optionally transposed views.
//!
//! `Matrix<T>` always owns its buffer: `clone()` is a deep copy and the buffer
//! is released when the value is dropped. `MatrixView<'a, T>` is the aliasing
//! counterpart: it borrows another matrix's storage, can never outlive it, and
//! dropping it leaves the source untouched. Views are how weights reach the
//! product kernels without being duplicated, including the transposed weights
//! used during backpropagation.
//!
//! Shape compatibility is a caller contract. Elementwise operations require
//! identical shapes and products require `left.cols == right.rows`; any
//! violation panics at the call site.
use num_traits::Float;
use std::fmt;
use std::ops::{AddAssign, Index, IndexMut, MulAssign, SubAssign};
use std::str::FromStr;

/// Scalar stored in a [`Matrix`]. Implemented for `f32` and `f64`.
pub trait Element: Float + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static {
    /// Conversion from `f64`, used for hyperparameters and random draws.
    fn from_f64(value: f64) -> Self;
    /// Widening conversion used for loss reporting.
    fn as_f64(self) -> f64;
}

impl Element for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }
    fn as_f64(self) -> f64 {
        self
    }
}

/// An owned `rows x cols` matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::zero())
    }

    /// Matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wraps a row-major buffer. Panics if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "buffer of {} elements cannot back a {}x{} matrix",
            data.len(),
            rows,
            cols
        );
        Self { rows, cols, data }
    }

    /// Column vector (`data.len() x 1`).
    pub fn column(data: Vec<T>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at `(i, j)`. Panics when out of range.
    pub fn get(&self, i: usize, j: usize) -> T {
        self[(i, j)]
    }

    /// Non-owning alias over this matrix's storage.
    pub fn view(&self) -> MatrixView<'_, T> {
        MatrixView {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
            transposed: false,
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: T) {
        self.data.iter_mut().for_each(|x| *x = *x * factor);
    }

    /// Elementwise (Hadamard) product in place.
    pub fn hadamard(&mut self, rhs: &Matrix<T>) {
        self.assert_same_shape(rhs, "hadamard product");
        for (a, &b) in self.data.iter_mut().zip(&rhs.data) {
            *a = *a * b;
        }
    }

    /// Transposes in place; the shape becomes `cols x rows`.
    pub fn transpose(&mut self) {
        if self.rows > 1 && self.cols > 1 {
            let mut data = Vec::with_capacity(self.data.len());
            for j in 0..self.cols {
                for i in 0..self.rows {
                    data.push(self.data[i * self.cols + j]);
                }
            }
            self.data = data;
        }
        std::mem::swap(&mut self.rows, &mut self.cols);
    }

    /// Applies `1 / (1 + e^-x)` to every element.
    pub fn sigmoid(&mut self) {
        self.map_inplace(crate::activations::sigmoid);
    }

    pub fn map_inplace<F: Fn(T) -> T>(&mut self, f: F) {
        self.data.iter_mut().for_each(|x| *x = f(*x));
    }

    /// Matrix product `self · rhs` into a new matrix.
    pub fn dot(&self, rhs: &Matrix<T>) -> Matrix<T> {
        self.view().dot(rhs.view())
    }

    /// Flat index of the largest element; the first one wins on ties.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.data.iter().enumerate().skip(1) {
            if v > self.data[best] {
                best = i;
            }
        }
        best
    }

    fn assert_same_shape(&self, rhs: &Matrix<T>, op: &str) {
        assert_eq!(
            self.shape(),
            rhs.shape(),
            "{} on mismatched shapes {}x{} and {}x{}",
            op,
            self.rows,
            self.cols,
            rhs.rows,
            rhs.cols
        );
    }
}

impl<T: Element> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        &self.data[i * self.cols + j]
    }
}

impl<T: Element> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        &mut self.data[i * self.cols + j]
    }
}

impl<T: Element> AddAssign<&Matrix<T>> for Matrix<T> {
    fn add_assign(&mut self, rhs: &Matrix<T>) {
        self.assert_same_shape(rhs, "addition");
        for (a, &b) in self.data.iter_mut().zip(&rhs.data) {
            *a = *a + b;
        }
    }
}

impl<T: Element> SubAssign<&Matrix<T>> for Matrix<T> {
    fn sub_assign(&mut self, rhs: &Matrix<T>) {
        self.assert_same_shape(rhs, "subtraction");
        for (a, &b) in self.data.iter_mut().zip(&rhs.data) {
            *a = *a - b;
        }
    }
}

impl<T: Element> MulAssign<T> for Matrix<T> {
    fn mul_assign(&mut self, factor: T) {
        self.scale(factor);
    }
}

/// In-place matrix product: `self ← self · rhs`.
impl<T: Element> MulAssign<&Matrix<T>> for Matrix<T> {
    fn mul_assign(&mut self, rhs: &Matrix<T>) {
        *self = self.dot(rhs);
    }
}

/// Borrowed alias over a matrix's storage, possibly read as its transpose.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
    transposed: bool,
}

impl<'a, T: Element> MatrixView<'a, T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of range for {}x{} view",
            i,
            j,
            self.rows,
            self.cols
        );
        self.at(i, j)
    }

    /// The same storage read as its transpose. No data is copied.
    pub fn t(self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            transposed: !self.transposed,
            ..self
        }
    }

    /// Deep copy into an owned matrix with the view's logical layout.
    pub fn to_matrix(&self) -> Matrix<T> {
        let mut data = Vec::with_capacity(self.rows * self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                data.push(self.at(i, j));
            }
        }
        Matrix::from_vec(self.rows, self.cols, data)
    }

    /// Matrix product `self · rhs`. Panics unless `self.cols == rhs.rows`.
    pub fn dot(self, rhs: MatrixView<'_, T>) -> Matrix<T> {
        assert_eq!(
            self.cols, rhs.rows,
            "product of {}x{} and {}x{} matrices",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Matrix::new(self.rows, rhs.cols);
        for i in 0..self.rows {
            let row = &mut out.data[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.at(i, k);
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = *cell + a * rhs.at(k, j);
                }
            }
        }
        out
    }

    fn at(&self, i: usize, j: usize) -> T {
        if self.transposed {
            self.data[j * self.stride + i]
        } else {
            self.data[i * self.stride + j]
        }
    }
}

impl<'a, T: Element> From<&'a Matrix<T>> for MatrixView<'a, T> {
    fn from(matrix: &'a Matrix<T>) -> Self {
        matrix.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix<f64> {
        Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn product_matches_hand_computation() {
        let a = sample();
        let b = Matrix::column(vec![1.0, 0.0, -1.0]);
        let c = a.dot(&b);
        assert_eq!(c.shape(), (2, 1));
        assert_eq!(c.as_slice(), &[-2.0, -2.0]);
    }

    #[test]
    fn transposed_view_aliases_without_copy() {
        let a = sample();
        let t = a.view().t();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 1), 6.0);
        assert_eq!(t.get(0, 1), 4.0);

        let mut owned = a.clone();
        owned.transpose();
        assert_eq!(owned, t.to_matrix());
        // the source is still intact after the view is gone
        assert_eq!(a.shape(), (2, 3));
    }

    #[test]
    fn transposed_view_product_equals_explicit_transpose() {
        let w = sample();
        let d = Matrix::column(vec![0.5, -1.0]);
        let mut wt = w.clone();
        wt.transpose();
        assert_eq!(w.view().t().dot(d.view()), wt.dot(&d));
    }

    #[test]
    fn in_place_product_replaces_shape() {
        let mut a = sample();
        let mut b = sample();
        b.transpose();
        a *= &b;
        assert_eq!(a.shape(), (2, 2));
        assert_eq!(a.as_slice(), &[14.0, 32.0, 32.0, 77.0]);
    }

    #[test]
    fn elementwise_operations() {
        let mut a = sample();
        let b = Matrix::filled(2, 3, 2.0);
        a += &b;
        assert_eq!(a[(0, 0)], 3.0);
        a -= &b;
        a.hadamard(&b);
        assert_eq!(a[(1, 2)], 12.0);
        a *= 0.5;
        assert_eq!(a, sample());
        a.fill(1.5);
        assert!(a.as_slice().iter().all(|&x| x == 1.5));
    }

    #[test]
    fn sigmoid_stays_in_open_unit_interval() {
        let mut m = Matrix::column(vec![-20.0, -1.0, 0.0, 1.0, 20.0]);
        m.sigmoid();
        assert!(m.as_slice().iter().all(|&x| x > 0.0 && x < 1.0));
        assert_eq!(m[(2, 0)], 0.5);
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        let m = Matrix::column(vec![0.1, 0.7, 0.7, 0.2]);
        assert_eq!(m.argmax(), 1);
    }

    #[test]
    #[should_panic(expected = "addition on mismatched shapes")]
    fn elementwise_shape_mismatch_panics() {
        let mut a = sample();
        a += &Matrix::new(3, 2);
    }

    #[test]
    #[should_panic(expected = "product of 2x3 and 2x3")]
    fn product_shape_mismatch_panics() {
        sample().dot(&sample());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_access_panics() {
        let a = sample();
        let _ = a[(0, 3)];
    }

    #[test]
    #[should_panic(expected = "cannot back")]
    fn from_vec_checks_length() {
        Matrix::<f32>::from_vec(2, 2, vec![1.0; 3]);
    }
}
