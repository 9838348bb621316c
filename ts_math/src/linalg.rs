//! Small dense linear algebra for state-space and regression work

use crate::{MathError, Result};

/// Row-major dense matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create an identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build a matrix from row vectors
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(MathError::InvalidInput(
                "All rows must have the same length".to_string(),
            ));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    /// Outer product `v v'`
    pub fn outer(v: &[f64]) -> Self {
        let n = v.len();
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                m.set(i, j, v[i] * v[j]);
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// Copy of row `i`
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data[i * self.cols..(i + 1) * self.cols].to_vec()
    }

    /// Copy of column `j`
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.set(j, i, self.get(i, j));
            }
        }
        t
    }

    /// Matrix product `self * other`
    pub fn mul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(MathError::InvalidInput(format!(
                "Cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Ok(out)
    }

    /// Matrix-vector product `self * v`
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>> {
        if self.cols != v.len() {
            return Err(MathError::InvalidInput(format!(
                "Cannot multiply {}x{} by vector of length {}",
                self.rows,
                self.cols,
                v.len()
            )));
        }
        Ok((0..self.rows)
            .map(|i| (0..self.cols).map(|j| self.get(i, j) * v[j]).sum())
            .collect())
    }

    /// Element-wise sum
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(MathError::InvalidInput(
                "Matrix dimensions do not match".to_string(),
            ));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a + b)
                .collect(),
        })
    }
}

/// Solve `a x = b` for square `a` by Gaussian elimination with partial pivoting.
pub fn solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    let n = a.rows();
    if a.cols() != n || b.len() != n {
        return Err(MathError::InvalidInput(
            "solve requires a square system".to_string(),
        ));
    }

    let mut m = a.clone();
    let mut rhs = b.to_vec();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| m.get(x, col).abs().total_cmp(&m.get(y, col).abs()))
            .unwrap_or(col);
        if m.get(pivot, col).abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Matrix is singular to working precision".to_string(),
            ));
        }
        if pivot != col {
            for j in 0..n {
                let tmp = m.get(col, j);
                m.set(col, j, m.get(pivot, j));
                m.set(pivot, j, tmp);
            }
            rhs.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = m.get(row, col) / m.get(col, col);
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                m.set(row, j, m.get(row, j) - factor * m.get(col, j));
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| m.get(i, j) * x[j]).sum();
        x[i] = (rhs[i] - tail) / m.get(i, i);
    }
    Ok(x)
}

/// Ordinary least squares via the normal equations.
///
/// `design` is n x k; returns the k coefficients minimizing `|y - X b|^2`.
pub fn least_squares(design: &Matrix, y: &[f64]) -> Result<Vec<f64>> {
    if design.rows() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but response has {} values",
            design.rows(),
            y.len()
        )));
    }
    if design.rows() < design.cols() {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for {} regressors",
            design.cols(),
            design.cols()
        )));
    }

    let xt = design.transpose();
    let xtx = xt.mul(design)?;
    let xty = xt.mul_vec(y)?;
    solve(&xtx, &xty)
}

/// Stationary covariance of `x' = T x + e`, `Var(e) = Q`.
///
/// Solves the discrete Lyapunov equation `P = T P T' + Q` through its
/// vectorized form `(I - T (x) T) vec(P) = vec(Q)`.
pub fn solve_discrete_lyapunov(t: &Matrix, q: &Matrix) -> Result<Matrix> {
    let n = t.rows();
    if t.cols() != n || q.rows() != n || q.cols() != n {
        return Err(MathError::InvalidInput(
            "Lyapunov equation needs square matrices of equal size".to_string(),
        ));
    }

    let size = n * n;
    let mut system = Matrix::identity(size);
    for i in 0..n {
        for j in 0..n {
            let row = i * n + j;
            for k in 0..n {
                let tik = t.get(i, k);
                if tik == 0.0 {
                    continue;
                }
                for l in 0..n {
                    let col = k * n + l;
                    system.set(row, col, system.get(row, col) - tik * t.get(j, l));
                }
            }
        }
    }

    let vec_q: Vec<f64> = (0..size).map(|idx| q.get(idx / n, idx % n)).collect();
    let vec_p = solve(&system, &vec_q)?;

    Ok(Matrix {
        rows: n,
        cols: n,
        data: vec_p,
    })
}
