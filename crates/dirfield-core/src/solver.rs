//! Sparse Cholesky factorizations shared by the linear solves in this crate.

use nalgebra as na;
use nalgebra_sparse as nas;

/// Errors from setting up or running a linear solve.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The system matrix couldn't be factored, typically because it isn't positive definite.
    #[error("Failed to factor the {system} system")]
    Factorization {
        /// Which system failed.
        system: String,
    },
    /// The solve produced NaN or infinite values.
    #[error("The {system} solve produced non-finite values")]
    NonFiniteSolution {
        /// Which system failed.
        system: String,
    },
    /// An input had the wrong number of entries.
    #[error("Expected {expected} {what}, got {actual}")]
    DimensionMismatch {
        /// What was being counted.
        what: &'static str,
        /// The required count.
        expected: usize,
        /// The count that was given.
        actual: usize,
    },
    /// Fields need at least one direction per face.
    #[error("Field degree must be at least 1")]
    InvalidDegree,
    /// A constraint refers to a face that doesn't exist.
    #[error("Face index {index} out of range for a mesh with {face_count} faces")]
    InvalidFaceIndex {
        /// The offending index.
        index: usize,
        /// Number of faces in the mesh.
        face_count: usize,
    },
    /// Polynomial root extraction didn't converge.
    #[error("Root finding failed on face {face}")]
    RootFinding {
        /// The face whose polynomial couldn't be solved.
        face: usize,
    },
}

/// A Cholesky factorization of a sparse symmetric positive definite matrix,
/// kept around so that it can be reused for several right-hand sides.
pub(crate) struct SpdSolver {
    chol: nas::factorization::CscCholesky<f64>,
    dim: usize,
    system: &'static str,
}

impl SpdSolver {
    /// Factor a matrix. `system` names it in error messages and logs.
    pub fn factor(mat: &nas::CsrMatrix<f64>, system: &'static str) -> Result<Self, SolverError> {
        let csc = nas::CscMatrix::from(mat);
        let chol = nas::factorization::CscCholesky::factor(&csc).map_err(|err| {
            log::error!("cholesky factorization of the {system} system failed: {err}");
            SolverError::Factorization {
                system: system.to_string(),
            }
        })?;
        log::trace!(
            "factored {system} system: dimension {}, {} nonzeros in L",
            mat.nrows(),
            chol.l().nnz()
        );
        Ok(Self {
            chol,
            dim: mat.nrows(),
            system,
        })
    }

    /// Solve the system for a single right-hand side.
    pub fn solve(&self, rhs: &na::DVector<f64>) -> Result<na::DVector<f64>, SolverError> {
        if rhs.len() != self.dim {
            return Err(SolverError::DimensionMismatch {
                what: "right-hand side entries",
                expected: self.dim,
                actual: rhs.len(),
            });
        }
        let rhs_mat = na::DMatrix::from_column_slice(self.dim, 1, rhs.as_slice());
        let sol = self.chol.solve(&rhs_mat);
        let sol: na::DVector<f64> = sol.column(0).into_owned();
        if sol.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteSolution {
                system: self.system.to_string(),
            });
        }
        Ok(sol)
    }
}

/// Add `shift` to every diagonal entry of a square sparse matrix.
pub(crate) fn shift_diagonal(mat: &nas::CsrMatrix<f64>, shift: f64) -> nas::CsrMatrix<f64> {
    let mut identity = nas::CsrMatrix::identity(mat.nrows());
    identity *= shift;
    mat + &identity
}

/// Mean of the diagonal entries of a square sparse matrix.
pub(crate) fn mean_diagonal(mat: &nas::CsrMatrix<f64>) -> f64 {
    if mat.nrows() == 0 {
        return 0.0;
    }
    let total: f64 = (0..mat.nrows())
        .filter_map(|i| mat.get_entry(i, i))
        .map(|entry| entry.into_value())
        .sum();
    total / mat.nrows() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn solves_spd_system() {
        // 1D laplacian with a diagonal shift
        let n = 6;
        let mut coo = nas::CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 2.0);
            if i + 1 < n {
                coo.push(i, i + 1, -1.0);
                coo.push(i + 1, i, -1.0);
            }
        }
        let mat = shift_diagonal(&nas::CsrMatrix::from(&coo), 0.5);
        assert!(relative_eq!(mean_diagonal(&mat), 2.5));

        let solver = SpdSolver::factor(&mat, "test").unwrap();
        let rhs = na::DVector::from_fn(n, |i, _| i as f64 - 2.0);
        let sol = solver.solve(&rhs).unwrap();
        let residual = &mat * &sol - &rhs;
        assert!(residual.amax() < 1e-12, "residual too large: {residual}");

        assert!(matches!(
            solver.solve(&na::DVector::zeros(n + 1)),
            Err(SolverError::DimensionMismatch { expected: 6, actual: 7, .. })
        ));
    }

    #[test]
    fn indefinite_matrix_fails_to_factor() {
        let mut coo = nas::CooMatrix::new(2, 2);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, -1.0);
        assert!(matches!(
            SpdSolver::factor(&nas::CsrMatrix::from(&coo), "indefinite"),
            Err(SolverError::Factorization { .. })
        ));
    }
}
