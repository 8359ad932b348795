//! Poly-vector fields: N-directional fields with no symmetry requirement,
//! represented per face as the coefficients of the monic polynomial
//! whose roots are the field's directions.
//!
//! A polynomial `z^N + c_{N-1} z^{N-1} + … + c_0` in a face's tangent frame
//! is smooth across an edge when every coefficient agrees
//! after rotating both frames onto the edge direction `e`,
//! i.e. `c_n^f conj(e_f)^(N-n) = c_n^g conj(e_g)^(N-n)`.
//! Each coefficient index `n` gives an independent sparse least-squares problem
//! whose soft constraints pull the chosen faces towards prescribed directions.
//!
//! Complex systems are solved through the real embedding
//! `a + bi ↦ [[a, -b], [b, a]]`, which turns the Hermitian normal equations
//! into real symmetric positive definite ones.

use nalgebra as na;
use nalgebra_sparse as nas;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    mesh::TriMesh,
    representative::RawField,
    solver::{SolverError, SpdSolver},
    Complex, Vec3,
};

/// Directions prescribed on a subset of faces.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftConstraints {
    degree: usize,
    faces: Vec<usize>,
    /// `degree` consecutive directions per constrained face
    directions: Vec<Vec3>,
}

impl SoftConstraints {
    /// Constrain each of `faces` towards `degree` directions,
    /// given as a flat list with `degree` consecutive entries per face.
    pub fn new(degree: usize, faces: Vec<usize>, directions: Vec<Vec3>) -> Result<Self, SolverError> {
        if degree == 0 {
            return Err(SolverError::InvalidDegree);
        }
        if directions.len() != faces.len() * degree {
            return Err(SolverError::DimensionMismatch {
                what: "constraint directions",
                expected: faces.len() * degree,
                actual: directions.len(),
            });
        }
        Ok(Self {
            degree,
            faces,
            directions,
        })
    }

    /// No constraints at all. Synthesis produces the zero field.
    pub fn empty(degree: usize) -> Result<Self, SolverError> {
        Self::new(degree, Vec::new(), Vec::new())
    }

    /// Number of directions per constrained face.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The constrained faces.
    #[inline]
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// The directions of the `i`th constrained face.
    #[inline]
    pub fn directions(&self, i: usize) -> &[Vec3] {
        &self.directions[i * self.degree..(i + 1) * self.degree]
    }

    /// Whether there are no constrained faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Per-face coefficients of a poly-vector field.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyVectorField {
    degree: usize,
    /// `degree` coefficients per face, `c_0` first
    coefficients: Vec<Complex>,
}

impl PolyVectorField {
    fn zeros(degree: usize, face_count: usize) -> Self {
        Self {
            degree,
            coefficients: vec![Complex::new(0.0, 0.0); degree * face_count],
        }
    }

    /// Number of directions per face.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of faces the field covers.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.coefficients.len() / self.degree
    }

    /// Coefficients `c_0 … c_{N-1}` of a face's monic polynomial.
    #[inline]
    pub fn coefficients(&self, face: usize) -> &[Complex] {
        &self.coefficients[face * self.degree..(face + 1) * self.degree]
    }

    /// The directions of a face, as complex numbers in its tangent frame,
    /// sorted counter-clockwise by angle.
    pub fn roots(&self, face: usize) -> Result<Vec<Complex>, SolverError> {
        let mut roots =
            monic_polynomial_roots(self.coefficients(face)).ok_or(SolverError::RootFinding { face })?;
        roots.sort_by(|a, b| a.arg().total_cmp(&b.arg()));
        Ok(roots)
    }

    /// Extract the directions of every face into a raw field.
    ///
    /// Vector lengths are kept as they come out of the polynomial;
    /// faces where the field vanishes get zero vectors.
    pub fn to_raw(&self, mesh: &TriMesh) -> Result<RawField, SolverError> {
        let mut vectors = Vec::with_capacity(self.coefficients.len());
        for (face, basis) in mesh.bases().iter().enumerate().take(self.face_count()) {
            vectors.extend(self.roots(face)?.into_iter().map(|r| basis.from_complex(r)));
        }
        Ok(RawField::new(self.degree, vectors))
    }

    /// Largest difference between the field's coefficients
    /// and the ones the constraints ask for on the constrained faces.
    pub fn constraint_residual(&self, mesh: &TriMesh, constraints: &SoftConstraints) -> f64 {
        constraint_targets(mesh, constraints)
            .iter()
            .zip(constraints.faces())
            .flat_map(|(target, &face)| {
                target
                    .iter()
                    .zip(self.coefficients(face))
                    .map(|(t, c)| (t - c).norm())
            })
            .fold(0.0, f64::max)
    }
}

/// One interior edge's contribution to the smoothness energy.
#[derive(Clone, Copy, Debug)]
struct EdgeTerm {
    left: usize,
    right: usize,
    /// the edge's unit direction in the left face's frame
    left_dir: Complex,
    /// the edge's unit direction in the right face's frame
    right_dir: Complex,
}

/// The system of one polynomial coefficient.
struct CoefficientSystem {
    /// transpose of the real-embedded system matrix, `2F × 2M`
    a_t: nas::CsrMatrix<f64>,
    normal_solver: SpdSolver,
}

impl CoefficientSystem {
    fn assemble(
        edge_terms: &[EdgeTerm],
        soft_faces: &[usize],
        face_count: usize,
        power: usize,
        soft_weight: f64,
    ) -> Result<Self, SolverError> {
        let row_count = edge_terms.len() + soft_faces.len();
        let mut coo = nas::CooMatrix::new(2 * row_count, 2 * face_count);
        let mut push_complex = |row: usize, col: usize, val: Complex| {
            coo.push(row, col, val.re);
            coo.push(row, face_count + col, -val.im);
            coo.push(row_count + row, col, val.im);
            coo.push(row_count + row, face_count + col, val.re);
        };

        for (row, term) in edge_terms.iter().enumerate() {
            push_complex(row, term.left, term.left_dir.conj().powu(power as u32));
            push_complex(row, term.right, -term.right_dir.conj().powu(power as u32));
        }
        let sqrt_weight = soft_weight.sqrt();
        for (i, &face) in soft_faces.iter().enumerate() {
            push_complex(edge_terms.len() + i, face, Complex::new(sqrt_weight, 0.0));
        }

        let a = nas::CsrMatrix::from(&coo);
        let a_t = a.transpose();
        let normal = &a_t * &a;
        let normal_solver = SpdSolver::factor(&normal, "poly-vector")?;
        Ok(Self { a_t, normal_solver })
    }

    /// Solve for one coefficient on every face, given its target on every soft face.
    fn solve(
        &self,
        edge_count: usize,
        soft_targets: &[Complex],
        soft_weight: f64,
    ) -> Result<Vec<Complex>, SolverError> {
        let row_count = edge_count + soft_targets.len();
        let sqrt_weight = soft_weight.sqrt();
        let mut rhs = na::DVector::zeros(2 * row_count);
        for (i, target) in soft_targets.iter().enumerate() {
            rhs[edge_count + i] = sqrt_weight * target.re;
            rhs[row_count + edge_count + i] = sqrt_weight * target.im;
        }
        let sol = self.normal_solver.solve(&(&self.a_t * &rhs))?;
        let face_count = sol.len() / 2;
        Ok((0..face_count)
            .map(|f| Complex::new(sol[f], sol[face_count + f]))
            .collect())
    }
}

/// Factored poly-vector systems for a fixed mesh and set of constrained faces.
///
/// Preparing factors one sparse system per polynomial coefficient;
/// the factorizations can then be reused for any directions on the same faces.
/// They're released when the solver is dropped.
pub struct PolyVectorSolver {
    degree: usize,
    face_count: usize,
    interior_edge_count: usize,
    soft_faces: Vec<usize>,
    soft_weight: f64,
    systems: Vec<CoefficientSystem>,
}

impl PolyVectorSolver {
    /// Assemble and factor the systems for the given constrained faces.
    ///
    /// `soft_weight` scales how strongly constrained faces are pulled
    /// towards their targets compared to smoothness.
    pub fn prepare(
        mesh: &TriMesh,
        soft_faces: &[usize],
        degree: usize,
        soft_weight: f64,
    ) -> Result<Self, SolverError> {
        if degree == 0 {
            return Err(SolverError::InvalidDegree);
        }
        if let Some(&index) = soft_faces.iter().find(|&&f| f >= mesh.face_count()) {
            return Err(SolverError::InvalidFaceIndex {
                index,
                face_count: mesh.face_count(),
            });
        }

        let edge_terms: Vec<EdgeTerm> = mesh
            .interior_edges()
            .filter_map(|edge| {
                let ef = edge.faces();
                let right = ef.right?;
                let e = edge.vector();
                let bases = mesh.bases();
                Some(EdgeTerm {
                    left: ef.left,
                    right,
                    left_dir: unit(bases[ef.left].to_complex(&e)),
                    right_dir: unit(bases[right].to_complex(&e)),
                })
            })
            .collect();

        // without constraints the result is always zero
        // and the systems would be singular anyway
        let systems = if soft_faces.is_empty() {
            Vec::new()
        } else {
            let face_count = mesh.face_count();
            let assemble = |n: usize| {
                CoefficientSystem::assemble(
                    &edge_terms,
                    soft_faces,
                    face_count,
                    degree - n,
                    soft_weight,
                )
            };
            #[cfg(feature = "rayon")]
            let systems: Result<Vec<_>, SolverError> =
                (0..degree).into_par_iter().map(assemble).collect();
            #[cfg(not(feature = "rayon"))]
            let systems: Result<Vec<_>, SolverError> = (0..degree).map(assemble).collect();
            systems?
        };

        log::debug!(
            "prepared poly-vector solver: degree {degree}, {} faces, {} constrained",
            mesh.face_count(),
            soft_faces.len()
        );

        Ok(Self {
            degree,
            face_count: mesh.face_count(),
            interior_edge_count: edge_terms.len(),
            soft_faces: soft_faces.to_vec(),
            soft_weight,
            systems,
        })
    }

    /// Solve for the field given directions on the constrained faces.
    ///
    /// The constraints must be on the same faces, in the same order,
    /// as the ones the solver was prepared with.
    pub fn solve(
        &self,
        mesh: &TriMesh,
        constraints: &SoftConstraints,
    ) -> Result<PolyVectorField, SolverError> {
        if constraints.degree() != self.degree {
            return Err(SolverError::DimensionMismatch {
                what: "directions per constrained face",
                expected: self.degree,
                actual: constraints.degree(),
            });
        }
        if constraints.faces() != self.soft_faces.as_slice() {
            return Err(SolverError::DimensionMismatch {
                what: "constrained faces matching the prepared ones",
                expected: self.soft_faces.len(),
                actual: constraints.faces().len(),
            });
        }
        if self.soft_faces.is_empty() {
            return Ok(PolyVectorField::zeros(self.degree, self.face_count));
        }

        let targets = constraint_targets(mesh, constraints);
        let solve_coefficient = |(n, system): (usize, &CoefficientSystem)| {
            let soft_targets: Vec<Complex> = targets.iter().map(|t| t[n]).collect();
            system.solve(self.interior_edge_count, &soft_targets, self.soft_weight)
        };
        #[cfg(feature = "rayon")]
        let columns: Result<Vec<Vec<Complex>>, SolverError> =
            self.systems.par_iter().enumerate().map(solve_coefficient).collect();
        #[cfg(not(feature = "rayon"))]
        let columns: Result<Vec<Vec<Complex>>, SolverError> =
            self.systems.iter().enumerate().map(solve_coefficient).collect();
        let columns = columns?;

        let mut field = PolyVectorField::zeros(self.degree, self.face_count);
        for (n, column) in columns.iter().enumerate() {
            for (f, c) in column.iter().enumerate() {
                field.coefficients[f * self.degree + n] = *c;
            }
        }
        Ok(field)
    }
}

/// Compute a smooth poly-vector field interpolating the constraints,
/// preparing and releasing the factorizations within the call.
pub fn poly_vector(
    mesh: &TriMesh,
    constraints: &SoftConstraints,
    soft_weight: f64,
) -> Result<PolyVectorField, SolverError> {
    if constraints.is_empty() {
        return Ok(PolyVectorField::zeros(constraints.degree(), mesh.face_count()));
    }
    PolyVectorSolver::prepare(mesh, constraints.faces(), constraints.degree(), soft_weight)?
        .solve(mesh, constraints)
}

/// Polynomial coefficients the constraints ask for, per constrained face.
fn constraint_targets(mesh: &TriMesh, constraints: &SoftConstraints) -> Vec<Vec<Complex>> {
    constraints
        .faces()
        .iter()
        .enumerate()
        .map(|(i, &face)| {
            let basis = &mesh.bases()[face];
            let roots: Vec<Complex> = constraints
                .directions(i)
                .iter()
                .map(|d| basis.to_complex(d))
                .collect();
            roots_to_monic_polynomial(&roots)
        })
        .collect()
}

#[inline]
fn unit(z: Complex) -> Complex {
    z / z.norm()
}

/// Coefficients `c_0 … c_{N-1}` of the monic polynomial with the given roots,
/// `∏ (z - r_i) = z^N + c_{N-1} z^{N-1} + … + c_0`.
pub fn roots_to_monic_polynomial(roots: &[Complex]) -> Vec<Complex> {
    // coefficients from lowest degree, including the leading one
    let mut poly = vec![Complex::new(1.0, 0.0)];
    for root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); poly.len() + 1];
        for (k, c) in poly.iter().enumerate() {
            next[k + 1] += c;
            next[k] -= root * c;
        }
        poly = next;
    }
    poly.pop();
    poly
}

/// Roots of the monic polynomial `z^N + c_{N-1} z^{N-1} + … + c_0`,
/// in no particular order.
///
/// Uses the eigenvalues of the companion matrix,
/// refined with a couple of Newton steps.
/// Returns `None` if the eigenvalue iteration doesn't converge.
pub fn monic_polynomial_roots(coefficients: &[Complex]) -> Option<Vec<Complex>> {
    let degree = coefficients.len();
    match degree {
        0 => return Some(Vec::new()),
        1 => return Some(vec![-coefficients[0]]),
        _ => {}
    }
    // a vanishing field has all roots at zero
    if coefficients.iter().all(|c| c.norm() < 1e-14) {
        return Some(vec![Complex::new(0.0, 0.0); degree]);
    }

    let mut companion = na::DMatrix::<Complex>::zeros(degree, degree);
    for i in 1..degree {
        companion[(i, i - 1)] = Complex::new(1.0, 0.0);
    }
    for (i, c) in coefficients.iter().enumerate() {
        companion[(i, degree - 1)] = -c;
    }
    let (_, triangular) = companion.try_schur(1e-14, 1000)?.unpack();
    let mut roots: Vec<Complex> = triangular.diagonal().iter().copied().collect();

    // polish with Newton's method, keeping only steps that improve the residual
    let eval = |z: Complex| -> (Complex, Complex) {
        let mut p = Complex::new(1.0, 0.0);
        let mut dp = Complex::new(0.0, 0.0);
        for c in coefficients.iter().rev() {
            dp = dp * z + p;
            p = p * z + c;
        }
        (p, dp)
    };
    for root in &mut roots {
        for _ in 0..2 {
            let (p, dp) = eval(*root);
            if dp.norm() < 1e-300 {
                break;
            }
            let candidate = *root - p / dp;
            if eval(candidate).0.norm() < p.norm() {
                *root = candidate;
            } else {
                break;
            }
        }
    }
    Some(roots)
}
