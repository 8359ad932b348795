//! Trivial connections: the smallest rotation adjustment per edge
//! that gives a field prescribed singularity indices around every dual cycle.
//!
//! With `C` the [`CycleBasis`] matrix, `k` the indices and `h` the holonomy,
//! the adjustment `x` solves `C x = k·(2π/N) - h` with minimal norm,
//! i.e. `x = Cᵀ (C Cᵀ)⁻¹ b`.
//! `C Cᵀ` is only positive semidefinite because of the Gauss-Bonnet dependency
//! between vertex and boundary cycles, so the target is first projected
//! onto the range of `C` and a tiny diagonal shift makes the system factorable.
//! Iterative refinement with the same factorization removes the bias of the shift.

use std::f64::consts::TAU;

use crate::{
    cochain::Cochain,
    connection::DiscreteConnection,
    cycles::{Cycle, CycleBasis},
    mesh::Edge,
    operator::Operator,
    solver::{mean_diagonal, shift_diagonal, SolverError, SpdSolver},
};

/// Numerical settings of the trivial connection solve.
#[derive(Clone, Copy, Debug)]
pub struct TrivialConnectionParams {
    /// Diagonal shift relative to the mean diagonal of `C Cᵀ`.
    pub regularization: f64,
    /// Maximum number of iterative refinement passes after the first solve.
    pub refinement_steps: usize,
    /// Residual below which a solution counts as satisfying all constraints.
    pub residual_tolerance: f64,
}

impl Default for TrivialConnectionParams {
    fn default() -> Self {
        Self {
            regularization: 1e-10,
            refinement_steps: 3,
            residual_tolerance: 1e-9,
        }
    }
}

/// Result of a trivial connection solve.
#[derive(Clone, Debug)]
pub struct TrivialConnection {
    /// Rotation to add on top of the parallel transport of every edge.
    pub adjustment: Cochain<Edge>,
    /// Largest violation of the cycle constraints, `‖C x - b‖∞`.
    /// Non-zero when the prescribed indices are infeasible.
    pub residual: f64,
    /// How far the indices of vertex and boundary cycles are
    /// from the sum Gauss-Bonnet requires, in index units.
    pub gauss_bonnet_defect: f64,
}

impl TrivialConnection {
    /// Whether the solution satisfies every cycle constraint within `tolerance`.
    #[inline]
    pub fn is_feasible(&self, tolerance: f64) -> bool {
        self.residual <= tolerance
    }
}

/// Compute the minimal adjustment giving a field of the given degree
/// the prescribed index around every cycle of the basis.
///
/// `indices` has one entry per cycle, in the basis' row order.
/// Infeasible indices don't fail the solve:
/// the least-squares adjustment is returned with a non-zero residual.
pub fn trivial_connection(
    basis: &CycleBasis,
    connection: &DiscreteConnection,
    indices: &[i32],
    degree: usize,
    params: &TrivialConnectionParams,
) -> Result<TrivialConnection, SolverError> {
    if degree == 0 {
        return Err(SolverError::InvalidDegree);
    }
    if indices.len() != basis.cycle_count() {
        return Err(SolverError::DimensionMismatch {
            what: "singularity indices",
            expected: basis.cycle_count(),
            actual: indices.len(),
        });
    }

    let step = TAU / degree as f64;
    let holonomy = connection.holonomy(basis);
    let mut target: Cochain<Cycle> = basis.new_zero_cochain();
    for (t, (&k, h)) in target
        .values
        .iter_mut()
        .zip(indices.iter().zip(holonomy.values.iter()))
    {
        *t = k as f64 * step - h;
    }

    // the only thing C can't reproduce is a nonzero sum over the dependent rows.
    // spreading that sum evenly gives the closest reachable target
    let dependent_rows: Vec<usize> = (0..basis.cycle_count())
        .filter(|row| basis.is_dependent(*row))
        .collect();
    let dependent_sum: f64 = dependent_rows.iter().map(|row| target.values[*row]).sum();
    let gauss_bonnet_defect = dependent_sum / step;
    let mut reachable = target.clone();
    if !dependent_rows.is_empty() {
        let mean = dependent_sum / dependent_rows.len() as f64;
        for row in &dependent_rows {
            reachable.values[*row] -= mean;
        }
    }

    let gram = basis.operator().gram();
    let shift = params.regularization * mean_diagonal(gram.matrix()).max(1.0);
    let solver = SpdSolver::factor(&shift_diagonal(gram.matrix(), shift), "trivial connection")?;
    let basis_t = basis.operator().transpose();

    let mut adjustment = Cochain::<Edge>::zeros(basis.operator().matrix().ncols());
    let mut remaining = reachable.clone();
    let stop_threshold = 1e-15 * reachable.max_abs().max(1.0);
    for pass in 0..=params.refinement_steps {
        let y = Cochain::<Cycle>::from_values(solver.solve(&remaining.values)?);
        adjustment += &basis_t.apply(&y);
        remaining = &reachable - &(basis * &adjustment);
        log::trace!(
            "trivial connection pass {pass}: remaining {:e}",
            remaining.max_abs()
        );
        if remaining.max_abs() <= stop_threshold {
            break;
        }
    }

    let residual = (basis * &adjustment - &target).max_abs();
    if residual > params.residual_tolerance {
        log::warn!(
            "prescribed indices are infeasible: residual {residual:e}, \
             index sum off by {gauss_bonnet_defect:.3} from what Gauss-Bonnet requires"
        );
    } else {
        log::debug!(
            "trivial connection solved: {} cycles, residual {residual:e}, max adjustment {:.4}",
            basis.cycle_count(),
            adjustment.max_abs()
        );
    }

    Ok(TrivialConnection {
        adjustment,
        residual,
        gauss_bonnet_defect,
    })
}
