//! Sparse linear maps between [`Cochain`][crate::Cochain]s,
//! typed by the element sets they consume and produce.

use nalgebra as na;
use nalgebra_sparse as nas;

use crate::cochain::Cochain;

//
// traits
//

/// A linear map from one kind of cochain to another.
pub trait Operator {
    /// The type of cochain this operator takes as an input.
    type Input: Operand;
    /// The type of cochain this operator produces as an output.
    type Output: Operand;

    /// Apply this operator to an input cochain.
    fn apply(&self, input: &Self::Input) -> Self::Output;
}

/// Trait implemented by [`Cochain`][crate::Cochain]s so that operators
/// can construct and deconstruct them generically.
pub trait Operand {
    /// The element marker of this cochain.
    type Cell;
    /// Get the underlying vector of values in the cochain.
    fn values(&self) -> &na::DVector<f64>;
    /// Construct a cochain from a vector of values.
    fn from_values(values: na::DVector<f64>) -> Self;
}

//
// concrete operators
//

/// A sparse matrix operator,
/// parameterized with the cochain types it consumes and produces.
///
/// Apply to a cochain with `&op * &cochain` or [`Operator::apply`].
#[derive(Clone, Debug)]
pub struct MatrixOperator<Input, Output> {
    mat: nas::CsrMatrix<f64>,
    _marker: std::marker::PhantomData<(Input, Output)>,
}

/// Shorthand for [`MatrixOperator`].
pub type Op<Input, Output> = MatrixOperator<Input, Output>;

impl<Input, Output> Operator for MatrixOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    type Input = Input;
    type Output = Output;

    fn apply(&self, input: &Self::Input) -> Self::Output {
        Self::Output::from_values(&self.mat * input.values())
    }
}

impl<Input, Output> MatrixOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    /// Access the underlying CSR matrix.
    #[inline]
    pub fn matrix(&self) -> &nas::CsrMatrix<f64> {
        &self.mat
    }

    /// The operator mapping the other way, represented by the transposed matrix.
    pub fn transpose(&self) -> MatrixOperator<Output, Input> {
        MatrixOperator::from(self.mat.transpose())
    }

    /// The symmetric positive semidefinite operator `A Aᵀ`
    /// acting on this operator's output space.
    pub fn gram(&self) -> MatrixOperator<Output, Output> {
        MatrixOperator::from(&self.mat * &self.mat.transpose())
    }
}

impl<L, R> PartialEq for MatrixOperator<L, R> {
    fn eq(&self, other: &Self) -> bool {
        self.mat == other.mat
    }
}

impl<Input, Output> From<nas::CsrMatrix<f64>> for MatrixOperator<Input, Output> {
    fn from(mat: nas::CsrMatrix<f64>) -> Self {
        Self {
            mat,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<O, C> std::ops::Mul<&Cochain<C>> for &MatrixOperator<Cochain<C>, O>
where
    O: Operand,
{
    type Output = O;

    fn mul(self, rhs: &Cochain<C>) -> Self::Output {
        self.apply(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, Edge, Vertex};

    /// The vertex-to-edge difference operator of a mesh,
    /// `(d f)(e) = f(ev[1]) - f(ev[0])`.
    fn vertex_difference(mesh: &crate::TriMesh) -> Op<Cochain<Vertex>, Cochain<Edge>> {
        let mut coo = nas::CooMatrix::new(mesh.edge_count(), mesh.vertex_count());
        for (edge_idx, [a, b]) in mesh.edge_vertices().iter().enumerate() {
            coo.push(edge_idx, *a, -1.0);
            coo.push(edge_idx, *b, 1.0);
        }
        MatrixOperator::from(nas::CsrMatrix::from(&coo))
    }

    #[test]
    fn apply_transpose_and_gram() {
        let mesh = shapes::hexagon_disc();
        let d = vertex_difference(&mesh);

        let mut f = mesh.new_zero_cochain::<Vertex>();
        for (i, val) in f.values.iter_mut().enumerate() {
            *val = i as f64;
        }
        let df = &d * &f;
        for (edge_idx, [a, b]) in mesh.edge_vertices().iter().enumerate() {
            assert_eq!(df.values[edge_idx], *b as f64 - *a as f64);
        }

        // the gram operator of the transpose is the graph laplacian,
        // which annihilates constants
        let laplacian = d.transpose().gram();
        let mut ones = mesh.new_zero_cochain::<Vertex>();
        ones.values.fill(1.0);
        assert!((&laplacian * &ones).values.iter().all(|v| *v == 0.0));
        // center vertex of the hexagon has degree 6
        assert_eq!(laplacian.matrix().get_entry(3, 3).unwrap().into_value(), 6.0);

        assert_eq!(d.gram().matrix().nrows(), mesh.edge_count());
        assert_eq!(d.transpose().transpose(), d);
    }
}
