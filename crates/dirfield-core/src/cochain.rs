//! Cochains, i.e. real values assigned to a set of mesh elements or dual cycles.

use nalgebra as na;

/// Marker types naming the set of elements a [`Cochain`] lives on.
pub trait CellKind {
    /// Human-readable name used in debug output.
    const NAME: &'static str;
}

impl CellKind for crate::mesh::Vertex {
    const NAME: &'static str = "vertex";
}
impl CellKind for crate::mesh::Edge {
    const NAME: &'static str = "edge";
}
impl CellKind for crate::mesh::Face {
    const NAME: &'static str = "face";
}
impl CellKind for crate::cycles::Cycle {
    const NAME: &'static str = "cycle";
}

/// A vector of values corresponding to
/// one kind of element of a mesh (vertices, edges, faces)
/// or to the cycles of a [`CycleBasis`][crate::CycleBasis].
///
/// Cochains can be constructed using
/// [`TriMesh::new_zero_cochain`][crate::TriMesh::new_zero_cochain]
/// and [`CycleBasis::new_zero_cochain`][crate::CycleBasis::new_zero_cochain],
/// and are produced by most computations in this crate.
/// The element type parameter makes sure that e.g. per-edge angles
/// can't be accidentally passed where per-cycle values are expected.
#[derive(Clone)]
pub struct Cochain<Cell> {
    /// The underlying vector of real values, exposed for convenience.
    ///
    /// Note that changing the dimension of this vector at runtime
    /// will cause a dimension mismatch with operators,
    /// leading to a panic when an operator is applied.
    /// Use with caution.
    pub values: na::DVector<f64>,
    _marker: std::marker::PhantomData<Cell>,
}

impl<Cell> Cochain<Cell> {
    // constructors only exposed to crate
    // because cochains are always sized by a mesh or cycle basis;
    // public constructors are methods on those

    #[inline]
    pub(crate) fn from_values(values: na::DVector<f64>) -> Self {
        Self {
            values,
            _marker: std::marker::PhantomData,
        }
    }

    #[inline]
    pub(crate) fn zeros(len: usize) -> Self {
        Self::from_values(na::DVector::zeros(len))
    }

    /// Number of values in the cochain.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the cochain has no values at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The largest absolute value in the cochain, or zero if it's empty.
    #[inline]
    pub fn max_abs(&self) -> f64 {
        self.values.amax()
    }
}

impl<Cell> crate::operator::Operand for Cochain<Cell> {
    type Cell = Cell;

    fn values(&self) -> &na::DVector<f64> {
        &self.values
    }

    fn from_values(values: na::DVector<f64>) -> Self {
        Self::from_values(values)
    }
}

impl<Cell: CellKind> std::fmt::Debug for Cochain<Cell> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cochain, values {:?}", Cell::NAME, self.values)
    }
}

impl<Cell> PartialEq for Cochain<Cell> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

// index with views

impl<'a> std::ops::Index<crate::mesh::EdgeView<'a>> for Cochain<crate::mesh::Edge> {
    type Output = f64;

    fn index(&self, edge: crate::mesh::EdgeView<'a>) -> &Self::Output {
        &self.values[edge.index()]
    }
}

impl<'a> std::ops::IndexMut<crate::mesh::EdgeView<'a>> for Cochain<crate::mesh::Edge> {
    fn index_mut(&mut self, edge: crate::mesh::EdgeView<'a>) -> &mut Self::Output {
        &mut self.values[edge.index()]
    }
}

impl<'a> std::ops::Index<crate::mesh::FaceView<'a>> for Cochain<crate::mesh::Face> {
    type Output = f64;

    fn index(&self, face: crate::mesh::FaceView<'a>) -> &Self::Output {
        &self.values[face.index()]
    }
}

impl<'a> std::ops::IndexMut<crate::mesh::FaceView<'a>> for Cochain<crate::mesh::Face> {
    fn index_mut(&mut self, face: crate::mesh::FaceView<'a>) -> &mut Self::Output {
        &mut self.values[face.index()]
    }
}

// math ops
// (only the reference combinations used in the crate)

impl<Cell> std::ops::Add<&Cochain<Cell>> for Cochain<Cell> {
    type Output = Self;

    fn add(self, rhs: &Cochain<Cell>) -> Self::Output {
        Cochain::from_values(self.values + &rhs.values)
    }
}

impl<Cell> std::ops::Add for &Cochain<Cell> {
    type Output = Cochain<Cell>;

    fn add(self, rhs: Self) -> Self::Output {
        Cochain::from_values(&self.values + &rhs.values)
    }
}

impl<Cell> std::ops::AddAssign<&Cochain<Cell>> for Cochain<Cell> {
    fn add_assign(&mut self, rhs: &Cochain<Cell>) {
        self.values += &rhs.values;
    }
}

impl<Cell> std::ops::Neg for Cochain<Cell> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_values(-self.values)
    }
}

impl<Cell> std::ops::Sub<&Cochain<Cell>> for Cochain<Cell> {
    type Output = Self;

    fn sub(self, rhs: &Cochain<Cell>) -> Self::Output {
        Cochain::from_values(self.values - &rhs.values)
    }
}

impl<Cell> std::ops::Sub for &Cochain<Cell> {
    type Output = Cochain<Cell>;

    fn sub(self, rhs: Self) -> Self::Output {
        Cochain::from_values(&self.values - &rhs.values)
    }
}

impl<Cell> std::ops::SubAssign<&Cochain<Cell>> for Cochain<Cell> {
    fn sub_assign(&mut self, rhs: &Cochain<Cell>) {
        self.values -= &rhs.values;
    }
}

impl<Cell> std::ops::Mul<Cochain<Cell>> for f64 {
    type Output = Cochain<Cell>;

    fn mul(self, rhs: Cochain<Cell>) -> Self::Output {
        Cochain::from_values(self * rhs.values)
    }
}

impl<Cell> std::ops::Mul<&Cochain<Cell>> for f64 {
    type Output = Cochain<Cell>;

    fn mul(self, rhs: &Cochain<Cell>) -> Self::Output {
        Cochain::from_values(self * &rhs.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, Edge};

    #[test]
    fn arithmetic_and_view_indexing() {
        let mesh = shapes::hexagon_disc();
        let mut a = mesh.new_zero_cochain::<Edge>();
        for edge in mesh.edges() {
            a[edge] = edge.index() as f64;
        }
        let b = 2.0 * &a;
        let c = &b - &a;
        assert_eq!(c, a);
        let mut d = b.clone();
        d -= &a;
        assert_eq!(d, a);
        assert_eq!((-c + &b).values, a.values);
        assert_eq!(a.max_abs(), 11.0);
        assert!(format!("{a:?}").starts_with("edge cochain"));
    }
}
