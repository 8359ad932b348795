//! Per-face field representations and the conversion between
//! edge adjustments and explicit directions.
//!
//! An N-directional field is stored either as a single representative direction
//! per face ([`RepresentativeField`], the other `N - 1` being implied by symmetry)
//! or with all `N` directions spelled out ([`RawField`]).

use fixedbitset as fb;
use nalgebra as na;

use std::collections::VecDeque;
use std::f64::consts::TAU;

use crate::{
    cochain::Cochain,
    connection::{wrap_to_period, DiscreteConnection},
    mesh::{Edge, Face, TriMesh},
    solver::SolverError,
    Vec3,
};

/// A rotationally symmetric N-directional field
/// given by one direction per face.
#[derive(Clone, Debug, PartialEq)]
pub struct RepresentativeField {
    degree: usize,
    directions: Vec<Vec3>,
}

impl RepresentativeField {
    /// Wrap one tangent direction per face.
    pub fn new(degree: usize, directions: Vec<Vec3>) -> Result<Self, SolverError> {
        if degree == 0 {
            return Err(SolverError::InvalidDegree);
        }
        Ok(Self { degree, directions })
    }

    /// Number of directions per face.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The representative direction of every face.
    #[inline]
    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    /// Angle of each face's direction in the face's tangent frame.
    pub fn local_angles(&self, mesh: &TriMesh) -> Cochain<Face> {
        let mut angles = mesh.new_zero_cochain::<Face>();
        for (face, dir) in mesh.faces().zip(&self.directions) {
            angles[face] = face.basis().angle_of(dir);
        }
        angles
    }

    /// Spell out all `N` directions per face,
    /// rotating the representative counter-clockwise in steps of `2π/N`.
    pub fn to_raw(&self, mesh: &TriMesh) -> RawField {
        let mut vectors = Vec::with_capacity(self.directions.len() * self.degree);
        for (basis, dir) in mesh.bases().iter().zip(&self.directions) {
            let z = basis.to_complex(dir);
            for i in 0..self.degree {
                let rot = na::Complex::from_polar(1.0, TAU * i as f64 / self.degree as f64);
                vectors.push(basis.from_complex(z * rot));
            }
        }
        RawField {
            degree: self.degree,
            vectors,
        }
    }
}

/// An N-directional field with all `N` vectors of every face stored explicitly,
/// in counter-clockwise order.
#[derive(Clone, Debug, PartialEq)]
pub struct RawField {
    degree: usize,
    /// stored flat, `degree` consecutive vectors per face
    vectors: Vec<Vec3>,
}

impl RawField {
    /// Wrap a flat list of vectors, `degree` per face.
    ///
    /// # Panics
    /// If the number of vectors isn't a multiple of `degree`.
    pub fn new(degree: usize, vectors: Vec<Vec3>) -> Self {
        assert!(
            degree > 0 && vectors.len() % degree == 0,
            "raw field needs {degree} vectors per face"
        );
        Self { degree, vectors }
    }

    /// Number of vectors per face.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of faces the field covers.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.vectors.len() / self.degree
    }

    /// The vectors of a single face.
    #[inline]
    pub fn face_vectors(&self, face: usize) -> &[Vec3] {
        &self.vectors[face * self.degree..(face + 1) * self.degree]
    }

    /// Iterate over the vectors of every face.
    #[inline]
    pub fn iter_faces(&self) -> std::slice::ChunksExact<'_, Vec3> {
        self.vectors.chunks_exact(self.degree)
    }

    /// All vectors as a flat slice.
    #[inline]
    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }
}

/// Integrate an edge adjustment into explicit per-face directions.
///
/// Faces are visited breadth-first from face 0, which gets the direction
/// at `global_rotation` in its tangent frame.
/// Crossing an edge from its left face to its right face
/// rotates the direction by the transport angle plus the adjustment,
/// crossing it the other way undoes that rotation.
/// Edges off the spanning tree are only consistent
/// if the adjustment satisfies a trivial connection's cycle constraints.
///
/// # Panics
/// If `adjustment` doesn't have one value per mesh edge
/// or `degree` is zero.
pub fn adjustment_to_representative(
    mesh: &TriMesh,
    connection: &DiscreteConnection,
    adjustment: &Cochain<Edge>,
    degree: usize,
    global_rotation: f64,
) -> RepresentativeField {
    assert_eq!(
        adjustment.len(),
        mesh.edge_count(),
        "adjustment must have a value per edge"
    );
    assert!(degree > 0, "field degree must be at least 1");
    let transport = connection.transport();
    let edge_faces = mesh.edge_faces();

    let mut angles = mesh.new_zero_cochain::<Face>();
    let mut visited = fb::FixedBitSet::with_capacity(mesh.face_count());
    let mut queue = VecDeque::new();
    // one tree per connected component, rooted at its lowest face
    for root in 0..mesh.face_count() {
        if visited.contains(root) {
            continue;
        }
        visited.insert(root);
        angles.values[root] = global_rotation;
        queue.push_back(root);

        while let Some(face) = queue.pop_front() {
            for &edge_idx in &mesh.face_edges()[face] {
                let ef = edge_faces[edge_idx];
                let Some(next) = ef.opposite(face) else {
                    continue;
                };
                if visited.contains(next) {
                    continue;
                }
                visited.insert(next);
                let turn = transport.values[edge_idx] + adjustment.values[edge_idx];
                angles.values[next] = if ef.left == face {
                    angles.values[face] + turn
                } else {
                    angles.values[face] - turn
                };
                queue.push_back(next);
            }
        }
    }

    let directions = mesh
        .bases()
        .iter()
        .zip(angles.values.iter())
        .map(|(basis, angle)| basis.direction(*angle))
        .collect();
    RepresentativeField { degree, directions }
}

/// Recover the edge adjustment of a representative field:
/// the rotation across every interior edge beyond parallel transport,
/// reduced modulo the field's symmetry into `[-π/N, π/N)`.
///
/// This inverts [`adjustment_to_representative`]
/// for adjustments that lie in that range.
pub fn representative_to_adjustment(
    mesh: &TriMesh,
    connection: &DiscreteConnection,
    field: &RepresentativeField,
) -> Cochain<Edge> {
    let angles = field.local_angles(mesh);
    let period = TAU / field.degree() as f64;
    let mut adjustment = mesh.new_zero_cochain::<Edge>();
    for edge in mesh.interior_edges() {
        let ef = edge.faces();
        let Some(right) = ef.right else {
            continue;
        };
        let rotation =
            angles.values[right] - angles.values[ef.left] - connection.transport()[edge];
        adjustment[edge] = wrap_to_period(rotation, period);
    }
    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cycles::CycleBasis,
        mesh::shapes,
        trivial_connection::{trivial_connection, TrivialConnection},
    };
    use approx::{abs_diff_eq, relative_eq};

    fn disc_with_singularity_pair(degree: usize) -> (TriMesh, DiscreteConnection, TrivialConnection) {
        let mesh = shapes::flat_disc(4, 12);
        let basis = CycleBasis::new(&mesh).unwrap();
        let connection = DiscreteConnection::new(&mesh);
        // +1 at the center, balanced by -1 on the boundary loop
        let mut indices = vec![0; basis.cycle_count()];
        indices[basis.vertex_cycle(0).unwrap()] = 1;
        *indices.last_mut().unwrap() = -1;
        let tc = trivial_connection(&basis, &connection, &indices, degree, &Default::default())
            .unwrap();
        assert!(tc.is_feasible(1e-9));
        (mesh, connection, tc)
    }

    #[test]
    fn zero_adjustment_on_flat_mesh_is_parallel() {
        let mesh = shapes::hexagon_disc();
        let connection = DiscreteConnection::new(&mesh);
        let zero = mesh.new_zero_cochain::<Edge>();
        let field = adjustment_to_representative(&mesh, &connection, &zero, 4, 0.3);

        assert!(relative_eq!(
            field.directions()[0],
            mesh.bases()[0].direction(0.3),
            epsilon = 1e-12
        ));
        for dir in field.directions() {
            assert!(relative_eq!(*dir, field.directions()[0], epsilon = 1e-12));
        }
    }

    #[test]
    fn global_rotation_rotates_every_face() {
        let (mesh, connection, tc) = disc_with_singularity_pair(4);
        let a = adjustment_to_representative(&mesh, &connection, &tc.adjustment, 4, 0.0);
        let b = adjustment_to_representative(&mesh, &connection, &tc.adjustment, 4, 0.5);
        let (angles_a, angles_b) = (a.local_angles(&mesh), b.local_angles(&mesh));
        for (alpha, beta) in angles_a.values.iter().zip(angles_b.values.iter()) {
            assert!(abs_diff_eq!(
                wrap_to_period(beta - alpha - 0.5, TAU),
                0.0,
                epsilon = 1e-9
            ));
        }
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        for degree in [1, 2, 4] {
            let (mesh, connection, tc) = disc_with_singularity_pair(degree);
            assert!(tc.adjustment.max_abs() < std::f64::consts::PI / degree as f64);

            let field =
                adjustment_to_representative(&mesh, &connection, &tc.adjustment, degree, 1.1);
            let recovered = representative_to_adjustment(&mesh, &connection, &field);
            for (orig, rec) in tc.adjustment.values.iter().zip(recovered.values.iter()) {
                assert!(
                    abs_diff_eq!(*orig, *rec, epsilon = 1e-9),
                    "adjustment {orig} came back as {rec} (degree {degree})"
                );
            }
        }
    }

    #[test]
    fn raw_field_rotates_counter_clockwise() {
        let mesh = shapes::octahedron();
        let directions = mesh.bases().iter().map(|b| b.direction(0.2)).collect();
        let field = RepresentativeField::new(3, directions).unwrap();
        let raw = field.to_raw(&mesh);
        assert_eq!(raw.face_count(), mesh.face_count());
        assert_eq!(raw.iter_faces().count(), mesh.face_count());
        for (basis, vectors) in mesh.bases().iter().zip(raw.iter_faces()) {
            for (i, v) in vectors.iter().enumerate() {
                let expected = 0.2 + TAU * i as f64 / 3.0;
                assert!(abs_diff_eq!(
                    wrap_to_period(basis.angle_of(v) - expected, TAU),
                    0.0,
                    epsilon = 1e-12
                ));
                assert!(relative_eq!(v.norm(), 1.0, epsilon = 1e-12));
            }
        }
        assert_eq!(raw.face_vectors(2), &raw.vectors()[6..9]);
    }

    #[test]
    fn zero_degree_is_rejected() {
        let mesh = shapes::octahedron();
        let directions = mesh.bases().iter().map(|b| b.direction(0.0)).collect();
        assert_eq!(
            RepresentativeField::new(0, directions).unwrap_err(),
            SolverError::InvalidDegree
        );
    }
}
