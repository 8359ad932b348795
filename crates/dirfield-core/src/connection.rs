//! The baseline discrete Levi-Civita connection of a mesh:
//! how tangent directions rotate when moved across edges,
//! and the curvature this leaves around dual cycles.

use std::f64::consts::{PI, TAU};

use crate::{
    cochain::Cochain,
    cycles::{Cycle, CycleBasis, CycleKind},
    mesh::{Edge, TriMesh, Vertex},
};

/// Reduce an angle into `[-π, π)`.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    wrap_to_period(angle, TAU)
}

/// Reduce an angle into `[-period / 2, period / 2)`.
#[inline]
pub fn wrap_to_period(angle: f64, period: f64) -> f64 {
    angle - period * (angle / period + 0.5).floor()
}

/// Parallel transport angles and angle defects of a mesh.
///
/// A direction at angle `φ` in the left face of an edge (measured in its
/// [`TangentBasis`][crate::mesh::TangentBasis]) corresponds to the direction
/// at angle `φ + transport[e]` in the right face.
#[derive(Clone, Debug)]
pub struct DiscreteConnection {
    transport: Cochain<Edge>,
    angle_defects: Cochain<Vertex>,
}

impl DiscreteConnection {
    /// Compute the connection of a mesh.
    pub fn new(mesh: &TriMesh) -> Self {
        let bases = mesh.bases();

        let mut transport = mesh.new_zero_cochain::<Edge>();
        for edge in mesh.interior_edges() {
            let faces = edge.faces();
            let Some(right) = faces.right else {
                continue;
            };
            let edge_vec = edge.vector();
            let left_angle = bases[faces.left].angle_of(&edge_vec);
            let right_angle = bases[right].angle_of(&edge_vec);
            transport[edge] = wrap_angle(right_angle - left_angle);
        }

        // interior vertices are full disc neighborhoods (2π when flat),
        // boundary vertices half discs (π when straight)
        let mut angle_defects = mesh.new_zero_cochain::<Vertex>();
        for v in 0..mesh.vertex_count() {
            angle_defects.values[v] = if mesh.boundary_vertices().contains(v) {
                PI
            } else {
                TAU
            };
        }
        let verts = mesh.vertices();
        for tri in mesh.triangles() {
            for corner in 0..3 {
                let here = verts[tri[corner]];
                let to_next = verts[tri[(corner + 1) % 3]] - here;
                let to_prev = verts[tri[(corner + 2) % 3]] - here;
                angle_defects.values[tri[corner]] -= to_next.angle(&to_prev);
            }
        }

        Self {
            transport,
            angle_defects,
        }
    }

    /// Rotation across every edge, zero on the boundary.
    #[inline]
    pub fn transport(&self) -> &Cochain<Edge> {
        &self.transport
    }

    /// Gaussian curvature concentrated at interior vertices
    /// and geodesic curvature at boundary vertices.
    #[inline]
    pub fn angle_defects(&self) -> &Cochain<Vertex> {
        &self.angle_defects
    }

    /// Rotation a tangent vector undergoes
    /// when transported around each cycle of the basis.
    ///
    /// Vertex cycles use the exact angle defect,
    /// which can exceed `π` in magnitude around sharp vertices.
    /// Other cycles only know the rotation modulo `2π`
    /// and report it in `[-π, π)`.
    pub fn holonomy(&self, basis: &CycleBasis) -> Cochain<Cycle> {
        let mut holonomy = basis * &self.transport;
        for (value, kind) in holonomy.values.iter_mut().zip(basis.kinds()) {
            *value = match *kind {
                CycleKind::Vertex(v) => self.angle_defects.values[v],
                CycleKind::Boundary(_) | CycleKind::Generator(_) => wrap_angle(*value),
            };
        }
        holonomy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use approx::{abs_diff_eq, relative_eq};
    use proptest::prelude::*;

    #[test]
    fn angle_defects_satisfy_gauss_bonnet() {
        for mesh in [
            shapes::octahedron(),
            shapes::cube(),
            shapes::hexagon_disc(),
            shapes::flat_disc(3, 9),
            shapes::torus(9, 7, 2.0, 0.6),
            shapes::chipped_torus(9, 7, 2.0, 0.6),
        ] {
            let connection = DiscreteConnection::new(&mesh);
            let total: f64 = connection.angle_defects().values.sum();
            assert!(
                relative_eq!(total, TAU * mesh.euler_characteristic() as f64, epsilon = 1e-9),
                "total curvature {total} doesn't match euler characteristic {}",
                mesh.euler_characteristic(),
            );
        }

        let cube = DiscreteConnection::new(&shapes::cube());
        for defect in cube.angle_defects().values.iter() {
            assert!(relative_eq!(*defect, PI / 2.0, epsilon = 1e-12));
        }
    }

    #[test]
    fn vertex_holonomy_matches_curvature() {
        for mesh in [
            shapes::octahedron(),
            shapes::cube(),
            shapes::torus(8, 6, 2.0, 0.7),
        ] {
            let connection = DiscreteConnection::new(&mesh);
            let basis = CycleBasis::new(&mesh).unwrap();
            let transport_sums = &basis * connection.transport();
            for (row, kind) in basis.kinds().iter().enumerate() {
                let CycleKind::Vertex(v) = *kind else {
                    continue;
                };
                let diff = wrap_angle(transport_sums.values[row] - connection.angle_defects().values[v]);
                assert!(
                    diff.abs() < 1e-9,
                    "transport around vertex {v} differs from its angle defect by {diff}"
                );
            }
        }
    }

    #[test]
    fn flat_disc_has_no_holonomy() {
        let mesh = shapes::flat_disc(3, 10);
        let connection = DiscreteConnection::new(&mesh);
        let basis = CycleBasis::new(&mesh).unwrap();
        let holonomy = connection.holonomy(&basis);
        assert!(holonomy.values.iter().all(|h| abs_diff_eq!(*h, 0.0, epsilon = 1e-9)));
        assert!(abs_diff_eq!(basis.required_index_sum(&holonomy, 4), 0.0, epsilon = 1e-9));
    }

    #[test]
    fn required_index_sum_on_closed_surfaces() {
        for (mesh, chi) in [(shapes::octahedron(), 2.0), (shapes::torus(8, 6, 2.0, 0.7), 0.0)] {
            let connection = DiscreteConnection::new(&mesh);
            let basis = CycleBasis::new(&mesh).unwrap();
            let holonomy = connection.holonomy(&basis);
            for degree in [1, 2, 4, 6] {
                assert!(relative_eq!(
                    basis.required_index_sum(&holonomy, degree),
                    degree as f64 * chi,
                    epsilon = 1e-9
                ));
            }
        }
    }

    proptest! {
        #[test]
        fn wrapping_stays_in_range(angle in -100.0..100.0f64, period in 0.1..10.0f64) {
            let wrapped = wrap_to_period(angle, period);
            prop_assert!(wrapped >= -period / 2.0 - 1e-12 && wrapped < period / 2.0 + 1e-12);
            // differs from the input by a whole number of periods
            let turns = (angle - wrapped) / period;
            prop_assert!((turns - turns.round()).abs() < 1e-9);
        }
    }
}
