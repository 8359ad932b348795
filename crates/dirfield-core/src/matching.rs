//! Principal matching between the direction sets of neighboring faces
//! and the rotation ("effort") it takes to carry one set onto the other.

use crate::{
    cochain::Cochain,
    connection::{wrap_angle, DiscreteConnection},
    mesh::{Edge, TriMesh},
    representative::{RawField, RepresentativeField},
};

const TIE_TOLERANCE: f64 = 1e-9;

/// The matching of every interior edge and the rotation it implies.
#[derive(Clone, Debug)]
pub struct PrincipalMatching {
    /// Cyclic shift taking the left face's directions to the right face's:
    /// direction `i` on the left matches direction `i + matching` on the right.
    /// Zero on boundary edges.
    pub matching: Vec<i32>,
    /// Mean rotation from the transported left directions to their matches,
    /// zero on boundary edges.
    pub effort: Cochain<Edge>,
    /// Number of edges where some direction's individually closest partner
    /// disagreed with the chosen shift.
    pub ordering_ambiguities: usize,
}

/// Compute the principal matching of a field given by all of its directions.
///
/// For each interior edge, the left face's directions are transported into the
/// right face's frame, and every cyclic shift is scored by the sum of squared
/// rotations to the shifted partners. The cheapest shift wins, the smaller one on ties.
///
/// # Panics
/// If the field doesn't cover every face of the mesh.
pub fn principal_matching(
    mesh: &TriMesh,
    connection: &DiscreteConnection,
    field: &RawField,
) -> PrincipalMatching {
    assert_eq!(
        field.face_count(),
        mesh.face_count(),
        "field must have directions for every face"
    );
    let degree = field.degree();
    let bases = mesh.bases();

    let mut matching = vec![0; mesh.edge_count()];
    let mut effort = mesh.new_zero_cochain::<Edge>();
    let mut ordering_ambiguities = 0;

    // reused buffers
    let mut left_angles = vec![0.0; degree];
    let mut right_angles = vec![0.0; degree];
    let mut rotations = vec![0.0; degree];

    for edge in mesh.interior_edges() {
        let ef = edge.faces();
        let Some(right) = ef.right else {
            continue;
        };
        let transport = connection.transport()[edge];
        for (angle, v) in left_angles.iter_mut().zip(field.face_vectors(ef.left)) {
            *angle = bases[ef.left].angle_of(v) + transport;
        }
        for (angle, v) in right_angles.iter_mut().zip(field.face_vectors(right)) {
            *angle = bases[right].angle_of(v);
        }

        let mut best_shift = 0;
        let mut best_cost = f64::INFINITY;
        for shift in 0..degree {
            let cost: f64 = (0..degree)
                .map(|i| wrap_angle(right_angles[(i + shift) % degree] - left_angles[i]).powi(2))
                .sum();
            // costs within rounding of each other count as a tie
            if cost < best_cost - TIE_TOLERANCE {
                best_cost = cost;
                best_shift = shift;
            }
        }
        for (i, rot) in rotations.iter_mut().enumerate() {
            *rot = wrap_angle(right_angles[(i + best_shift) % degree] - left_angles[i]);
        }
        effort[edge] = rotations.iter().sum::<f64>() / degree as f64;
        matching[edge.index()] = best_shift as i32;

        // each direction on its own might prefer a different partner
        // than the one the shift assigns it
        let disagrees = (0..degree).any(|i| {
            let nearest = (0..degree)
                .min_by(|&a, &b| {
                    let rot_a = wrap_angle(right_angles[a] - left_angles[i]).abs();
                    let rot_b = wrap_angle(right_angles[b] - left_angles[i]).abs();
                    rot_a.total_cmp(&rot_b)
                })
                .unwrap_or(0);
            nearest != (i + best_shift) % degree
        });
        if disagrees {
            ordering_ambiguities += 1;
            log::trace!(
                "edge {}: nearest-neighbor matching isn't a cyclic shift, using shift {best_shift}",
                edge.index()
            );
        }
    }

    if ordering_ambiguities > 0 {
        log::debug!(
            "{ordering_ambiguities} edges had matchings that don't preserve direction order"
        );
    }

    PrincipalMatching {
        matching,
        effort,
        ordering_ambiguities,
    }
}

/// Compute the principal matching of a rotationally symmetric field.
pub fn matching_effort(
    mesh: &TriMesh,
    connection: &DiscreteConnection,
    field: &RepresentativeField,
) -> PrincipalMatching {
    principal_matching(mesh, connection, &field.to_raw(mesh))
}
