//! Singularity indices: how many multiples of `2π/N` a field turns
//! around each cycle of the basis.

use std::f64::consts::TAU;

use crate::{
    cochain::Cochain,
    connection::DiscreteConnection,
    cycles::{Cycle, CycleBasis},
    mesh::Edge,
    operator::Operator,
};

/// Index of the field around every cycle, computed from the matching effort:
/// `(C·effort + holonomy) / (2π/N)`.
///
/// Values are integers up to rounding error for fields that are consistent
/// across every edge (see [`quantize`]).
pub fn singularities(
    basis: &CycleBasis,
    effort: &Cochain<Edge>,
    connection: &DiscreteConnection,
    degree: usize,
) -> Cochain<Cycle> {
    let holonomy = connection.holonomy(basis);
    let turns = basis * effort + &holonomy;
    (degree as f64 / TAU) * turns
}

/// Index of the field around every cycle, computed from the integer matching alone:
/// the net number of direction slots the matching shifts by going around the cycle.
///
/// Unlike [`singularities`], this is only meaningful modulo `N`
/// (a full turn of the matching is indistinguishable from none).
///
/// # Panics
/// If `matching` doesn't have one value per edge.
pub fn matching_singularities(basis: &CycleBasis, matching: &[i32]) -> Cochain<Cycle> {
    let mut matching_cochain = Cochain::<Edge>::zeros(matching.len());
    for (value, m) in matching_cochain.values.iter_mut().zip(matching) {
        *value = *m as f64;
    }
    basis.operator().apply(&matching_cochain)
}

/// Round fractional indices to the nearest integers.
pub fn quantize(indices: &Cochain<Cycle>) -> Vec<i32> {
    indices.values.iter().map(|v| v.round() as i32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matching::matching_effort,
        mesh::{shapes, TriMesh},
        representative::adjustment_to_representative,
        trivial_connection::trivial_connection,
    };

    /// Run the whole prescribed-index pipeline and extract indices back.
    fn round_trip(mesh: &TriMesh, indices: &[i32], degree: usize) -> Vec<i32> {
        let basis = CycleBasis::new(mesh).unwrap();
        let connection = DiscreteConnection::new(mesh);
        let tc = trivial_connection(&basis, &connection, indices, degree, &Default::default())
            .unwrap();
        assert!(tc.is_feasible(1e-9), "residual {}", tc.residual);
        let field = adjustment_to_representative(mesh, &connection, &tc.adjustment, degree, 0.0);
        let pm = matching_effort(mesh, &connection, &field);
        let fractional = singularities(&basis, &pm.effort, &connection, degree);
        for (value, rounded) in fractional.values.iter().zip(quantize(&fractional)) {
            assert!(
                (value - rounded as f64).abs() < 1e-6,
                "index {value} isn't close to an integer"
            );
        }
        quantize(&fractional)
    }

    #[test]
    fn prescribed_indices_are_recovered() {
        let octahedron = shapes::octahedron();
        assert_eq!(round_trip(&octahedron, &[2, 2, 1, 1, 1, 1], 4), vec![2, 2, 1, 1, 1, 1]);
        assert_eq!(round_trip(&octahedron, &[1, 1, 1, 1, 0, 0], 2), vec![1, 1, 1, 1, 0, 0]);

        let cube = shapes::cube();
        assert_eq!(round_trip(&cube, &[1; 8], 4), vec![1; 8]);

        let disc = shapes::flat_disc(4, 12);
        let basis = CycleBasis::new(&disc).unwrap();
        let mut indices = vec![0; basis.cycle_count()];
        indices[basis.vertex_cycle(0).unwrap()] = 1;
        *indices.last_mut().unwrap() = -1;
        assert_eq!(round_trip(&disc, &indices, 4), indices);
    }

    #[test]
    fn torus_singularity_pair() {
        let mesh = shapes::torus(16, 10, 3.0, 1.0);
        let basis = CycleBasis::new(&mesh).unwrap();
        let mut indices = vec![0; basis.cycle_count()];
        // a +1/-1 pair on the outer equator, far apart
        indices[basis.vertex_cycle(0).unwrap()] = 1;
        indices[basis.vertex_cycle(8 * 10).unwrap()] = -1;
        assert_eq!(round_trip(&mesh, &indices, 4), indices);
    }

    #[test]
    fn zero_field_has_only_curvature_indices() {
        // with zero effort, indices are just holonomy in units of 2π/N
        let mesh = shapes::cube();
        let basis = CycleBasis::new(&mesh).unwrap();
        let connection = DiscreteConnection::new(&mesh);
        let zero = mesh.new_zero_cochain::<Edge>();
        let fractional = singularities(&basis, &zero, &connection, 4);
        assert!(fractional.values.iter().all(|v| (v - 1.0).abs() < 1e-12));
        let fractional = singularities(&basis, &zero, &connection, 1);
        assert!(fractional.values.iter().all(|v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn matching_singularities_count_slot_shifts() {
        let mesh = shapes::hexagon_disc();
        let basis = CycleBasis::new(&mesh).unwrap();
        // a shift of one slot across a single spoke shows up
        // in the center vertex cycle and, negated, in the boundary cycle
        let spoke = mesh.interior_edges().next().unwrap();
        let mut matching = vec![0; mesh.edge_count()];
        matching[spoke.index()] = 1;
        let indices = matching_singularities(&basis, &matching);
        let center_row = basis.vertex_cycle(3).unwrap();
        let expected_center = if spoke.vertex_indices()[1] == 3 { 1.0 } else { -1.0 };
        assert_eq!(indices.values[center_row], expected_center);
        assert_eq!(indices.values.sum(), 0.0);
    }
}
