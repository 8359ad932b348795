//! Interpolate a non-symmetric 3-direction field between two faces of a torus
//! and print where its singularities ended up.

use dirfield as df;
use df::poly_vector::{PolyVectorSolver, SoftConstraints};

fn main() {
    let mesh = df::mesh::shapes::torus(24, 12, 3.0, 1.0);
    let degree = 3;
    let faces = vec![0, mesh.face_count() / 2];

    // two directions close together and a third one opposite them
    let directions = faces
        .iter()
        .flat_map(|&f| {
            let basis = mesh.bases()[f];
            [0.0, 0.6, 3.4].map(|angle| basis.direction(angle))
        })
        .collect();
    let constraints = SoftConstraints::new(degree, faces.clone(), directions).unwrap();

    // the factorization can be reused for other directions on the same faces
    let solver = PolyVectorSolver::prepare(&mesh, &faces, degree, 1e6).unwrap();
    let field = solver.solve(&mesh, &constraints).unwrap();
    println!(
        "constraint residual: {:e}",
        field.constraint_residual(&mesh, &constraints)
    );

    let session = df::FieldSession::new(
        mesh,
        df::FieldConfig {
            degree,
            ..Default::default()
        },
    )
    .unwrap();
    let solution = session
        .synthesize(&df::Synthesis::SoftConstraints(constraints))
        .unwrap();
    println!(
        "{} edges with ambiguous ordering",
        solution.matching.ordering_ambiguities
    );
    for (&index, kind) in solution.indices.iter().zip(session.cycles().kinds()) {
        if index != 0 {
            println!("{kind:?}: index {index}/{degree}");
        }
    }
}
