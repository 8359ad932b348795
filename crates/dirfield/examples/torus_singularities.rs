//! Design a cross field on a torus with a hole cut in it,
//! putting a +1/4 singularity on one vertex and balancing the rest on the hole.
//! Then check that the singularities of the resulting field are the ones we asked for.

use dirfield as df;

fn main() {
    let mesh = df::mesh::shapes::chipped_torus(24, 12, 3.0, 1.0);
    let session = df::FieldSession::new(mesh, df::FieldConfig::default()).unwrap();
    let cycles = session.cycles();
    println!(
        "{} faces, genus {}, {} boundary loops, {} cycles",
        session.mesh().face_count(),
        cycles.genus(),
        cycles.boundary_loop_count(),
        cycles.cycle_count()
    );

    let holonomy = session.connection().holonomy(cycles);
    let required = cycles
        .required_index_sum(&holonomy, session.config().degree)
        .round() as i32;

    let mut indices = vec![0; cycles.cycle_count()];
    let singular_vertex = 5 * 12;
    indices[cycles.vertex_cycle(singular_vertex).unwrap()] = 1;
    let boundary_row = cycles
        .kinds()
        .iter()
        .position(|k| matches!(k, df::CycleKind::Boundary(_)))
        .unwrap();
    indices[boundary_row] = required - 1;

    let solution = session
        .synthesize(&df::Synthesis::PrescribedIndices {
            indices: indices.clone(),
            global_rotation: 0.0,
        })
        .unwrap();
    println!("trivial connection residual: {:e}", solution.residual);

    for (row, (&index, kind)) in solution.indices.iter().zip(cycles.kinds()).enumerate() {
        if index != 0 {
            println!("{kind:?}: index {index}/4 (asked for {}/4)", indices[row]);
        }
    }
}
