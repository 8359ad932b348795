//! Small procedurally generated meshes.
//!
//! These are used throughout the tests and demos,
//! and are handy for trying things out without a mesh loader.

use std::f64::consts::TAU;

use super::TriMesh;
use crate::Vec3;

fn build(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> TriMesh {
    TriMesh::new(vertices, faces).expect("Generated mesh is invalid. This is a bug in dirfield")
}

/// A flat hexagon made of six triangles around a center vertex.
///
/// ```text
///   0---1
///  / \ / \
/// 2---3---4
///  \ / \ /
///   5---6
/// ```
pub fn hexagon_disc() -> TriMesh {
    let vertices = vec![
        Vec3::new(-0.5, 1.0, 0.0),
        Vec3::new(0.5, 1.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-0.5, -1.0, 0.0),
        Vec3::new(0.5, -1.0, 0.0),
    ];
    #[rustfmt::skip]
    let faces = vec![
        [0, 2, 3], [0, 3, 1], [1, 3, 4],
        [2, 5, 3], [3, 5, 6], [3, 6, 4],
    ];
    build(vertices, faces)
}

/// A flat unit disc in the xy plane with `rings` concentric rings
/// of `sectors` vertices each around a center vertex.
///
/// Vertex 0 is the center, ring `k` (counting from 1)
/// occupies indices `1 + (k - 1) * sectors ..`.
pub fn flat_disc(rings: usize, sectors: usize) -> TriMesh {
    assert!(rings >= 1 && sectors >= 3, "disc needs a ring and 3 sectors");
    let ring_vertex = |ring: usize, sector: usize| 1 + (ring - 1) * sectors + sector % sectors;

    let mut vertices = vec![Vec3::zeros()];
    for ring in 1..=rings {
        let radius = ring as f64 / rings as f64;
        for sector in 0..sectors {
            let angle = TAU * sector as f64 / sectors as f64;
            vertices.push(Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0));
        }
    }

    let mut faces = Vec::with_capacity(sectors * (2 * rings - 1));
    for sector in 0..sectors {
        faces.push([0, ring_vertex(1, sector), ring_vertex(1, sector + 1)]);
    }
    for ring in 1..rings {
        for sector in 0..sectors {
            let a = ring_vertex(ring, sector);
            let b = ring_vertex(ring + 1, sector);
            let c = ring_vertex(ring + 1, sector + 1);
            let d = ring_vertex(ring, sector + 1);
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    build(vertices, faces)
}

/// A regular octahedron with vertices on the coordinate axes.
pub fn octahedron() -> TriMesh {
    let vertices = vec![
        Vec3::x(),
        -Vec3::x(),
        Vec3::y(),
        -Vec3::y(),
        Vec3::z(),
        -Vec3::z(),
    ];
    #[rustfmt::skip]
    let faces = vec![
        [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
        [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
    ];
    build(vertices, faces)
}

/// The unit cube with each side split into two triangles.
///
/// Vertex `i` sits at `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.
pub fn cube() -> TriMesh {
    let vertices = (0..8)
        .map(|i| Vec3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64))
        .collect();
    #[rustfmt::skip]
    let faces = vec![
        [0, 2, 3], [0, 3, 1], // z = 0
        [4, 5, 7], [4, 7, 6], // z = 1
        [0, 1, 5], [0, 5, 4], // y = 0
        [2, 6, 7], [2, 7, 3], // y = 1
        [0, 4, 6], [0, 6, 2], // x = 0
        [1, 3, 7], [1, 7, 5], // x = 1
    ];
    build(vertices, faces)
}

fn torus_parts(
    major_segments: usize,
    minor_segments: usize,
    major_radius: f64,
    minor_radius: f64,
) -> (Vec<Vec3>, Vec<[usize; 3]>) {
    assert!(
        major_segments >= 3 && minor_segments >= 3,
        "torus needs at least 3 segments in both directions"
    );
    let idx = |i: usize, j: usize| (i % major_segments) * minor_segments + j % minor_segments;

    let mut vertices = Vec::with_capacity(major_segments * minor_segments);
    for i in 0..major_segments {
        let u = TAU * i as f64 / major_segments as f64;
        for j in 0..minor_segments {
            let v = TAU * j as f64 / minor_segments as f64;
            let ring_radius = major_radius + minor_radius * v.cos();
            vertices.push(Vec3::new(
                ring_radius * u.cos(),
                ring_radius * u.sin(),
                minor_radius * v.sin(),
            ));
        }
    }

    let mut faces = Vec::with_capacity(2 * major_segments * minor_segments);
    for i in 0..major_segments {
        for j in 0..minor_segments {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    (vertices, faces)
}

/// A torus around the z axis with outward-facing triangles.
pub fn torus(
    major_segments: usize,
    minor_segments: usize,
    major_radius: f64,
    minor_radius: f64,
) -> TriMesh {
    let (vertices, faces) = torus_parts(major_segments, minor_segments, major_radius, minor_radius);
    build(vertices, faces)
}

/// A [`torus`] with its first triangle removed,
/// leaving a single triangular boundary loop.
pub fn chipped_torus(
    major_segments: usize,
    minor_segments: usize,
    major_radius: f64,
    minor_radius: f64,
) -> TriMesh {
    let (vertices, mut faces) =
        torus_parts(major_segments, minor_segments, major_radius, minor_radius);
    faces.remove(0);
    build(vertices, faces)
}
