use fixedbitset as fb;

use itertools::Itertools;

use super::{BoundingBox, EdgeFaces, StructuralError, TangentBasis, TriMesh};
use crate::{union_find::UnionFind, Vec3};

/// One side of an edge as seen from a single face.
#[derive(Clone, Copy, Debug)]
struct HalfEdge {
    /// endpoints sorted in ascending order, used to find the twin
    key: [usize; 2],
    face: usize,
    corner: usize,
    /// whether the face traverses the edge from `key[0]` to `key[1]`
    forward: bool,
}

/// Construct a mesh from raw vertices and counter-clockwise triangles,
/// deriving the edge topology tables and tangent frames.
pub fn build_mesh(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Result<TriMesh, StructuralError> {
    if faces.is_empty() {
        return Err(StructuralError::EmptyMesh);
    }

    for (face_idx, face) in faces.iter().enumerate() {
        if let Some(&vertex) = face.iter().find(|&&v| v >= vertices.len()) {
            return Err(StructuralError::VertexOutOfRange {
                face: face_idx,
                vertex,
                vertex_count: vertices.len(),
            });
        }
        if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
            return Err(StructuralError::DegenerateFace(face_idx));
        }
    }

    //
    // tangent frames
    //

    let bases = faces
        .iter()
        .enumerate()
        .map(|(face_idx, face)| {
            let [v0, v1, v2] = face.map(|i| vertices[i]);
            let (e1, e2) = (v1 - v0, v2 - v0);
            let normal = e1.cross(&e2);
            // relative threshold so that the scale of the mesh doesn't matter
            let scale = e1.norm_squared().max(e2.norm_squared());
            if !(normal.norm() > 1e-12 * scale) {
                return Err(StructuralError::DegenerateFace(face_idx));
            }
            let b1 = e1.normalize();
            let normal = normal.normalize();
            let b2 = normal.cross(&b1).normalize();
            Ok(TangentBasis { b1, b2, normal })
        })
        .collect::<Result<Vec<_>, _>>()?;

    //
    // deduplicate edges
    //

    // every face corner starts a half-edge.
    // sorting by the sorted vertex pair puts twins next to each other,
    // the same way sub-simplices are deduplicated in a general simplicial complex
    let half_edges: Vec<HalfEdge> = faces
        .iter()
        .enumerate()
        .flat_map(|(face, indices)| {
            (0..3).map(move |corner| {
                let (a, b) = (indices[corner], indices[(corner + 1) % 3]);
                HalfEdge {
                    key: [a.min(b), a.max(b)],
                    face,
                    corner,
                    forward: a < b,
                }
            })
        })
        .sorted_unstable_by_key(|h| h.key)
        .collect();

    let mut edge_vertices: Vec<[usize; 2]> = Vec::with_capacity(half_edges.len() / 2 + 1);
    let mut edge_faces: Vec<EdgeFaces> = Vec::with_capacity(half_edges.len() / 2 + 1);
    let mut face_edges: Vec<[usize; 3]> = vec![[usize::MAX; 3]; faces.len()];
    let mut boundary_edges: Vec<usize> = Vec::new();

    let mut run_start = 0;
    while run_start < half_edges.len() {
        let key = half_edges[run_start].key;
        let run_len = half_edges[run_start..]
            .iter()
            .take_while(|h| h.key == key)
            .count();
        let run = &half_edges[run_start..run_start + run_len];
        run_start += run_len;

        let edge_idx = edge_vertices.len();
        match run {
            [h] => {
                // boundary edge, oriented the way its only face traverses it
                edge_vertices.push(if h.forward { key } else { [key[1], key[0]] });
                edge_faces.push(EdgeFaces {
                    left: h.face,
                    right: None,
                });
                boundary_edges.push(edge_idx);
            }
            [h0, h1] => {
                if h0.forward == h1.forward {
                    return Err(StructuralError::InconsistentOrientation {
                        vertices: key,
                        faces: [h0.face, h1.face],
                    });
                }
                // interior edges always point from the lower vertex index to the higher,
                // so the left face is the one traversing them forward
                let (left, right) = if h0.forward { (h0, h1) } else { (h1, h0) };
                edge_vertices.push(key);
                edge_faces.push(EdgeFaces {
                    left: left.face,
                    right: Some(right.face),
                });
            }
            _ => {
                return Err(StructuralError::NonManifoldEdge {
                    vertices: key,
                    face_count: run.len(),
                });
            }
        }
        for h in run {
            face_edges[h.face][h.corner] = edge_idx;
        }
    }

    //
    // check vertex neighborhoods
    //

    // corners around a vertex get joined across interior edges.
    // a manifold vertex ends up with all its corners in a single fan
    let corner_id = |face: usize, vertex: usize| -> usize {
        let local = faces[face].iter().position(|&v| v == vertex).unwrap_or(0);
        3 * face + local
    };
    let mut fans = UnionFind::new(3 * faces.len());
    for (ev, ef) in edge_vertices.iter().zip(&edge_faces) {
        let Some(right) = ef.right else {
            continue;
        };
        for &v in ev {
            fans.union(corner_id(ef.left, v), corner_id(right, v));
        }
    }
    let mut vertex_fan: Vec<Option<usize>> = vec![None; vertices.len()];
    for (face_idx, face) in faces.iter().enumerate() {
        for (corner, &v) in face.iter().enumerate() {
            let fan = fans.find(3 * face_idx + corner);
            match vertex_fan[v] {
                None => vertex_fan[v] = Some(fan),
                Some(existing) if existing != fan => {
                    return Err(StructuralError::NonManifoldVertex(v));
                }
                Some(_) => {}
            }
        }
    }
    if let Some(v) = vertex_fan.iter().position(Option::is_none) {
        return Err(StructuralError::UnreferencedVertex(v));
    }

    //
    // identify mesh boundary
    //

    let mut boundary_edge_set = fb::FixedBitSet::with_capacity(edge_vertices.len());
    let mut boundary_vertex_set = fb::FixedBitSet::with_capacity(vertices.len());
    // with manifold vertices, every boundary vertex starts exactly one boundary edge
    let mut outgoing_boundary_edge: Vec<Option<usize>> = vec![None; vertices.len()];
    for &edge_idx in &boundary_edges {
        let [a, b] = edge_vertices[edge_idx];
        boundary_edge_set.insert(edge_idx);
        boundary_vertex_set.insert(a);
        boundary_vertex_set.insert(b);
        outgoing_boundary_edge[a] = Some(edge_idx);
    }

    let mut boundary_loops: Vec<Vec<usize>> = Vec::new();
    let mut visited = fb::FixedBitSet::with_capacity(edge_vertices.len());
    for &start in &boundary_edges {
        if visited.contains(start) {
            continue;
        }
        let mut boundary_loop = Vec::new();
        let mut curr = start;
        while !visited.contains(curr) {
            visited.insert(curr);
            boundary_loop.push(curr);
            let end_vertex = edge_vertices[curr][1];
            match outgoing_boundary_edge[end_vertex] {
                Some(next) => curr = next,
                None => break,
            }
        }
        boundary_loops.push(boundary_loop);
    }

    let bounds = vertices.iter().fold(
        BoundingBox {
            min: Vec3::repeat(f64::INFINITY),
            max: Vec3::repeat(f64::NEG_INFINITY),
        },
        |bb, v| BoundingBox {
            min: bb.min.inf(v),
            max: bb.max.sup(v),
        },
    );

    Ok(TriMesh {
        vertices,
        faces,
        edge_vertices,
        edge_faces,
        face_edges,
        bases,
        boundary_edges: boundary_edge_set,
        boundary_vertices: boundary_vertex_set,
        boundary_loops,
        bounds,
    })
}
