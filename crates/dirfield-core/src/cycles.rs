//! The dual cycle basis: a sparse matrix whose rows are closed loops of faces
//! and whose columns are mesh edges.
//!
//! Every row lists, with a sign, the edges a dual loop crosses.
//! A `+1` means the loop crosses the edge from its left face to its right face.
//! Applying the basis to an angle per edge therefore sums that angle around every loop,
//! which is how holonomies, constraint targets and singularity indices are computed.

use fixedbitset as fb;
use nalgebra_sparse as nas;

use std::collections::VecDeque;
use std::f64::consts::TAU;

use crate::{
    cochain::Cochain,
    mesh::{Edge, StructuralError, TriMesh},
    operator::{MatrixOperator, Op},
    union_find::UnionFind,
};

/// Marker type for values assigned to the cycles of a [`CycleBasis`].
#[derive(Clone, Copy, Debug)]
pub struct Cycle;

/// What a row of the [`CycleBasis`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleKind {
    /// The loop of faces around an interior vertex, counter-clockwise.
    Vertex(usize),
    /// The loop of faces along a boundary component,
    /// given by its index in [`TriMesh::boundary_loops`].
    Boundary(usize),
    /// A non-contractible loop around a handle,
    /// identified by the edge that closes it.
    Generator(usize),
}

/// A basis for the closed loops of the dual mesh.
///
/// Rows are ordered as
/// 1. one cycle per interior vertex, in increasing vertex order,
/// 2. one cycle per boundary loop,
/// 3. `2g` generator cycles for a surface of genus `g`.
///
/// Vertex and boundary rows together have exactly one linear dependency
/// (their sum is zero), which is the discrete form of the Gauss-Bonnet theorem.
/// Generator rows are independent of everything else.
#[derive(Clone, Debug)]
pub struct CycleBasis {
    op: Op<Cochain<Edge>, Cochain<Cycle>>,
    kinds: Vec<CycleKind>,
    /// row index of every interior vertex's cycle
    vertex_rows: Vec<Option<usize>>,
    genus: usize,
    boundary_loop_count: usize,
    euler_characteristic: i64,
}

impl CycleBasis {
    /// Build the cycle basis of a mesh.
    ///
    /// Fails with [`StructuralError::Disconnected`]
    /// if the faces aren't all connected through interior edges.
    pub fn new(mesh: &TriMesh) -> Result<Self, StructuralError> {
        let face_components = count_face_components(mesh);
        if face_components != 1 {
            return Err(StructuralError::Disconnected {
                components: face_components,
            });
        }

        let boundary_vertices = mesh.boundary_vertices();
        let edge_vertices = mesh.edge_vertices();

        let mut kinds: Vec<CycleKind> = Vec::new();
        let mut vertex_rows: Vec<Option<usize>> = vec![None; mesh.vertex_count()];
        for v in (0..mesh.vertex_count()).filter(|v| !boundary_vertices.contains(*v)) {
            vertex_rows[v] = Some(kinds.len());
            kinds.push(CycleKind::Vertex(v));
        }

        // (row, edge, coefficient) triplets, collected before the row count is known
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();

        //
        // vertex cycles
        //

        // a counter-clockwise loop around a vertex crosses its outgoing edges
        // from right to left and its incoming edges from left to right.
        // boundary edges have both endpoints on the boundary and never appear here
        for (edge_idx, [a, b]) in edge_vertices.iter().enumerate() {
            if let Some(row) = vertex_rows[*a] {
                triplets.push((row, edge_idx, -1.0));
            }
            if let Some(row) = vertex_rows[*b] {
                triplets.push((row, edge_idx, 1.0));
            }
        }

        //
        // boundary cycles
        //

        // each is the sum of the vertex cycles of the loop's vertices.
        // edges with both ends on the loop cancel out
        let mut vertex_loop: Vec<Option<usize>> = vec![None; mesh.vertex_count()];
        for (loop_idx, boundary_loop) in mesh.boundary_loops().iter().enumerate() {
            for &edge_idx in boundary_loop {
                for v in edge_vertices[edge_idx] {
                    vertex_loop[v] = Some(loop_idx);
                }
            }
        }
        let first_boundary_row = kinds.len();
        for loop_idx in 0..mesh.boundary_loops().len() {
            kinds.push(CycleKind::Boundary(loop_idx));
        }
        for (edge_idx, [a, b]) in edge_vertices.iter().enumerate() {
            let (loop_a, loop_b) = (vertex_loop[*a], vertex_loop[*b]);
            if loop_a == loop_b {
                continue;
            }
            if let Some(l) = loop_a {
                triplets.push((first_boundary_row + l, edge_idx, -1.0));
            }
            if let Some(l) = loop_b {
                triplets.push((first_boundary_row + l, edge_idx, 1.0));
            }
        }

        //
        // generator cycles via tree-cotree
        //

        let generators = tree_cotree_generators(mesh);
        for (edge_idx, coefs) in generators {
            let row = kinds.len();
            kinds.push(CycleKind::Generator(edge_idx));
            triplets.extend(coefs.into_iter().map(|(e, c)| (row, e, c)));
        }

        let generator_count = kinds.len() - first_boundary_row - mesh.boundary_loops().len();
        debug_assert!(generator_count % 2 == 0, "odd number of generators");

        let mut coo = nas::CooMatrix::new(kinds.len(), mesh.edge_count());
        for (row, col, val) in triplets {
            coo.push(row, col, val);
        }

        let basis = Self {
            op: MatrixOperator::from(nas::CsrMatrix::from(&coo)),
            kinds,
            vertex_rows,
            genus: generator_count / 2,
            boundary_loop_count: mesh.boundary_loops().len(),
            euler_characteristic: mesh.euler_characteristic(),
        };
        log::debug!(
            "built cycle basis: {} cycles ({} boundary loops, genus {})",
            basis.cycle_count(),
            basis.boundary_loop_count,
            basis.genus
        );
        Ok(basis)
    }

    /// The basis as an operator from edge values to cycle sums.
    #[inline]
    pub fn operator(&self) -> &Op<Cochain<Edge>, Cochain<Cycle>> {
        &self.op
    }

    /// Number of cycles (rows) in the basis.
    #[inline]
    pub fn cycle_count(&self) -> usize {
        self.kinds.len()
    }

    /// What each row of the basis represents.
    #[inline]
    pub fn kinds(&self) -> &[CycleKind] {
        &self.kinds
    }

    /// Row of the cycle around the given vertex, if it's an interior vertex.
    #[inline]
    pub fn vertex_cycle(&self, vertex: usize) -> Option<usize> {
        self.vertex_rows.get(vertex).copied().flatten()
    }

    /// Genus of the surface.
    #[inline]
    pub fn genus(&self) -> usize {
        self.genus
    }

    /// Number of boundary loops of the surface.
    #[inline]
    pub fn boundary_loop_count(&self) -> usize {
        self.boundary_loop_count
    }

    /// Euler characteristic of the surface the basis was built on.
    #[inline]
    pub fn euler_characteristic(&self) -> i64 {
        self.euler_characteristic
    }

    /// Create a new cochain with a value of zero for each cycle.
    pub fn new_zero_cochain(&self) -> Cochain<Cycle> {
        Cochain::zeros(self.cycle_count())
    }

    /// Whether a row takes part in the Gauss-Bonnet dependency
    /// (true for vertex and boundary cycles).
    #[inline]
    pub fn is_dependent(&self, row: usize) -> bool {
        !matches!(self.kinds[row], CycleKind::Generator(_))
    }

    /// The sum of singularity indices over vertex and boundary cycles
    /// that a field of the given degree must have,
    /// given the holonomy of the underlying connection around each cycle.
    ///
    /// On a closed surface this is `degree * χ`.
    pub fn required_index_sum(&self, holonomy: &Cochain<Cycle>, degree: usize) -> f64 {
        let hol_sum: f64 = (0..self.cycle_count())
            .filter(|row| self.is_dependent(*row))
            .map(|row| holonomy.values[row])
            .sum();
        hol_sum / (TAU / degree as f64)
    }
}

impl std::ops::Mul<&Cochain<Edge>> for &CycleBasis {
    type Output = Cochain<Cycle>;

    fn mul(self, rhs: &Cochain<Edge>) -> Self::Output {
        &self.op * rhs
    }
}

/// Number of groups of faces connected through interior edges.
fn count_face_components(mesh: &TriMesh) -> usize {
    let mut faces = UnionFind::new(mesh.face_count());
    let mut components = mesh.face_count();
    for ef in mesh.edge_faces() {
        if let Some(right) = ef.right {
            if faces.union(ef.left, right) {
                components -= 1;
            }
        }
    }
    components
}

/// Find the edges closing non-contractible dual loops
/// and the signed edge sets of those loops.
///
/// A primal spanning tree is grown with boundary edges taking priority,
/// then a dual spanning tree over the remaining interior edges.
/// Interior edges in neither tree each close one generator loop.
fn tree_cotree_generators(mesh: &TriMesh) -> Vec<(usize, Vec<(usize, f64)>)> {
    let edge_vertices = mesh.edge_vertices();
    let edge_faces = mesh.edge_faces();
    let boundary_edges = mesh.boundary_edges();

    let mut primal_tree = fb::FixedBitSet::with_capacity(mesh.edge_count());
    let mut vertex_sets = UnionFind::new(mesh.vertex_count());
    let boundary_first = boundary_edges
        .ones()
        .chain((0..mesh.edge_count()).filter(|e| !boundary_edges.contains(*e)));
    for edge_idx in boundary_first {
        let [a, b] = edge_vertices[edge_idx];
        if vertex_sets.union(a, b) {
            primal_tree.insert(edge_idx);
        }
    }

    // breadth-first dual tree from face 0.
    // (parent face, edge crossed to get here) for every face except the root
    let mut dual_parent: Vec<Option<(usize, usize)>> = vec![None; mesh.face_count()];
    let mut dual_tree = fb::FixedBitSet::with_capacity(mesh.edge_count());
    let mut visited = fb::FixedBitSet::with_capacity(mesh.face_count());
    let mut queue = VecDeque::from([0]);
    visited.insert(0);
    while let Some(face) = queue.pop_front() {
        for &edge_idx in &mesh.face_edges()[face] {
            if primal_tree.contains(edge_idx) {
                continue;
            }
            let Some(next) = edge_faces[edge_idx].opposite(face) else {
                continue;
            };
            if visited.contains(next) {
                continue;
            }
            visited.insert(next);
            dual_tree.insert(edge_idx);
            dual_parent[next] = Some((face, edge_idx));
            queue.push_back(next);
        }
    }

    // sign of crossing from `child` to its parent
    let climb_sign = |child: usize, edge_idx: usize| -> f64 {
        if edge_faces[edge_idx].left == child {
            1.0
        } else {
            -1.0
        }
    };

    let mut generators = Vec::new();
    for edge_idx in 0..mesh.edge_count() {
        if boundary_edges.contains(edge_idx)
            || primal_tree.contains(edge_idx)
            || dual_tree.contains(edge_idx)
        {
            continue;
        }
        let ef = edge_faces[edge_idx];
        let Some(right) = ef.right else {
            continue;
        };

        // cross the edge left to right, walk from the right face up to the root,
        // then back down to the left face.
        // edges on the shared part of the two root paths cancel
        let mut coefs: Vec<(usize, f64)> = vec![(edge_idx, 1.0)];
        let mut face = right;
        while let Some((parent, tree_edge)) = dual_parent[face] {
            coefs.push((tree_edge, climb_sign(face, tree_edge)));
            face = parent;
        }
        let mut face = ef.left;
        while let Some((parent, tree_edge)) = dual_parent[face] {
            coefs.push((tree_edge, -climb_sign(face, tree_edge)));
            face = parent;
        }

        coefs.sort_unstable_by_key(|(e, _)| *e);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(coefs.len());
        for (e, c) in coefs {
            match merged.last_mut() {
                Some((last_e, last_c)) if *last_e == e => *last_c += c,
                _ => merged.push((e, c)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        generators.push((edge_idx, merged));
    }
    generators
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use crate::operator::Operator;

    /// Check that every row is a closed dual loop:
    /// each face is entered as many times as it's exited.
    fn assert_rows_closed(mesh: &TriMesh, basis: &CycleBasis) {
        for (row_idx, row) in basis.operator().matrix().row_iter().enumerate() {
            let mut face_balance = vec![0.0; mesh.face_count()];
            for (&edge_idx, &coef) in row.col_indices().iter().zip(row.values()) {
                let ef = mesh.edge_faces()[edge_idx];
                let right = ef.right.expect("cycle crosses a boundary edge");
                face_balance[ef.left] -= coef;
                face_balance[right] += coef;
            }
            assert!(
                face_balance.iter().all(|b| *b == 0.0),
                "row {row_idx} ({:?}) is not a closed loop",
                basis.kinds()[row_idx],
            );
        }
    }

    #[test]
    fn closed_genus_0() {
        let mesh = shapes::octahedron();
        let basis = CycleBasis::new(&mesh).unwrap();
        assert_eq!(basis.cycle_count(), 6);
        assert_eq!(basis.genus(), 0);
        assert!(basis.kinds().iter().all(|k| matches!(k, CycleKind::Vertex(_))));
        assert_rows_closed(&mesh, &basis);
        for v in 0..6 {
            assert_eq!(basis.vertex_cycle(v), Some(v));
            // every octahedron vertex has four edges
            assert_eq!(basis.operator().matrix().row(v).nnz(), 4);
        }
    }

    #[test]
    fn torus_has_two_generators() {
        let mesh = shapes::torus(9, 7, 2.0, 0.6);
        let basis = CycleBasis::new(&mesh).unwrap();
        assert_eq!(basis.genus(), 1);
        assert_eq!(basis.cycle_count(), mesh.vertex_count() + 2);
        let generator_count = basis
            .kinds()
            .iter()
            .filter(|k| matches!(k, CycleKind::Generator(_)))
            .count();
        assert_eq!(generator_count, 2);
        assert_rows_closed(&mesh, &basis);
    }

    #[test]
    fn surfaces_with_boundary() {
        let disc = shapes::flat_disc(3, 8);
        let basis = CycleBasis::new(&disc).unwrap();
        // center plus two inner rings are interior
        assert_eq!(basis.cycle_count(), 1 + 2 * 8 + 1);
        assert_eq!(basis.kinds().last(), Some(&CycleKind::Boundary(0)));
        assert_eq!(basis.genus(), 0);
        assert_rows_closed(&disc, &basis);

        let chipped = shapes::chipped_torus(8, 6, 2.0, 0.5);
        let basis = CycleBasis::new(&chipped).unwrap();
        assert_eq!(basis.genus(), 1);
        assert_eq!(basis.boundary_loop_count(), 1);
        assert_eq!(basis.cycle_count(), chipped.vertex_count() - 3 + 1 + 2);
        assert_rows_closed(&chipped, &basis);
    }

    #[test]
    fn row_count_matches_topology() {
        for mesh in [
            shapes::hexagon_disc(),
            shapes::cube(),
            shapes::flat_disc(2, 5),
            shapes::torus(5, 4, 2.0, 0.8),
            shapes::chipped_torus(6, 5, 2.0, 0.8),
        ] {
            let basis = CycleBasis::new(&mesh).unwrap();
            let interior_vertices = mesh.vertex_count() - mesh.boundary_vertices().count_ones(..);
            assert_eq!(
                basis.cycle_count(),
                interior_vertices + mesh.boundary_loops().len() + 2 * basis.genus()
            );
            // genus from the euler characteristic
            assert_eq!(
                mesh.euler_characteristic(),
                2 - 2 * basis.genus() as i64 - mesh.boundary_loops().len() as i64
            );
        }
    }

    #[test]
    fn vertex_and_boundary_rows_sum_to_zero() {
        let mesh = shapes::chipped_torus(7, 6, 2.0, 0.5);
        let basis = CycleBasis::new(&mesh).unwrap();
        let mut mask = basis.new_zero_cochain();
        for row in 0..basis.cycle_count() {
            if basis.is_dependent(row) {
                mask.values[row] = 1.0;
            }
        }
        let sum = basis.operator().transpose().apply(&mask);
        assert!(sum.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn zero_field_has_zero_cycle_sums() {
        let mesh = shapes::torus(6, 6, 2.0, 0.5);
        let basis = CycleBasis::new(&mesh).unwrap();
        let zero = mesh.new_zero_cochain::<Edge>();
        assert!((&basis * &zero).values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn disconnected_mesh_is_rejected() {
        let mut vertices: Vec<crate::Vec3> = shapes::octahedron().vertices().to_vec();
        let mut faces: Vec<[usize; 3]> = shapes::octahedron().triangles().to_vec();
        let offset = vertices.len();
        vertices.extend(
            shapes::octahedron()
                .vertices()
                .iter()
                .map(|v| v + crate::Vec3::new(5.0, 0.0, 0.0)),
        );
        faces.extend(
            shapes::octahedron()
                .triangles()
                .iter()
                .map(|f| f.map(|i| i + offset)),
        );
        let mesh = TriMesh::new(vertices, faces).unwrap();
        assert_eq!(
            CycleBasis::new(&mesh).unwrap_err(),
            StructuralError::Disconnected { components: 2 }
        );
    }
}
