use super::{EdgeFaces, TangentBasis, TriMesh};
use crate::Vec3;

/// A view into a single face's data.
///
/// This type can also be used as an index into a face [`Cochain`][crate::Cochain]:
/// ```
/// # use dirfield_core::{mesh::{shapes, Face}, Cochain};
/// # let mesh = shapes::octahedron();
/// let c: Cochain<Face> = mesh.new_zero_cochain();
/// for face in mesh.faces() {
///     let val = c[face];
///     // ..is a typechecked equivalent to
///     let val = c.values[face.index()];
/// }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FaceView<'a> {
    pub(super) mesh: &'a TriMesh,
    pub(super) index: usize,
}

impl<'a> PartialEq for FaceView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<'a> Eq for FaceView<'a> {}

impl<'a> FaceView<'a> {
    /// Get the index of this face.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The vertex indices of this face in counter-clockwise order.
    #[inline]
    pub fn vertex_indices(&self) -> [usize; 3] {
        self.mesh.faces[self.index]
    }

    /// Iterate over the vertex positions of this face.
    #[inline]
    pub fn vertices(&self) -> impl 'a + Iterator<Item = Vec3> {
        let mesh = self.mesh;
        mesh.faces[self.index].into_iter().map(|i| mesh.vertices[i])
    }

    /// Iterate over the edges of this face, starting from the one at corner 0.
    #[inline]
    pub fn edges(&self) -> impl 'a + Iterator<Item = super::EdgeView<'a>> {
        let mesh = self.mesh;
        mesh.face_edges[self.index]
            .into_iter()
            .map(|index| super::EdgeView { mesh, index })
    }

    /// Iterate over the faces sharing an edge with this one.
    #[inline]
    pub fn neighbors(&self) -> impl 'a + Iterator<Item = FaceView<'a>> {
        let (mesh, index) = (self.mesh, self.index);
        self.edges()
            .filter_map(move |e| e.faces().opposite(index))
            .map(move |index| FaceView { mesh, index })
    }

    /// The tangent frame of this face.
    #[inline]
    pub fn basis(&self) -> &'a TangentBasis {
        &self.mesh.bases[self.index]
    }

    /// The average of the face's vertices.
    #[inline]
    pub fn barycenter(&self) -> Vec3 {
        self.vertices().sum::<Vec3>() / 3.0
    }

    /// The area of the face.
    #[inline]
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.vertex_indices().map(|i| self.mesh.vertices[i]);
        0.5 * (b - a).cross(&(c - a)).norm()
    }
}

/// A view into a single edge's data.
///
/// Like [`FaceView`], this can be used to index an edge [`Cochain`][crate::Cochain].
#[derive(Clone, Copy, Debug)]
pub struct EdgeView<'a> {
    pub(super) mesh: &'a TriMesh,
    pub(super) index: usize,
}

impl<'a> PartialEq for EdgeView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<'a> Eq for EdgeView<'a> {}

impl<'a> EdgeView<'a> {
    /// Get the index of this edge.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The endpoints of this edge.
    #[inline]
    pub fn vertex_indices(&self) -> [usize; 2] {
        self.mesh.edge_vertices[self.index]
    }

    /// The faces on either side of this edge.
    #[inline]
    pub fn faces(&self) -> EdgeFaces {
        self.mesh.edge_faces[self.index]
    }

    /// Whether this edge lies on the mesh boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.mesh.boundary_edges.contains(self.index)
    }

    /// The vector from the first endpoint to the second.
    #[inline]
    pub fn vector(&self) -> Vec3 {
        let [a, b] = self.vertex_indices();
        self.mesh.vertices[b] - self.mesh.vertices[a]
    }
}

/// Iterator over the faces of a mesh.
#[derive(Clone, Copy, Debug)]
pub struct FaceIter<'a> {
    pub(super) mesh: &'a TriMesh,
    pub(super) index: usize,
}

impl<'a> Iterator for FaceIter<'a> {
    type Item = FaceView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.mesh.face_count() {
            return None;
        }
        let ret = self.mesh.face(self.index);
        self.index += 1;
        Some(ret)
    }
}

/// Iterator over the edges of a mesh.
#[derive(Clone, Copy, Debug)]
pub struct EdgeIter<'a> {
    pub(super) mesh: &'a TriMesh,
    pub(super) index: usize,
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = EdgeView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.mesh.edge_count() {
            return None;
        }
        let ret = self.mesh.edge(self.index);
        self.index += 1;
        Some(ret)
    }
}
