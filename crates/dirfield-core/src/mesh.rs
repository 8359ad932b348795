//! Triangle meshes and the topology tables that field computations run on.

/// Low-level mesh construction and corresponding tests.
mod mesh_construction;

pub mod shapes;

mod views;
pub use views::{EdgeIter, EdgeView, FaceIter, FaceView};

//

use fixedbitset as fb;
use nalgebra as na;

use crate::{Vec2, Vec3};

/// Errors in the structure of a mesh,
/// detected either when building the topology tables
/// or when building the cycle basis.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// The mesh has no faces.
    #[error("Mesh has no faces")]
    EmptyMesh,
    /// A face refers to a vertex that doesn't exist.
    #[error("Face {face} refers to vertex {vertex}, but the mesh only has {vertex_count} vertices")]
    VertexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        vertex: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
    /// A face has a repeated vertex or zero area.
    #[error("Face {0} is degenerate")]
    DegenerateFace(usize),
    /// An edge is shared by more than two faces.
    #[error("Edge ({}, {}) is shared by {face_count} faces", vertices[0], vertices[1])]
    NonManifoldEdge {
        /// The endpoints of the edge.
        vertices: [usize; 2],
        /// Number of faces sharing the edge.
        face_count: usize,
    },
    /// Two faces sharing an edge traverse it in the same direction.
    #[error("Faces {faces:?} are oriented inconsistently across edge ({}, {})", vertices[0], vertices[1])]
    InconsistentOrientation {
        /// The endpoints of the edge.
        vertices: [usize; 2],
        /// The two faces sharing the edge.
        faces: [usize; 2],
    },
    /// The faces around a vertex form more than one fan.
    #[error("Vertex {0} is non-manifold")]
    NonManifoldVertex(usize),
    /// A vertex isn't part of any face.
    #[error("Vertex {0} is not referenced by any face")]
    UnreferencedVertex(usize),
    /// The faces can't all be reached from each other through interior edges.
    #[error("Mesh has {components} disconnected components")]
    Disconnected {
        /// Number of face-connected components found.
        components: usize,
    },
}

/// Marker type for values assigned to mesh vertices.
#[derive(Clone, Copy, Debug)]
pub struct Vertex;
/// Marker type for values assigned to mesh edges.
#[derive(Clone, Copy, Debug)]
pub struct Edge;
/// Marker type for values assigned to mesh faces.
#[derive(Clone, Copy, Debug)]
pub struct Face;

/// Marker types for mesh elements a [`Cochain`][crate::Cochain]
/// can be created for directly from the mesh.
pub trait MeshElement: crate::cochain::CellKind {
    /// Number of elements of this kind in the mesh.
    fn count(mesh: &TriMesh) -> usize;
}

impl MeshElement for Vertex {
    fn count(mesh: &TriMesh) -> usize {
        mesh.vertex_count()
    }
}
impl MeshElement for Edge {
    fn count(mesh: &TriMesh) -> usize {
        mesh.edge_count()
    }
}
impl MeshElement for Face {
    fn count(mesh: &TriMesh) -> usize {
        mesh.face_count()
    }
}

/// The faces on either side of an edge.
///
/// `left` is the face that traverses the edge from its first vertex to its second
/// in counter-clockwise order. `right` is the other one, missing on the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeFaces {
    /// The face traversing the edge in its own direction.
    pub left: usize,
    /// The face traversing the edge in the opposite direction, if any.
    pub right: Option<usize>,
}

impl EdgeFaces {
    /// Get the face across the edge from `face`.
    #[inline]
    pub fn opposite(&self, face: usize) -> Option<usize> {
        if face == self.left {
            self.right
        } else if Some(face) == self.right {
            Some(self.left)
        } else {
            None
        }
    }
}

/// Orthonormal frame on a face.
///
/// `b1` points along the face's first edge, `normal` is the unit face normal
/// and `b2 = normal × b1`, so that angles measured in the `(b1, b2)` plane
/// grow counter-clockwise when seen from the normal's side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TangentBasis {
    /// First tangent axis.
    pub b1: Vec3,
    /// Second tangent axis.
    pub b2: Vec3,
    /// Unit normal.
    pub normal: Vec3,
}

impl TangentBasis {
    /// Project a vector into the tangent plane coordinates of this frame.
    #[inline]
    pub fn to_local(&self, v: &Vec3) -> Vec2 {
        Vec2::new(v.dot(&self.b1), v.dot(&self.b2))
    }

    /// Map tangent plane coordinates back to a 3D vector.
    #[inline]
    pub fn from_local(&self, v: &Vec2) -> Vec3 {
        v.x * self.b1 + v.y * self.b2
    }

    /// Angle of a vector's projection measured from `b1` towards `b2`.
    #[inline]
    pub fn angle_of(&self, v: &Vec3) -> f64 {
        f64::atan2(v.dot(&self.b2), v.dot(&self.b1))
    }

    /// Unit tangent vector at the given angle from `b1`.
    #[inline]
    pub fn direction(&self, angle: f64) -> Vec3 {
        angle.cos() * self.b1 + angle.sin() * self.b2
    }

    /// Express a vector as a complex number `x + iy` in this frame.
    #[inline]
    pub fn to_complex(&self, v: &Vec3) -> na::Complex<f64> {
        na::Complex::new(v.dot(&self.b1), v.dot(&self.b2))
    }

    /// Map a complex number in this frame back to a 3D vector.
    #[inline]
    pub fn from_complex(&self, z: na::Complex<f64>) -> Vec3 {
        z.re * self.b1 + z.im * self.b2
    }
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    /// The minimum corner of the box.
    pub min: Vec3,
    /// The maximum corner of the box.
    pub max: Vec3,
}

/// A manifold, consistently oriented triangle mesh
/// together with its edge topology and per-face tangent frames.
///
/// Topology is fixed at construction time;
/// all tables are derived once and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[usize; 3]>,
    /// EV: the two endpoints of every edge
    edge_vertices: Vec<[usize; 2]>,
    /// EF: the faces on either side of every edge
    edge_faces: Vec<EdgeFaces>,
    /// FE: for face `f`, edge `i` runs from corner `i` to corner `i + 1`
    face_edges: Vec<[usize; 3]>,
    bases: Vec<TangentBasis>,
    boundary_edges: fb::FixedBitSet,
    boundary_vertices: fb::FixedBitSet,
    /// boundary edges in traversal order, one list per boundary component
    boundary_loops: Vec<Vec<usize>>,
    bounds: BoundingBox,
}

impl TriMesh {
    /// Construct a mesh from vertex positions and counter-clockwise oriented triangles.
    ///
    /// Fails if the triangles don't form an orientable 2-manifold (possibly with boundary)
    /// or if any vertex is left unused.
    #[inline]
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Result<Self, StructuralError> {
        mesh_construction::build_mesh(vertices, faces)
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges in the mesh.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_vertices.len()
    }

    /// Number of faces in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Get a slice of all vertices in the mesh.
    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Vertex indices of every face.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Endpoints of every edge.
    #[inline]
    pub fn edge_vertices(&self) -> &[[usize; 2]] {
        &self.edge_vertices
    }

    /// Faces on either side of every edge.
    #[inline]
    pub fn edge_faces(&self) -> &[EdgeFaces] {
        &self.edge_faces
    }

    /// Edges of every face, in corner order.
    #[inline]
    pub fn face_edges(&self) -> &[[usize; 3]] {
        &self.face_edges
    }

    /// Tangent frames of every face.
    #[inline]
    pub fn bases(&self) -> &[TangentBasis] {
        &self.bases
    }

    /// Get a view into a face by its index.
    #[inline]
    pub fn face(&self, index: usize) -> FaceView<'_> {
        FaceView { mesh: self, index }
    }

    /// Get a view into an edge by its index.
    #[inline]
    pub fn edge(&self, index: usize) -> EdgeView<'_> {
        EdgeView { mesh: self, index }
    }

    /// Iterate over all faces in the mesh.
    pub fn faces(&self) -> FaceIter<'_> {
        FaceIter {
            mesh: self,
            index: 0,
        }
    }

    /// Iterate over all edges in the mesh.
    pub fn edges(&self) -> EdgeIter<'_> {
        EdgeIter {
            mesh: self,
            index: 0,
        }
    }

    /// Iterate over the edges that have a face on both sides.
    pub fn interior_edges(&self) -> impl '_ + Iterator<Item = EdgeView<'_>> {
        self.edges().filter(|e| !e.is_boundary())
    }

    /// Edges on the mesh boundary.
    #[inline]
    pub fn boundary_edges(&self) -> &fb::FixedBitSet {
        &self.boundary_edges
    }

    /// Vertices on the mesh boundary.
    #[inline]
    pub fn boundary_vertices(&self) -> &fb::FixedBitSet {
        &self.boundary_vertices
    }

    /// Boundary components as lists of edge indices in traversal order.
    #[inline]
    pub fn boundary_loops(&self) -> &[Vec<usize>] {
        &self.boundary_loops
    }

    /// Whether the mesh has no boundary.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.boundary_loops.is_empty()
    }

    /// Euler characteristic `V - E + F`.
    pub fn euler_characteristic(&self) -> i64 {
        self.vertex_count() as i64 - self.edge_count() as i64 + self.face_count() as i64
    }

    /// Get a bounding box enclosing the entire mesh.
    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Create a new cochain with a value of zero for each element of the given kind.
    pub fn new_zero_cochain<Element: MeshElement>(&self) -> crate::Cochain<Element> {
        crate::Cochain::zeros(Element::count(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn tangent_frames_are_orthonormal() {
        let mesh = shapes::torus(8, 6, 2.0, 0.5);
        for basis in mesh.bases() {
            assert!(relative_eq!(basis.b1.norm(), 1.0, epsilon = 1e-12));
            assert!(relative_eq!(basis.b2.norm(), 1.0, epsilon = 1e-12));
            assert!(relative_eq!(basis.normal.norm(), 1.0, epsilon = 1e-12));
            assert!(basis.b1.dot(&basis.b2).abs() < 1e-12);
            assert!(basis.b1.dot(&basis.normal).abs() < 1e-12);
            assert!(
                relative_eq!(basis.normal.cross(&basis.b1), basis.b2, epsilon = 1e-12),
                "frame should be right-handed"
            );
        }
    }

    #[test]
    fn local_angles_round_trip() {
        let mesh = shapes::octahedron();
        let basis = mesh.bases()[3];
        for angle in [-3.0, -1.2, 0.0, 0.4, 2.9] {
            let dir = basis.direction(angle);
            assert!(relative_eq!(basis.angle_of(&dir), angle, epsilon = 1e-12));
            let z = basis.to_complex(&dir);
            assert!(relative_eq!(basis.from_complex(z), dir, epsilon = 1e-12));
            assert!(relative_eq!(
                basis.from_local(&basis.to_local(&dir)),
                dir,
                epsilon = 1e-12
            ));
        }
    }

    #[test]
    fn euler_characteristics() {
        assert_eq!(shapes::octahedron().euler_characteristic(), 2);
        assert_eq!(shapes::cube().euler_characteristic(), 2);
        assert_eq!(shapes::torus(6, 5, 2.0, 0.7).euler_characteristic(), 0);
        assert_eq!(shapes::hexagon_disc().euler_characteristic(), 1);
        assert_eq!(shapes::flat_disc(3, 8).euler_characteristic(), 1);
        assert_eq!(shapes::chipped_torus(8, 6, 2.0, 0.7).euler_characteristic(), -1);
    }

    #[test]
    fn zero_cochains_have_element_counts() {
        let mesh = shapes::hexagon_disc();
        assert_eq!(mesh.new_zero_cochain::<Vertex>().len(), 7);
        assert_eq!(mesh.new_zero_cochain::<Edge>().len(), 12);
        assert_eq!(mesh.new_zero_cochain::<Face>().len(), 6);
    }

    #[test]
    fn face_geometry_and_bounds() {
        let mesh = shapes::hexagon_disc();
        let face = mesh.face(1);
        assert!(relative_eq!(face.area(), 0.5, epsilon = 1e-12));
        assert!(relative_eq!(
            face.barycenter(),
            Vec3::new(0.0, 2.0 / 3.0, 0.0),
            epsilon = 1e-12
        ));
        let mut neighbors: Vec<usize> = face.neighbors().map(|f| f.index()).collect();
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec![0, 2]);
        assert!(mesh.faces().all(|f| f.neighbors().count() <= 3));
        let total_area: f64 = mesh.faces().map(|f| f.area()).sum();
        assert!(relative_eq!(total_area, 3.0, epsilon = 1e-12));

        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }
}
