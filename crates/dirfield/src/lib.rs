//! `dirfield` computes N-directional fields on triangle meshes:
//! fields with `N` tangent directions per face,
//! such as cross fields (`N = 4`) used to guide quad meshing.
//!
//! Two ways of designing a field are provided.
//!
//! - **Trivial connections**: prescribe the singularity index of every
//!   dual cycle (vertex rings, boundary loops and handle generators)
//!   and get the smoothest rotationally symmetric field with exactly those singularities.
//! - **Poly-vector fields**: prescribe directions on some faces
//!   and get a smooth field interpolating them,
//!   without requiring the directions to be evenly spaced.
//!
//! Either way, the field's principal matching, matching effort
//! and resulting singularities can be analyzed afterwards.
//!
//! # Meshes
//!
//! A [`TriMesh`] is built from vertex positions and counter-clockwise triangles.
//! It must be an orientable manifold, possibly with boundary;
//! anything else is rejected with a [`StructuralError`].
//! A few procedural test shapes are available in [`mesh::shapes`].
//!
//! # Sessions
//!
//! The simplest way to use the crate is through a [`FieldSession`],
//! which computes the mesh's connection and cycle basis once
//! and synthesizes fields on request:
//!
//! ```
//! use dirfield as df;
//!
//! let mesh = df::mesh::shapes::cube();
//! let session = df::FieldSession::new(mesh, df::FieldConfig::default()).unwrap();
//! // every corner of a cube holds exactly a quarter turn of curvature
//! let indices = vec![1; session.cycles().cycle_count()];
//! let solution = session
//!     .synthesize(&df::Synthesis::PrescribedIndices {
//!         indices: indices.clone(),
//!         global_rotation: 0.0,
//!     })
//!     .unwrap();
//! assert_eq!(solution.indices, indices);
//! ```
//!
//! # Lower-level building blocks
//!
//! The steps a session performs are also available individually:
//! [`CycleBasis`] and [`DiscreteConnection`] describe the mesh,
//! [`trivial_connection()`] solves for edge rotations,
//! [`representative`] converts them to per-face directions and back,
//! [`matching`] and [`singularities`] analyze a field,
//! and [`poly_vector`] synthesizes fields from constraints.
//!
//! Values living on mesh elements are stored in [`Cochain`]s
//! typed by the kind of element they belong to,
//! and sparse linear maps between them are [`MatrixOperator`]s.
//!
//! # Features
//!
//! - `serde`: a serializable `TrivialFieldBundle` for storing prescribed-index fields.
//! - `rayon`: assemble and solve the poly-vector systems of each coefficient in parallel.

pub use dirfield_core::*;
