//! This is the core crate containing all of `dirfield`'s functionality.
//! See the `dirfield` crate's documentation for an introduction.

#![warn(missing_docs)]

pub mod mesh;
#[doc(inline)]
pub use mesh::{EdgeView, FaceView, StructuralError, TangentBasis, TriMesh};

pub mod cochain;
#[doc(inline)]
pub use cochain::Cochain;

pub mod operator;
#[doc(inline)]
pub use operator::{MatrixOperator, Op, Operator};

pub mod cycles;
#[doc(inline)]
pub use cycles::{CycleBasis, CycleKind};

pub mod connection;
#[doc(inline)]
pub use connection::DiscreteConnection;

pub mod solver;
#[doc(inline)]
pub use solver::SolverError;

pub mod trivial_connection;
#[doc(inline)]
pub use trivial_connection::{trivial_connection, TrivialConnection, TrivialConnectionParams};

pub mod representative;
#[doc(inline)]
pub use representative::{RawField, RepresentativeField};

pub mod matching;
#[doc(inline)]
pub use matching::PrincipalMatching;

pub mod singularities;

pub mod poly_vector;
#[doc(inline)]
pub use poly_vector::{PolyVectorField, PolyVectorSolver, SoftConstraints};

pub mod session;
#[doc(inline)]
pub use session::{FieldConfig, FieldError, FieldSession, FieldSolution, Synthesis};

pub(crate) mod union_find;

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 2D `nalgebra` vector.
pub type Vec2 = na::Vector2<f64>;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;
/// Type alias for a complex number, used for directions in a face's tangent plane.
pub type Complex = na::Complex<f64>;
