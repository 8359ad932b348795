//! A mesh with its derived structures, ready to synthesize fields.
//!
//! [`FieldSession`] builds the discrete connection and cycle basis once
//! and runs either synthesis path on request,
//! returning the same [`FieldSolution`] shape for both.
//!
//! # Example
//! ```
//! use dirfield_core::{mesh::shapes, session::*};
//!
//! let session = FieldSession::new(shapes::octahedron(), FieldConfig::default()).unwrap();
//! // four +1/4 singularities and two +1/2 ones
//! let solution = session
//!     .synthesize(&Synthesis::PrescribedIndices {
//!         indices: vec![2, 2, 1, 1, 1, 1],
//!         global_rotation: 0.0,
//!     })
//!     .unwrap();
//! assert_eq!(solution.indices, vec![2, 2, 1, 1, 1, 1]);
//! ```

use crate::{
    cochain::Cochain,
    connection::DiscreteConnection,
    cycles::{Cycle, CycleBasis},
    matching::{matching_effort, principal_matching, PrincipalMatching},
    mesh::{StructuralError, TriMesh},
    poly_vector::{poly_vector, PolyVectorField, SoftConstraints},
    representative::{adjustment_to_representative, RawField, RepresentativeField},
    singularities::{quantize, singularities},
    solver::SolverError,
    trivial_connection::{trivial_connection, TrivialConnectionParams},
};

/// Errors from setting up a session or synthesizing a field.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The mesh isn't a valid input.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// A linear solve or its inputs failed.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// Fields need at least one direction per face.
    #[error("Session field degree must be at least 1")]
    InvalidDegree,
}

/// Settings shared by every synthesis in a session.
#[derive(Clone, Copy, Debug)]
pub struct FieldConfig {
    /// Number of directions per face, `N`.
    pub degree: usize,
    /// Weight of soft constraints against smoothness in poly-vector synthesis.
    pub soft_weight: f64,
    /// Diagonal shift of the trivial connection system,
    /// relative to its mean diagonal.
    pub regularization: f64,
    /// Largest cycle constraint violation accepted as feasible.
    pub residual_tolerance: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        let tc = TrivialConnectionParams::default();
        Self {
            degree: 4,
            soft_weight: 1e6,
            regularization: tc.regularization,
            residual_tolerance: tc.residual_tolerance,
        }
    }
}

/// What kind of field to synthesize.
#[derive(Clone, Debug)]
pub enum Synthesis {
    /// A rotationally symmetric field with the given index around every cycle
    /// (in the cycle basis' row order, in units of `1/N` turns).
    PrescribedIndices {
        /// One index per cycle.
        indices: Vec<i32>,
        /// Angle of the field on the first face of every component.
        global_rotation: f64,
    },
    /// A poly-vector field pulled towards directions on some faces.
    SoftConstraints(SoftConstraints),
}

/// The field in the representation its synthesis path produces.
#[derive(Clone, Debug)]
pub enum SynthesizedField {
    /// One direction per face, the rest implied by symmetry.
    Representative(RepresentativeField),
    /// Polynomial coefficients per face.
    PolyVector(PolyVectorField),
}

/// Everything computed for a synthesized field.
#[derive(Clone, Debug)]
pub struct FieldSolution {
    /// The field as synthesized.
    pub field: SynthesizedField,
    /// All `N` directions per face.
    pub raw: RawField,
    /// Principal matching and effort across every edge.
    pub matching: PrincipalMatching,
    /// Index around every cycle, fractional.
    pub singularities: Cochain<Cycle>,
    /// [`singularities`][Self::singularities] rounded to integers.
    pub indices: Vec<i32>,
    /// How far the field is from what was asked:
    /// the cycle constraint violation for prescribed indices,
    /// the coefficient mismatch on constrained faces for soft constraints.
    pub residual: f64,
}

/// A mesh with its connection and cycle basis.
pub struct FieldSession {
    mesh: TriMesh,
    connection: DiscreteConnection,
    cycles: CycleBasis,
    config: FieldConfig,
}

impl FieldSession {
    /// Set up a session, computing the mesh's connection and cycle basis.
    pub fn new(mesh: TriMesh, config: FieldConfig) -> Result<Self, FieldError> {
        if config.degree == 0 {
            return Err(FieldError::InvalidDegree);
        }
        let cycles = CycleBasis::new(&mesh)?;
        let connection = DiscreteConnection::new(&mesh);
        log::info!(
            "field session: {} vertices, {} faces, genus {}, {} boundary loops, {} cycles",
            mesh.vertex_count(),
            mesh.face_count(),
            cycles.genus(),
            cycles.boundary_loop_count(),
            cycles.cycle_count()
        );
        Ok(Self {
            mesh,
            connection,
            cycles,
            config,
        })
    }

    /// The session's mesh.
    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// The mesh's discrete Levi-Civita connection.
    #[inline]
    pub fn connection(&self) -> &DiscreteConnection {
        &self.connection
    }

    /// The mesh's dual cycle basis.
    #[inline]
    pub fn cycles(&self) -> &CycleBasis {
        &self.cycles
    }

    /// The session's settings.
    #[inline]
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Synthesize a field and analyze its matching and singularities.
    ///
    /// Soft-constraint synthesis extracts every face's directions
    /// to compute the matching, so a [`SolverError::RootFinding`] failure on any face
    /// fails the whole call. Use [`poly_vector`] or
    /// [`PolyVectorSolver`][crate::poly_vector::PolyVectorSolver] directly
    /// to get the coefficients alone.
    pub fn synthesize(&self, request: &Synthesis) -> Result<FieldSolution, FieldError> {
        let degree = self.config.degree;
        let (field, raw, matching, residual) = match request {
            Synthesis::PrescribedIndices {
                indices,
                global_rotation,
            } => {
                let params = TrivialConnectionParams {
                    regularization: self.config.regularization,
                    residual_tolerance: self.config.residual_tolerance,
                    ..Default::default()
                };
                let tc = trivial_connection(&self.cycles, &self.connection, indices, degree, &params)?;
                let field = adjustment_to_representative(
                    &self.mesh,
                    &self.connection,
                    &tc.adjustment,
                    degree,
                    *global_rotation,
                );
                let matching = matching_effort(&self.mesh, &self.connection, &field);
                let raw = field.to_raw(&self.mesh);
                (SynthesizedField::Representative(field), raw, matching, tc.residual)
            }
            Synthesis::SoftConstraints(constraints) => {
                if constraints.degree() != degree {
                    return Err(SolverError::DimensionMismatch {
                        what: "directions per constrained face",
                        expected: degree,
                        actual: constraints.degree(),
                    }
                    .into());
                }
                let field = poly_vector(&self.mesh, constraints, self.config.soft_weight)?;
                let raw = field.to_raw(&self.mesh)?;
                let matching = principal_matching(&self.mesh, &self.connection, &raw);
                let residual = field.constraint_residual(&self.mesh, constraints);
                (SynthesizedField::PolyVector(field), raw, matching, residual)
            }
        };

        let singularities = singularities(&self.cycles, &matching.effort, &self.connection, degree);
        let indices = quantize(&singularities);
        log::debug!(
            "synthesized {degree}-field: {} nonzero indices, residual {residual:e}",
            indices.iter().filter(|i| **i != 0).count()
        );

        Ok(FieldSolution {
            field,
            raw,
            matching,
            singularities,
            indices,
            residual,
        })
    }
}

//
// persistence
//

/// Everything needed to recreate a prescribed-index field:
/// the mesh, the field's degree, its indices and its global rotation.
#[cfg(feature = "serde")]
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrivialFieldBundle {
    /// Vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Counter-clockwise vertex triples.
    pub faces: Vec<[usize; 3]>,
    /// Number of directions per face.
    pub degree: usize,
    /// Index around every cycle of the mesh's cycle basis.
    pub indices: Vec<i32>,
    /// Angle of the field on the first face of every component.
    pub global_rotation: f64,
}

#[cfg(feature = "serde")]
impl FieldSession {
    /// Capture the session's mesh and a prescribed-index request for storage.
    pub fn to_bundle(&self, indices: &[i32], global_rotation: f64) -> TrivialFieldBundle {
        TrivialFieldBundle {
            vertices: self.mesh.vertices().iter().map(|v| [v.x, v.y, v.z]).collect(),
            faces: self.mesh.triangles().to_vec(),
            degree: self.config.degree,
            indices: indices.to_vec(),
            global_rotation,
        }
    }

    /// Restore a session and the request stored in a bundle.
    ///
    /// Settings other than the degree are defaults.
    pub fn from_bundle(bundle: &TrivialFieldBundle) -> Result<(Self, Synthesis), FieldError> {
        let vertices = bundle
            .vertices
            .iter()
            .map(|v| crate::Vec3::new(v[0], v[1], v[2]))
            .collect();
        let mesh = TriMesh::new(vertices, bundle.faces.clone())?;
        let config = FieldConfig {
            degree: bundle.degree,
            ..Default::default()
        };
        let session = Self::new(mesh, config)?;
        if bundle.indices.len() != session.cycles.cycle_count() {
            return Err(SolverError::DimensionMismatch {
                what: "stored singularity indices",
                expected: session.cycles.cycle_count(),
                actual: bundle.indices.len(),
            }
            .into());
        }
        let request = Synthesis::PrescribedIndices {
            indices: bundle.indices.clone(),
            global_rotation: bundle.global_rotation,
        };
        Ok((session, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mesh::shapes, Vec3};
    use approx::abs_diff_eq;

    #[test]
    fn prescribed_indices_path() {
        let session = FieldSession::new(shapes::cube(), FieldConfig::default()).unwrap();
        let indices = vec![1; session.cycles().cycle_count()];
        let solution = session
            .synthesize(&Synthesis::PrescribedIndices {
                indices: indices.clone(),
                global_rotation: 0.25,
            })
            .unwrap();
        assert_eq!(solution.indices, indices);
        assert!(solution.residual < 1e-9);
        assert_eq!(solution.raw.face_count(), session.mesh().face_count());
        assert_eq!(solution.raw.degree(), 4);
        assert!(matches!(solution.field, SynthesizedField::Representative(_)));
    }

    #[test]
    fn soft_constraint_path() {
        let config = FieldConfig {
            degree: 2,
            ..Default::default()
        };
        let session = FieldSession::new(shapes::flat_disc(3, 10), config).unwrap();
        let constraints = SoftConstraints::new(
            2,
            vec![4],
            vec![Vec3::new(0.6, 0.8, 0.0), Vec3::new(-0.6, -0.8, 0.0)],
        )
        .unwrap();
        let solution = session
            .synthesize(&Synthesis::SoftConstraints(constraints))
            .unwrap();
        assert!(solution.residual < 1e-6, "residual {}", solution.residual);
        // a constant line field on a flat disc has no singularities
        assert!(solution.indices.iter().all(|i| *i == 0));
        assert!(solution.matching.effort.max_abs() < 1e-6);
        for vectors in solution.raw.iter_faces() {
            assert!(vectors
                .iter()
                .all(|v| abs_diff_eq!(v.x.abs(), 0.6, epsilon = 1e-6)));
        }
    }

    #[test]
    fn rejects_bad_requests() {
        assert_eq!(
            FieldSession::new(
                shapes::octahedron(),
                FieldConfig {
                    degree: 0,
                    ..Default::default()
                }
            )
            .err(),
            Some(FieldError::InvalidDegree)
        );

        let session = FieldSession::new(shapes::octahedron(), FieldConfig::default()).unwrap();
        let wrong_count = Synthesis::PrescribedIndices {
            indices: vec![0; 3],
            global_rotation: 0.0,
        };
        assert!(matches!(
            session.synthesize(&wrong_count),
            Err(FieldError::Solver(SolverError::DimensionMismatch { .. }))
        ));
        let wrong_degree = Synthesis::SoftConstraints(SoftConstraints::empty(3).unwrap());
        assert!(matches!(
            session.synthesize(&wrong_degree),
            Err(FieldError::Solver(SolverError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn structural_errors_pass_through() {
        // two separate triangles
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(5.0, 1.0, 0.0),
        ];
        let mesh = TriMesh::new(vertices, vec![[0, 1, 2], [3, 4, 5]]).unwrap();
        assert!(matches!(
            FieldSession::new(mesh, FieldConfig::default()),
            Err(FieldError::Structural(StructuralError::Disconnected { .. }))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn bundle_survives_json() {
        let session = FieldSession::new(shapes::octahedron(), FieldConfig::default()).unwrap();
        let bundle = session.to_bundle(&[2, 2, 1, 1, 1, 1], 0.5);
        let json = serde_json::to_string(&bundle).unwrap();
        let restored: TrivialFieldBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, bundle);

        let (restored_session, request) = FieldSession::from_bundle(&restored).unwrap();
        assert_eq!(restored_session.mesh().face_count(), 8);
        let solution = restored_session.synthesize(&request).unwrap();
        assert_eq!(solution.indices, vec![2, 2, 1, 1, 1, 1]);
    }
}
