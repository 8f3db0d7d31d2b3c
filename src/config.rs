//! Numerical constants shared across the transport core.

/// Minimum absolute value of the dot product of two vectors to be considered colinear.
pub const COLINEAR_THRESHOLD: f32 = 0.001;
/// Minimum transverse-direction separation (radians) before the reciprocal remapping blows up.
pub const ANGULAR_EPSILON: f32 = 1e-4;
/// Floor for the accumulated optical path length when it appears in a denominator.
pub const OPL_EPSILON: f32 = 1e-6;
/// Floor for per-axis transverse components when extracting sines of incidence.
pub const DIRECTION_EPSILON: f32 = 1e-6;
/// Diffusivity assigned to a beam forced to be fully coherent. Effectively singular.
pub const COHERENT_DIFFUSIVITY: f32 = 1e-18;
/// Optical path length assigned to beams emitted by distant (far-field) sources.
pub const DISTANT_OPL: f32 = 1.0;
/// Optical path length at beam inception from a near-field incoherent emitter.
/// Pinned near zero so that decoherence is immediate until the beam has travelled.
pub const SOURCE_OPL: f32 = 1e-3;
/// Upper bound on the number of diffraction lobes considered per axis.
pub const MAX_LOBES: usize = 9;
/// Default clamp on an emitter's solid angle when seeding beam coherence.
pub const DEFAULT_MAX_SOLID_ANGLE: f32 = 0.2;
/// Determinants smaller than this are treated as singular (fully coherent limit).
pub const SINGULAR_DET_THRESHOLD: f32 = 1e-20;
