//! Partially-coherent, polarized light transport for physically based
//! rendering.
//!
//! Instead of bare radiance, transport works on [`beam::Beam`]s: rays that
//! carry a polarization state, a transverse reference frame, and a
//! [`coherence::Coherence`] matrix describing how quickly mutual coherence
//! decays across the wavefront. Periodic surface microstructure is modelled
//! by [`grating::DiffractionGrating`], which scatters into discrete angular
//! lobes rather than a continuous BRDF lobe.
//!
//! The crate is the in-process core consumed by a surface-scattering plugin
//! and a path-tracing integrator; it has no network, file, or CLI surface
//! beyond the [`settings`] loader.

pub mod beam;
pub mod bounce;
pub mod coherence;
pub mod config;
pub mod frame;
pub mod fresnel;
pub mod grating;
pub mod math;
pub mod mueller;
pub mod sample;
pub mod settings;
pub mod spectrum;
