//! Records exchanged between the transport core and the surface-scattering
//! code that consumes it.
//!
//! A sampling call produces a [`SamplePhaseData`] bundle that must be handed
//! back to the matching evaluate/pdf call, so that density evaluation stays
//! consistent with what was actually sampled (the chosen diffraction lobe,
//! the specular direction, and the wavelengths that drove the draw).

use bitflags::bitflags;
use nalgebra::{Vector2, Vector3};

use crate::coherence::Coherence;
use crate::spectrum::{GeneralizedRadiance, Wavelengths};

bitflags! {
    /// Classification of a scattering event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScatterFlags: u32 {
        const GLOSSY_REFLECTION = 1 << 0;
        const DIFFRACTION       = 1 << 1;
        const DELTA             = 1 << 2;
        const FRONT_SIDE        = 1 << 3;
    }
}

/// Outcome of sampling a scattering direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSample {
    /// Sampled outgoing direction, local frame.
    pub wo: Vector3<f32>,
    /// Joint density of the sample (microfacet and lobe terms combined).
    pub pdf: f32,
    /// Relative index of refraction across the interface.
    pub eta: f32,
    pub flags: ScatterFlags,
}

impl ScatterSample {
    pub fn zero() -> Self {
        Self {
            wo: Vector3::zeros(),
            pdf: 0.0,
            eta: 1.0,
            flags: ScatterFlags::empty(),
        }
    }
}

/// Everything a sampling call must pass forward so a later evaluate/pdf call
/// reproduces the same densities.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePhaseData {
    pub sample: ScatterSample,
    /// The chosen diffraction lobe; zero when no grating was involved.
    pub diffraction_lobe: Vector2<i32>,
    /// The pure specular (mirror) direction at the sampled microfacet.
    pub reflection_dir: Vector3<f32>,
    /// Coherence contribution of the grating interaction, to be composed
    /// with the beam's own state by the integrator.
    pub grating_coherence: Coherence,
    /// Wavelengths that drove the sampling; index 0 is the hero wavelength.
    pub sampling_wavelengths: Wavelengths,
}

impl SamplePhaseData {
    /// Neutral record for masked-out or rejected lanes.
    pub fn inactive(wavelengths: Wavelengths) -> Self {
        Self {
            sample: ScatterSample::zero(),
            diffraction_lobe: Vector2::zeros(),
            reflection_dir: Vector3::zeros(),
            grating_coherence: Coherence::new(0.0, 0.0),
            sampling_wavelengths: wavelengths,
        }
    }
}

/// Capability interface implemented by wave-aware surface scattering models.
///
/// The transport core never dispatches through this trait itself; it exists
/// so integrators and materials agree on the shape of the exchange.
pub trait WaveBsdf {
    /// Samples an outgoing direction. `sample2` drives the microfacet
    /// normal, `lobe_sample2` the diffraction lobe.
    fn sample(
        &self,
        wi: &Vector3<f32>,
        wavelengths: &Wavelengths,
        sample2: &Vector2<f32>,
        lobe_sample2: &Vector2<f32>,
        active: bool,
    ) -> (SamplePhaseData, GeneralizedRadiance);

    /// Evaluates the scattering distribution toward `wo`, consistent with
    /// the densities recorded in `phase`.
    fn evaluate(
        &self,
        wi: &Vector3<f32>,
        wo: &Vector3<f32>,
        phase: &SamplePhaseData,
        active: bool,
    ) -> GeneralizedRadiance;

    /// Density of sampling `wo`, consistent with `phase`.
    fn pdf(&self, wi: &Vector3<f32>, wo: &Vector3<f32>, phase: &SamplePhaseData, active: bool)
        -> f32;
}
