//! Radiometric state carried by a beam.
//!
//! Rendering modes are a closed set of variants dispatched once per
//! top-level call: an unpolarized scalar at a single representative
//! wavelength, an RGB triple, a hero-wavelength spectral packet, or a full
//! Stokes description of polarized spectral radiance.

use anyhow::{bail, Result};
use nalgebra::{Matrix4, Vector3, Vector4};
use serde::Deserialize;

use crate::coherence::Coherence;

/// Hero-wavelength packet, in nanometers.
pub type Wavelengths = Vector4<f32>;

/// Spectral radiance samples at the hero wavelengths.
pub type SpectralSamples = Vector4<f32>;

/// Rendering mode selector, mirrored by the [`Radiance`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Unpolarized,
    Rgb,
    Spectral,
    Polarized,
}

/// Four Stokes components, each resolved over the hero wavelengths.
///
/// Component 0 is total intensity; 1 and 2 are linear polarization relative
/// to the owning beam's tangent; 3 is circular polarization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StokesSpectrum(pub [SpectralSamples; 4]);

impl StokesSpectrum {
    /// Unpolarized spectral radiance lifted into Stokes form.
    pub fn from_intensity(l: SpectralSamples) -> Self {
        Self([l, Vector4::zeros(), Vector4::zeros(), Vector4::zeros()])
    }

    pub fn intensity(&self) -> SpectralSamples {
        self.0[0]
    }

    /// Applies a Mueller matrix to every wavelength's Stokes column.
    pub fn apply(&self, m: &Matrix4<f32>) -> Self {
        let mut out = [Vector4::zeros(); 4];
        for lane in 0..4 {
            let s = Vector4::new(
                self.0[0][lane],
                self.0[1][lane],
                self.0[2][lane],
                self.0[3][lane],
            );
            let r = m * s;
            for c in 0..4 {
                out[c][lane] = r[c];
            }
        }
        Self(out)
    }

    pub fn scale(&self, s: f32) -> Self {
        Self([self.0[0] * s, self.0[1] * s, self.0[2] * s, self.0[3] * s])
    }

    pub fn scale_spectrum(&self, s: &SpectralSamples) -> Self {
        Self([
            self.0[0].component_mul(s),
            self.0[1].component_mul(s),
            self.0[2].component_mul(s),
            self.0[3].component_mul(s),
        ])
    }
}

/// The beam's radiometric payload, tagged by rendering mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Radiance {
    /// Scalar radiance at one representative wavelength.
    Unpolarized(f32),
    /// Tristimulus radiance.
    Rgb(Vector3<f32>),
    /// Hero-wavelength spectral radiance.
    Spectral(SpectralSamples),
    /// Polarized spectral radiance in Stokes form.
    Polarized(StokesSpectrum),
}

impl Radiance {
    pub fn mode(&self) -> RenderMode {
        match self {
            Radiance::Unpolarized(_) => RenderMode::Unpolarized,
            Radiance::Rgb(_) => RenderMode::Rgb,
            Radiance::Spectral(_) => RenderMode::Spectral,
            Radiance::Polarized(_) => RenderMode::Polarized,
        }
    }

    /// Whether per-wavelength queries are meaningful for this payload.
    pub fn is_spectral(&self) -> bool {
        matches!(self, Radiance::Spectral(_) | Radiance::Polarized(_))
    }

    pub fn is_polarized(&self) -> bool {
        matches!(self, Radiance::Polarized(_))
    }

    /// Multiplies the payload by a scalar. Always valid.
    pub fn scale(&mut self, s: f32) {
        match self {
            Radiance::Unpolarized(l) => *l *= s,
            Radiance::Rgb(l) => *l *= s,
            Radiance::Spectral(l) => *l *= s,
            Radiance::Polarized(st) => *st = st.scale(s),
        }
    }

    /// Multiplies the payload component-wise by a spectral weight.
    ///
    /// Errors in non-spectral modes, where there is no per-wavelength
    /// resolution to scale.
    pub fn scale_spectrum(&mut self, s: &SpectralSamples) -> Result<()> {
        match self {
            Radiance::Spectral(l) => {
                *l = l.component_mul(s);
                Ok(())
            }
            Radiance::Polarized(st) => {
                *st = st.scale_spectrum(s);
                Ok(())
            }
            other => bail!(
                "spectral scaling requested in {:?} mode, which has no per-wavelength resolution",
                other.mode()
            ),
        }
    }

    /// Rotates the Stokes reference basis. Errors unless polarized.
    pub fn rotate_stokes(&mut self, m: &Matrix4<f32>) -> Result<()> {
        match self {
            Radiance::Polarized(st) => {
                *st = st.apply(m);
                Ok(())
            }
            other => bail!(
                "Stokes rotation requested in {:?} mode, which carries no polarization state",
                other.mode()
            ),
        }
    }
}

/// Radiance generalized with the coherence moments a wave BSDF evaluation
/// produces alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedRadiance {
    pub l: SpectralSamples,
    pub l1: SpectralSamples,
    pub l2: SpectralSamples,
    pub l3: SpectralSamples,
    pub coherence: Coherence,
}

impl GeneralizedRadiance {
    pub fn new(l: SpectralSamples) -> Self {
        Self {
            l,
            l1: Vector4::zeros(),
            l2: Vector4::zeros(),
            l3: Vector4::zeros(),
            coherence: Coherence::default(),
        }
    }

    pub fn zero() -> Self {
        Self::new(Vector4::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_applies_to_all_stokes_components() {
        let mut r = Radiance::Polarized(StokesSpectrum([
            Vector4::repeat(1.0),
            Vector4::repeat(0.5),
            Vector4::repeat(-0.5),
            Vector4::zeros(),
        ]));
        r.scale(2.0);
        match r {
            Radiance::Polarized(st) => {
                assert!((st.0[0][0] - 2.0).abs() < 1e-6);
                assert!((st.0[1][0] - 1.0).abs() < 1e-6);
                assert!((st.0[2][0] + 1.0).abs() < 1e-6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn spectral_scale_rejected_for_scalar_payload() {
        let mut r = Radiance::Unpolarized(1.0);
        assert!(r.scale_spectrum(&Vector4::repeat(0.5)).is_err());
    }

    #[test]
    fn stokes_rotation_rejected_when_unpolarized() {
        let mut r = Radiance::Spectral(Vector4::repeat(1.0));
        assert!(r.rotate_stokes(&Matrix4::identity()).is_err());
    }
}
