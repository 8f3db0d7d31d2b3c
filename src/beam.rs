//! The beam: the unit of partially-coherent, polarized light transport.
//!
//! A beam bundles a geometric ray (origin, forward direction, transverse
//! reference tangent), a radiometric payload, and the transverse coherence
//! state. The integrator creates one beam per path at a light source,
//! propagates it between interactions, and rotates or redirects its frame
//! at every vertex. All operations honour the per-lane `active` flag by
//! producing neutral values instead of skipping work, so batched callers
//! can drive any subset of lanes without desynchronizing.

use anyhow::{bail, Result};
use log::warn;
use nalgebra::{Matrix2, Point3, Vector2, Vector3, Vector4};

use crate::coherence::Coherence;
use crate::config;
use crate::math;
use crate::mueller;
use crate::spectrum::{Radiance, SpectralSamples, Wavelengths};

#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// Radiometric payload; Stokes parameters only in polarized mode.
    pub sp: Radiance,
    /// Origin of the ray.
    pub origin: Point3<f32>,
    /// Unit direction of forward propagation.
    pub dir: Vector3<f32>,
    /// Transverse reference direction; the polarization basis. The second
    /// transverse axis is `dir x tangent`.
    pub tangent: Vector3<f32>,
    /// Transverse mutual-coherence state.
    pub coherence: Coherence,
    /// True if the beam originates from an interaction effectively at
    /// infinity (environment light, far-field emitter).
    pub distant: bool,
    /// Per-lane validity flag; operations are neutral where false.
    pub active: bool,
}

impl Beam {
    pub fn new(
        sp: Radiance,
        coherence: Coherence,
        origin: Point3<f32>,
        dir: Vector3<f32>,
        tangent: Vector3<f32>,
        distant: bool,
        active: bool,
    ) -> Self {
        Self {
            sp,
            origin,
            dir,
            tangent,
            coherence,
            distant,
            active,
        }
    }

    /// Beam emitted by a near-field source at `origin`. The optical path
    /// length starts pinned near zero: a fully incoherent emitter decoheres
    /// immediately until the beam has travelled.
    pub fn source_beam(
        origin: Point3<f32>,
        dir: Vector3<f32>,
        sp: Radiance,
        diffusivity: f32,
    ) -> Self {
        let dir = dir.normalize();
        Self {
            sp,
            origin,
            dir,
            tangent: math::orthonormal_tangent(&dir),
            coherence: Coherence::new(diffusivity, config::SOURCE_OPL),
            distant: false,
            active: true,
        }
    }

    /// Beam arriving from a distant source subtending `solid_angle`.
    ///
    /// The solid angle is clamped to `max_solid_angle` to bound the initial
    /// diffusivity, and `force_coherent` substitutes a near-singular
    /// (effectively coherent) state, e.g. for laser-like emitters. Distant
    /// beams do not accumulate further decoherence when propagated.
    pub fn distant_source_beam(
        dir: Vector3<f32>,
        solid_angle: f32,
        sp: Radiance,
        max_solid_angle: f32,
        force_coherent: bool,
    ) -> Self {
        let dir = dir.normalize();
        if solid_angle > max_solid_angle {
            warn!(
                "distant source solid angle {solid_angle} clamped to {max_solid_angle} \
                 to bound the initial coherence spread"
            );
        }
        let omega = solid_angle.clamp(0.0, max_solid_angle);
        let diffusivity = math::select(
            force_coherent,
            config::COHERENT_DIFFUSIVITY,
            (omega / std::f32::consts::PI).max(config::COHERENT_DIFFUSIVITY),
        );
        Self {
            sp,
            origin: Point3::origin(),
            dir,
            tangent: math::orthonormal_tangent(&dir),
            coherence: Coherence::new(diffusivity, config::DISTANT_OPL),
            distant: true,
            active: true,
        }
    }

    /// Second transverse axis, completing the right-handed frame.
    #[inline]
    pub fn bitangent(&self) -> Vector3<f32> {
        self.dir.cross(&self.tangent)
    }

    /// Multiplies the radiometric payload by a scalar.
    pub fn scale_sp(&mut self, s: f32) {
        let s = math::select(self.active, s, 1.0);
        self.sp.scale(s);
    }

    /// Multiplies the radiometric payload component-wise by a spectrum.
    pub fn scale_sp_spectrum(&mut self, s: &SpectralSamples) -> Result<()> {
        let s = math::select(self.active, *s, Vector4::repeat(1.0));
        self.sp.scale_spectrum(&s)
    }

    /// Rotation from the beam's (tangent, bitangent) basis to the projection
    /// of the world x/y axes onto the transverse plane. Falls back to the
    /// identity when the world x axis is parallel to the beam.
    pub fn transverse_rotation(&self) -> Matrix2<f32> {
        let xp = Vector3::x() - self.dir.x * self.dir;
        if xp.norm() < config::COLINEAR_THRESHOLD {
            return Matrix2::identity();
        }
        let xp = xp.normalize();
        let c = self.tangent.dot(&xp);
        let s = self.bitangent().dot(&xp);
        Matrix2::new(c, s, -s, c)
    }

    /// Mutual coherence between the beam axis and a nearby point offset by
    /// `offset`, at angular wavenumber `k`.
    ///
    /// A singular coherence state is the fully coherent limit and evaluates
    /// to 1 for every offset.
    pub fn mutual_coherence(&self, k: f32, offset: &Vector3<f32>) -> f32 {
        let o = Vector3::new(
            offset.dot(&self.tangent),
            offset.dot(&self.bitangent()),
            0.0,
        );
        let m = self.coherence.inv_coherence_matrix(k);
        let e = m[(0, 0)] * o.x * o.x + (m[(0, 1)] + m[(1, 0)]) * o.x * o.y + m[(1, 1)] * o.y * o.y;
        let gamma = (-0.5 * e).exp();
        math::guard_finite(gamma, 1.0).clamp(0.0, 1.0)
    }

    /// Per-wavelength mutual coherence, each sample at its own wavenumber.
    ///
    /// Only meaningful under spectral rendering; other modes carry a single
    /// representative wavelength and this is a hard configuration error.
    pub fn mutual_coherence_spectral(
        &self,
        wavelengths: &Wavelengths,
        offset: &Vector3<f32>,
    ) -> Result<SpectralSamples> {
        if !self.sp.is_spectral() {
            bail!(
                "per-wavelength mutual coherence queried in {:?} mode",
                self.sp.mode()
            );
        }
        let mut out = Vector4::zeros();
        for i in 0..4 {
            // wavelengths arrive in nm, the coherence state is in um
            let k = math::wavenumber(wavelengths[i] * 1e-3);
            out[i] = self.mutual_coherence(k, offset);
        }
        Ok(out)
    }

    /// Mutual coherence between two nearby directions in the transverse
    /// plane, used to judge how strongly two diffraction lobes (or a lobe
    /// and the specular direction) correlate.
    ///
    /// The angular separation is remapped through a reciprocal distance and
    /// evaluated against the rotated reciprocal form of the coherence state.
    /// Identical directions evaluate to 1; NaN from a degenerate state
    /// collapses to 0 (no correlation) rather than propagating.
    pub fn mutual_coherence_angular(&self, d1: &Vector3<f32>, d2: &Vector3<f32>) -> f32 {
        let separation = math::unit_angle(d1, d2);

        // Direction of the transverse offset, with an epsilon floor on the
        // normalization so near-identical directions cannot blow up the
        // division. The rmm form already carries the reciprocal 1/opl^2
        // remapping from positional to angular falloff.
        let delta = d2 - d1;
        let o = Vector2::new(delta.dot(&self.tangent), delta.dot(&self.bitangent()));
        let u = o / o.norm().max(config::ANGULAR_EPSILON);

        let m = self.coherence.rmm();
        let rate = m[(0, 0)] * u.x * u.x
            + (m[(0, 1)] + m[(1, 0)]) * u.x * u.y
            + m[(1, 1)] * u.y * u.y;
        let rate = math::guard_finite(rate, 0.0).max(0.0);

        let gamma = (-0.5 * separation * separation * rate).exp();
        math::guard_finite(gamma, 0.0).clamp(0.0, 1.0)
    }

    /// Parallel transport of the polarization reference frame.
    ///
    /// Computes the signed angle from the current tangent to `new_tangent`
    /// about the propagation direction, rotates the Stokes state by the
    /// corresponding Mueller rotator, and commits the new tangent. Only the
    /// rotation forced by the frame change is introduced. Errors in
    /// non-polarized modes, which have no Stokes state to rotate.
    pub fn rotate_frame(&mut self, new_tangent: &Vector3<f32>) -> Result<()> {
        if !self.sp.is_polarized() {
            bail!(
                "frame rotation requested in {:?} mode, which carries no Stokes state",
                self.sp.mode()
            );
        }
        let new_tangent = new_tangent.normalize();
        if new_tangent.dot(&self.dir).abs() >= config::COLINEAR_THRESHOLD {
            bail!("new tangent is not orthogonal to the propagation direction");
        }
        if !self.active {
            return Ok(());
        }

        let cos_theta = self.tangent.dot(&new_tangent).clamp(-1.0, 1.0);
        let mut theta = cos_theta.acos();
        if self.dir.cross(&self.tangent).dot(&new_tangent) < 0.0 {
            theta = -theta;
        }

        self.sp.rotate_stokes(&mueller::rotator(theta))?;
        self.tangent = new_tangent;
        Ok(())
    }

    /// Applies a linear map to the coherence diffusivity (congruence
    /// transform), masked by the lane flag.
    pub fn transform_coherence(&mut self, m: &Matrix2<f32>) {
        self.coherence.transform(m, self.active);
    }

    /// Moves the beam origin to `p`, advancing the coherence state by the
    /// travelled distance. Distant beams keep their coherence unchanged:
    /// their propagation already happened at infinity.
    pub fn propagate(&mut self, p: &Point3<f32>) {
        let distance = (p - self.origin).norm();
        self.coherence
            .propagate(distance, self.active && !self.distant);
        self.origin = math::select(self.active, *p, self.origin);
    }

    /// Re-establishes the transverse frame for a new propagation direction.
    /// Must be called whenever the direction changes discontinuously; the
    /// frame is never left silently stale.
    pub fn create_local_frame(&mut self, new_dir: &Vector3<f32>) {
        let new_dir = new_dir.normalize();
        self.dir = math::select(self.active, new_dir, self.dir);
        self.tangent = math::select(
            self.active,
            math::orthonormal_tangent(&self.dir),
            self.tangent,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::StokesSpectrum;

    fn polarized_beam() -> Beam {
        let stokes = StokesSpectrum([
            Vector4::repeat(1.0),
            Vector4::repeat(0.4),
            Vector4::repeat(0.2),
            Vector4::repeat(0.1),
        ]);
        Beam::source_beam(
            Point3::origin(),
            Vector3::z(),
            Radiance::Polarized(stokes),
            0.05,
        )
    }

    #[test]
    fn distant_beam_propagation_keeps_coherence() {
        let mut beam = Beam::distant_source_beam(
            Vector3::z(),
            0.01,
            Radiance::Spectral(Vector4::repeat(1.0)),
            config::DEFAULT_MAX_SOLID_ANGLE,
            false,
        );
        let before = beam.coherence;
        beam.propagate(&Point3::new(0.0, 0.0, 500.0));
        assert_eq!(beam.coherence, before);
        assert!((beam.origin.z - 500.0).abs() < 1e-4);
    }

    #[test]
    fn inactive_lane_is_neutral() {
        let mut beam = polarized_beam();
        beam.active = false;
        let before = beam.clone();
        beam.propagate(&Point3::new(0.0, 0.0, 10.0));
        beam.scale_sp(3.0);
        beam.transform_coherence(&Matrix2::new(2.0, 0.0, 0.0, 2.0));
        assert_eq!(beam, before);
    }

    #[test]
    fn self_coherence_is_maximal() {
        let beam = polarized_beam();
        let k = math::wavenumber(0.5);
        assert!((beam.mutual_coherence(k, &Vector3::zeros()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn coherence_decays_with_offset() {
        let mut beam = polarized_beam();
        beam.coherence = Coherence::new(0.5, config::SOURCE_OPL);
        let k = math::wavenumber(0.5);
        let near = beam.mutual_coherence(k, &Vector3::new(0.001, 0.0, 0.0));
        let far = beam.mutual_coherence(k, &Vector3::new(0.1, 0.0, 0.0));
        assert!(near >= far);
        assert!(far < 1.0);
    }

    #[test]
    fn spectral_coherence_rejected_for_scalar_payload() {
        let beam = Beam::source_beam(Point3::origin(), Vector3::z(), Radiance::Unpolarized(1.0), 0.1);
        assert!(beam
            .mutual_coherence_spectral(&Vector4::repeat(500.0), &Vector3::zeros())
            .is_err());
    }

    #[test]
    fn angular_self_coherence_is_unity() {
        let beam = polarized_beam();
        let d = Vector3::new(0.2, 0.1, 0.97).normalize();
        assert!((beam.mutual_coherence_angular(&d, &d) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rotate_frame_round_trip_restores_stokes() {
        let mut beam = polarized_beam();
        let t1 = beam.tangent;
        let t2 = (t1 + 0.7 * beam.bitangent()).normalize();
        let before = beam.sp.clone();

        beam.rotate_frame(&t2).unwrap();
        assert_ne!(beam.sp, before);
        beam.rotate_frame(&t1).unwrap();

        match (&beam.sp, &before) {
            (Radiance::Polarized(a), Radiance::Polarized(b)) => {
                for c in 0..4 {
                    assert!((a.0[c] - b.0[c]).norm() < 1e-5);
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn rotate_frame_normalizes_the_tangent_up_front() {
        let mut unit = polarized_beam();
        let mut scaled = polarized_beam();
        let t = (unit.tangent + 0.5 * unit.bitangent()).normalize();

        unit.rotate_frame(&t).unwrap();
        scaled.rotate_frame(&(1.3 * t)).unwrap();

        assert!((unit.tangent - scaled.tangent).norm() < 1e-6);
        match (&unit.sp, &scaled.sp) {
            (Radiance::Polarized(a), Radiance::Polarized(b)) => {
                for c in 0..4 {
                    assert!((a.0[c] - b.0[c]).norm() < 1e-6);
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn rotate_frame_rejected_when_unpolarized() {
        let mut beam =
            Beam::source_beam(Point3::origin(), Vector3::z(), Radiance::Unpolarized(1.0), 0.1);
        let t = beam.bitangent();
        assert!(beam.rotate_frame(&t).is_err());
    }

    #[test]
    fn transverse_rotation_is_orthonormal() {
        let beam = polarized_beam();
        let r = beam.transverse_rotation();
        assert!((r.determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn solid_angle_clamp_bounds_diffusivity() {
        let wide = Beam::distant_source_beam(
            Vector3::z(),
            10.0,
            Radiance::Spectral(Vector4::repeat(1.0)),
            config::DEFAULT_MAX_SOLID_ANGLE,
            false,
        );
        let max = config::DEFAULT_MAX_SOLID_ANGLE / std::f32::consts::PI;
        assert!(wide.coherence.dmat[(0, 0)] <= max + 1e-6);

        let coherent = Beam::distant_source_beam(
            Vector3::z(),
            10.0,
            Radiance::Spectral(Vector4::repeat(1.0)),
            config::DEFAULT_MAX_SOLID_ANGLE,
            true,
        );
        assert!(coherent.coherence.dmat[(0, 0)] <= config::COHERENT_DIFFUSIVITY);
    }
}
