//! Transverse mutual-coherence state of a beam.
//!
//! The coherence of a wavefront across its transverse plane is modelled as a
//! Gaussian falloff whose quadratic form is driven by a 2x2 symmetric
//! "diffusivity" matrix together with the optical path length travelled
//! since inception. The exponent matrix at angular wavenumber `k` is
//!
//! `M(k) = (k / opl)^2 * dmat`
//!
//! so a freshly created incoherent source (`opl` near zero) decoheres
//! immediately, while free-space propagation grows the coherence area in
//! accordance with the van Cittert-Zernike theorem. The inverse of `M(k)`
//! is the coherence shape matrix: its determinant is the squared coherence
//! area.

use nalgebra::Matrix2;

use crate::config;
use crate::math;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coherence {
    /// Symmetric positive semi-definite angular diffusivity.
    pub dmat: Matrix2<f32>,
    /// Accumulated optical path length since the state was last reset.
    pub opl: f32,
}

impl Default for Coherence {
    /// Fully coherent state: effectively singular diffusivity.
    fn default() -> Self {
        Self::new(config::COHERENT_DIFFUSIVITY, config::DISTANT_OPL)
    }
}

impl Coherence {
    /// Isotropic diffusivity.
    pub fn new(diffusivity: f32, opl: f32) -> Self {
        Self {
            dmat: Matrix2::identity() * diffusivity,
            opl,
        }
    }

    /// Anisotropic diffusivity from an explicit quadratic form.
    pub fn from_matrix(dmat: Matrix2<f32>, opl: f32) -> Self {
        Self { dmat, opl }
    }

    /// The wavelength-independent part of the coherence exponent,
    /// `dmat / opl^2`. Rescale by `k^2` at use time.
    pub fn inv_coherence_matrix_unscaled(&self) -> Matrix2<f32> {
        let opl = self.opl.max(config::OPL_EPSILON);
        self.dmat / (opl * opl)
    }

    /// Inverse coherence (exponent) matrix at angular wavenumber `k`.
    pub fn inv_coherence_matrix(&self, k: f32) -> Matrix2<f32> {
        self.inv_coherence_matrix_unscaled() * (k * k)
    }

    /// Determinant of the inverse coherence matrix at wavenumber `k`.
    ///
    /// Non-finite results collapse to `0.0`, which disables the coherence
    /// falloff term in callers instead of propagating NaN.
    pub fn inv_coherence_det(&self, k: f32) -> f32 {
        math::guard_finite(self.inv_coherence_matrix(k).determinant(), 0.0)
    }

    /// Wavelength-independent determinant, same sentinel policy.
    pub fn inv_coherence_det_unscaled(&self) -> f32 {
        math::guard_finite(self.inv_coherence_matrix_unscaled().determinant(), 0.0)
    }

    /// Coherence shape matrix at wavenumber `k`: the inverse of
    /// [`inv_coherence_matrix`](Self::inv_coherence_matrix).
    ///
    /// A singular diffusivity is the fully coherent limit; the shape matrix
    /// is then unbounded and `None` is returned so callers treat the mutual
    /// coherence as 1 everywhere rather than as a numerical error.
    pub fn coherence_matrix(&self, k: f32) -> Option<Matrix2<f32>> {
        let m = self.inv_coherence_matrix(k);
        if m.determinant().abs() < config::SINGULAR_DET_THRESHOLD {
            return None;
        }
        m.try_inverse()
    }

    /// Squared coherence area at wavenumber `k`: determinant of the shape
    /// matrix, infinite in the coherent limit.
    pub fn coherence_area(&self, k: f32) -> f32 {
        let det = self.inv_coherence_det(k);
        if det.abs() < config::SINGULAR_DET_THRESHOLD {
            f32::INFINITY
        } else {
            1.0 / det
        }
    }

    /// Advances the optical path length by `distance` where `active`.
    ///
    /// Free-space spreading only ever grows the coherence area; callers gate
    /// this with `!distant` so far-field beams keep their collapsed state.
    pub fn propagate(&mut self, distance: f32, active: bool) {
        self.opl += math::select(active, distance.max(0.0), 0.0);
    }

    /// Congruence transform `m^T * dmat * m` of the diffusivity, applied
    /// where `active`. Used for basis changes and interaction-induced
    /// divergence (microfacet roughness, grating dispersion).
    pub fn transform(&mut self, m: &Matrix2<f32>, active: bool) {
        let transformed = m.transpose() * self.dmat * m;
        self.dmat = math::select(active, transformed, self.dmat);
    }

    /// Reciprocal, 90-degree-rotated form of the diffusivity used when
    /// correlating directions rather than positions: the rotated adjugate
    /// scaled by the reciprocal of the squared optical path length.
    pub fn rmm(&self) -> Matrix2<f32> {
        let opl = self.opl.max(config::OPL_EPSILON);
        Matrix2::new(
            self.dmat[(1, 1)],
            -self.dmat[(0, 1)],
            -self.dmat[(1, 0)],
            self.dmat[(0, 0)],
        ) / (opl * opl)
    }
}
