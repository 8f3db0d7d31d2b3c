//! Discrete diffraction-order model for periodic surface microstructure.
//!
//! A grating at a surface point redirects incident energy into a discrete
//! set of angular lobes indexed by an integer pair. The model is a pure
//! query object: given an incidence direction and a wavelength it evaluates
//! lobe intensities, importance-samples a lobe, and solves the generalized
//! grating equation for the outgoing direction. Lengths are in micrometers.

use std::f32::consts::PI;

use anyhow::{bail, Result};
use nalgebra::{Matrix2, Vector2, Vector3};

use crate::config;
use crate::frame::Frame;
use crate::math;

/// Groove profile of the grating. The profile decides how intensity falls
/// off across diffraction orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffractionGratingType {
    /// Sinusoidal relief; order intensities follow squared Bessel functions.
    Sinusoidal,
    /// Rectangular (lamellar) relief; sine times sinc falloff.
    Rectangular,
    /// Generic linear falloff, `1/sqrt(|order|)`.
    Linear,
}

impl DiffractionGratingType {
    /// Parses a configuration string. Unknown names are a hard error.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sinusoidal" => Ok(Self::Sinusoidal),
            "rectangular" => Ok(Self::Rectangular),
            "linear" => Ok(Self::Linear),
            other => bail!("unknown grating type \"{other}\""),
        }
    }
}

/// Diffraction grating at a single surface point.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffractionGrating {
    /// Normalized grating direction in the local tangent plane.
    grating_dir: Vector2<f32>,
    /// Reciprocal of the grating pitch along each grating axis, in um^-1.
    /// A vanishing y component makes the grating one-dimensional.
    inv_period: Vector2<f32>,
    /// Groove depth scale, in um.
    height: f32,
    /// Number of lobes considered per axis; odd, so orders are symmetric
    /// around zero.
    lobe_count: u32,
    gtype: DiffractionGratingType,
    /// Energy scale applied to every lobe intensity.
    multiplier: f32,
}

impl DiffractionGrating {
    /// Builds a grating whose direction follows a fixed angle in the tangent
    /// plane.
    pub fn new(
        grating_angle: f32,
        inv_period: Vector2<f32>,
        height: f32,
        lobe_count: u32,
        gtype: DiffractionGratingType,
        multiplier: f32,
    ) -> Result<Self> {
        Self::validate(lobe_count)?;
        let (s, c) = grating_angle.sin_cos();
        Ok(Self {
            grating_dir: Vector2::new(c, s),
            inv_period,
            height,
            lobe_count,
            gtype,
            multiplier,
        })
    }

    /// Builds a radial grating: the direction follows the UV coordinate
    /// relative to the parametric center (0.5, 0.5), rotated by
    /// `grating_angle`. Degenerate UVs at the exact center fall back to the
    /// rotation angle alone.
    pub fn new_radial(
        grating_angle: f32,
        inv_period: Vector2<f32>,
        height: f32,
        lobe_count: u32,
        gtype: DiffractionGratingType,
        multiplier: f32,
        uv: Vector2<f32>,
    ) -> Result<Self> {
        Self::validate(lobe_count)?;
        let radial = uv - Vector2::new(0.5, 0.5);
        let radial = if radial.norm() < config::DIRECTION_EPSILON {
            Vector2::x()
        } else {
            radial.normalize()
        };
        let (s, c) = grating_angle.sin_cos();
        // Counter-clockwise rotation of the (mirrored) radial vector.
        let rot = Matrix2::new(c, -s, s, c);
        Ok(Self {
            grating_dir: rot * Vector2::new(radial.x, -radial.y),
            inv_period,
            height,
            lobe_count,
            gtype,
            multiplier,
        })
    }

    fn validate(lobe_count: u32) -> Result<()> {
        if lobe_count % 2 == 0 {
            bail!("lobe count must be odd so orders are symmetric around zero, got {lobe_count}");
        }
        if lobe_count as usize > config::MAX_LOBES {
            bail!(
                "lobe count {lobe_count} exceeds the supported maximum of {}",
                config::MAX_LOBES
            );
        }
        Ok(())
    }

    /// Whether the grating only has grooves along one axis.
    pub fn is_1d(&self) -> bool {
        self.inv_period.y < config::DIRECTION_EPSILON
    }

    pub fn lobe_count(&self) -> u32 {
        self.lobe_count
    }

    /// Far-field roughness proxy: how diffuse the surface looks at
    /// wavenumber `k`, approaching 1 at grazing incidence and for shallow
    /// grooves.
    pub fn alpha(&self, wi: &Vector3<f32>, k: f32) -> f32 {
        let a = Frame::cos_theta(wi) * self.height * k;
        (-(a * a)).exp()
    }

    /// Shading frame with the tangent aligned to the grating direction.
    pub fn shading_frame(&self, n: &Vector3<f32>) -> Frame {
        let t = Vector3::new(self.grating_dir.x, self.grating_dir.y, 0.0);
        // grating_dir lives in the tangent plane of n's local space; project
        // and renormalize for safety against non-axis-aligned normals.
        let t = (t - t.dot(n) * n).normalize();
        Frame::with_tangent(*n, t)
    }

    /// Phase-modulation argument shared by the groove profiles.
    fn modulation(&self, wi: &Vector3<f32>, wl: f32) -> f32 {
        4.0 * PI * self.height / (wl * Frame::cos_theta(wi).abs().max(config::DIRECTION_EPSILON))
    }

    /// Intensity of a single axis order. Order zero is pinned to 1.
    fn axis_intensity(&self, order: i32, a: f32) -> f32 {
        if order == 0 {
            return 1.0;
        }
        match self.gtype {
            DiffractionGratingType::Sinusoidal => {
                let j = math::bessel_j(order, a);
                j * j
            }
            DiffractionGratingType::Rectangular => {
                (a / 2.0).sin() * math::sinc(PI * order as f32 / 2.0)
            }
            DiffractionGratingType::Linear => 1.0 / (order.abs() as f32).sqrt(),
        }
    }

    /// Unnormalized intensity of the lobe pair `lobe` for incidence `wi`
    /// (local frame) and wavelength `wl` (um). One-dimensional gratings only
    /// diffract along their single axis, so the x-axis factor stands alone:
    /// a sinusoidal 1-D grating's first order is `J_1(a)^2`. Some
    /// formulations instead mirror the x factor onto the unused axis, which
    /// squares the falloff (`J_1(a)^4` for the same order); compare profiles
    /// accordingly when validating against other implementations.
    pub fn lobe_intensity(&self, lobe: &Vector2<i32>, wi: &Vector3<f32>, wl: f32) -> f32 {
        let a = self.modulation(wi, wl);
        let ix = self.axis_intensity(lobe.x, a);
        if self.is_1d() {
            self.multiplier * ix
        } else {
            self.multiplier * ix * self.axis_intensity(lobe.y, a)
        }
    }

    /// Per-axis order intensities for orders `0..=lobe_count/2`, with the
    /// zero order half-weighted because it has no sign mirror. Both
    /// [`sample_lobe`](Self::sample_lobe) and [`lobe_pdf`](Self::lobe_pdf)
    /// draw from this one accumulation so their densities agree exactly.
    fn axis_intensities(&self, wi: &Vector3<f32>, wl: f32) -> ([f32; config::MAX_LOBES], f32) {
        let a = self.modulation(wi, wl);
        let half = (self.lobe_count / 2) as usize;
        let mut intensities = [0.0f32; config::MAX_LOBES];
        let mut total = 0.0;
        for (l, slot) in intensities.iter_mut().enumerate().take(half + 1) {
            let mut li = self.axis_intensity(l as i32, a).abs();
            if l == 0 {
                li *= 0.5;
            }
            *slot = li;
            total += li;
        }
        (intensities, total)
    }

    /// Per-axis probability of the signed order `order`, given the shared
    /// accumulation. Non-zero orders split their weight across both signs.
    fn axis_pdf(order: i32, intensities: &[f32; config::MAX_LOBES], total: f32) -> f32 {
        let idx = order.unsigned_abs() as usize;
        let p = intensities[idx] / total;
        math::select(order == 0, p, p / 2.0)
    }

    /// Importance-samples a lobe pair proportional to lobe intensity,
    /// independently per axis. `sample2` is a uniform sample on [0,1)^2; its
    /// halves double as the sign draws. Returns the signed lobe indices and
    /// the per-axis probabilities (their product is the joint density).
    pub fn sample_lobe(
        &self,
        sample2: &Vector2<f32>,
        wi: &Vector3<f32>,
        wl: f32,
    ) -> (Vector2<i32>, Vector2<f32>) {
        let (intensities, total) = self.axis_intensities(wi, wl);
        if total <= 0.0 {
            return (Vector2::zeros(), Vector2::new(1.0, 1.0));
        }

        let half = (self.lobe_count / 2) as i32;
        let rn = (sample2 - Vector2::new(0.5, 0.5)) * 2.0;
        let sign = Vector2::new(rn.x.signum(), rn.y.signum());

        let mut cdf = 0.0;
        let mut lobe = Vector2::new(0i32, 0i32);
        let mut pdf = Vector2::zeros();
        for l in 0..=half {
            let p = intensities[l as usize] / total;
            if rn.x.abs() > cdf {
                lobe.x = l;
            }
            if rn.y.abs() > cdf {
                lobe.y = l;
            }
            cdf += p;
        }

        lobe.x *= sign.x as i32;
        lobe.y *= sign.y as i32;
        pdf.x = Self::axis_pdf(lobe.x, &intensities, total);
        pdf.y = Self::axis_pdf(lobe.y, &intensities, total);

        (lobe, pdf)
    }

    /// Joint probability of an already-chosen lobe pair under the same
    /// density [`sample_lobe`](Self::sample_lobe) draws from. Used for
    /// density evaluation independent of sampling (MIS-style reuse).
    pub fn lobe_pdf(&self, lobe: &Vector2<i32>, wi: &Vector3<f32>, wl: f32) -> f32 {
        let half = (self.lobe_count / 2) as i32;
        if lobe.x.abs() > half || lobe.y.abs() > half {
            return 0.0;
        }
        let (intensities, total) = self.axis_intensities(wi, wl);
        if total <= 0.0 {
            return 0.0;
        }
        Self::axis_pdf(lobe.x, &intensities, total) * Self::axis_pdf(lobe.y, &intensities, total)
    }

    /// Solves the generalized grating equation for the outgoing direction of
    /// `lobe`, in the local frame. The returned flag is false for evanescent
    /// orders, whose required transverse sine exceeds unity; callers must
    /// mask those lanes out.
    pub fn diffract(
        &self,
        wi: &Vector3<f32>,
        lobe: &Vector2<i32>,
        wl: f32,
    ) -> (Vector3<f32>, bool) {
        let px = (wi.x * wi.x + wi.z * wi.z).sqrt();
        let py = (wi.y * wi.y + wi.z * wi.z).sqrt();
        let sin_i = Vector2::new(
            math::select(px > config::DIRECTION_EPSILON, wi.x / px, 0.0),
            math::select(py > config::DIRECTION_EPSILON, wi.y / py, 0.0),
        );

        // Rotate the lobe indices into the reciprocal lattice basis
        // (counter-clockwise by the grating angle).
        let (c, s) = (self.grating_dir.x, self.grating_dir.y);
        let lobe_rotated = Vector2::new(
            c * lobe.x as f32 - s * lobe.y as f32,
            s * lobe.x as f32 + c * lobe.y as f32,
        );

        let sin_o = wl * lobe_rotated.component_mul(&self.inv_period) - sin_i;
        let (a, b) = (sin_o.x, sin_o.y);
        let denom = a * a * b * b - 1.0;
        let m = math::select(denom.abs() > f32::EPSILON, (a * a - 1.0) / denom, 1.0);
        let q = 1.0 - b * b * m;

        let wo = Vector3::new(
            a * math::safe_sqrt(q),
            b * math::safe_sqrt(m),
            math::safe_sqrt(1.0 - a * a * q - b * b * m),
        );
        (wo, a.abs() <= 1.0 && b.abs() <= 1.0)
    }

    /// Sample-side bundle: samples a lobe for the incidence `wi` (world
    /// space) around the microfacet or surface normal `n`, diffracts it, and
    /// returns `(wo_world, joint_pdf, intensity, lobe, valid)`.
    pub fn sample_diffract(
        &self,
        sample2: &Vector2<f32>,
        wi: &Vector3<f32>,
        n: &Vector3<f32>,
        wl: f32,
    ) -> (Vector3<f32>, f32, f32, Vector2<i32>, bool) {
        let frame = Frame::new(*n);
        let wi_local = frame.to_local(wi);

        let (lobe, pdf) = self.sample_lobe(sample2, &wi_local, wl);
        let intensity = self.lobe_intensity(&lobe, &wi_local, wl);
        let (wo_local, valid) = self.diffract(&wi_local, &lobe, wl);

        let wo = frame.to_world(&wo_local);
        (wo, pdf.x * pdf.y, intensity, lobe, valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    fn sinusoidal_1d() -> DiffractionGrating {
        DiffractionGrating::new(
            0.0,
            Vector2::new(2.0, 0.0),
            0.3,
            5,
            DiffractionGratingType::Sinusoidal,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn even_lobe_count_rejected() {
        let r = DiffractionGrating::new(
            0.0,
            Vector2::new(2.0, 0.0),
            0.3,
            4,
            DiffractionGratingType::Sinusoidal,
            1.0,
        );
        assert!(r.is_err());
    }

    #[test]
    fn type_parsing() {
        assert_eq!(
            DiffractionGratingType::parse("Rectangular").unwrap(),
            DiffractionGratingType::Rectangular
        );
        assert!(DiffractionGratingType::parse("sawtooth").is_err());
    }

    #[test]
    fn sinusoidal_concrete_intensities() {
        let grating = sinusoidal_1d();
        let wi = Vector3::z();
        let wl = 0.5;

        // Order zero is pinned to exactly 1.
        assert_eq!(grating.lobe_intensity(&Vector2::new(0, 0), &wi, wl), 1.0);

        // Order one is the squared Bessel J1 at a = 4 pi h / (wl cos).
        let a = 4.0 * PI * 0.3 / 0.5;
        let expected = math::bessel_j(1, a) * math::bessel_j(1, a);
        let got = grating.lobe_intensity(&Vector2::new(1, 0), &wi, wl);
        assert!((got - expected).abs() < 1e-6);
    }

    #[test]
    fn zero_order_dominates() {
        for gtype in [
            DiffractionGratingType::Sinusoidal,
            DiffractionGratingType::Rectangular,
            DiffractionGratingType::Linear,
        ] {
            let grating = DiffractionGrating::new(
                0.0,
                Vector2::new(2.0, 2.0),
                0.3,
                7,
                gtype,
                1.0,
            )
            .unwrap();
            let wi = Vector3::new(0.2, -0.1, 0.97).normalize();
            let zero = grating.lobe_intensity(&Vector2::new(0, 0), &wi, 0.5);
            for (lx, ly) in iproduct!(-3..=3, -3..=3) {
                let i = grating.lobe_intensity(&Vector2::new(lx, ly), &wi, 0.5);
                assert!(i <= zero + 1e-6, "lobe ({lx},{ly}) beats order zero: {i}");
            }
        }
    }

    #[test]
    fn diffract_reverse_consistency() {
        let grating = DiffractionGrating::new(
            0.4,
            Vector2::new(1.5, 1.0),
            0.3,
            7,
            DiffractionGratingType::Rectangular,
            1.0,
        )
        .unwrap();
        let wi = Vector3::new(0.3, 0.2, 0.93).normalize();
        let wl = 0.55;

        for (lx, ly) in iproduct!(-2..=2, -2..=2) {
            let lobe = Vector2::new(lx, ly);
            let (wo, valid) = grating.diffract(&wi, &lobe, wl);
            if !valid {
                continue;
            }
            // Recover the transverse sines from the outgoing direction and
            // reapply the grating equation in reverse.
            let px = (wo.x * wo.x + wo.z * wo.z).sqrt();
            let py = (wo.y * wo.y + wo.z * wo.z).sqrt();
            let sin_o = Vector2::new(wo.x / px, wo.y / py);

            let (c, s) = (0.4f32.cos(), 0.4f32.sin());
            let lobe_rotated = Vector2::new(
                c * lx as f32 - s * ly as f32,
                s * lx as f32 + c * ly as f32,
            );
            let sin_i_rec = wl * lobe_rotated.component_mul(&Vector2::new(1.5, 1.0)) - sin_o;

            let pix = (wi.x * wi.x + wi.z * wi.z).sqrt();
            let piy = (wi.y * wi.y + wi.z * wi.z).sqrt();
            assert!((sin_i_rec.x - wi.x / pix).abs() < 1e-4);
            assert!((sin_i_rec.y - wi.y / piy).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_lobe_at_normal_incidence_is_specular() {
        let grating = sinusoidal_1d();
        let (wo, valid) = grating.diffract(&Vector3::z(), &Vector2::new(0, 0), 0.5);
        assert!(valid);
        assert!((wo - Vector3::z()).norm() < 1e-5);
    }

    #[test]
    fn evanescent_order_flagged_invalid() {
        let grating = sinusoidal_1d();
        // wl * lobe * inv_period = 0.5 * 2 * 2 = 2 > 1: evanescent
        let (_, valid) = grating.diffract(&Vector3::z(), &Vector2::new(2, 0), 0.5);
        assert!(!valid);
    }

    #[test]
    fn alpha_grazing_vs_normal() {
        let grating = sinusoidal_1d();
        let k = math::wavenumber(0.5);
        let normal = grating.alpha(&Vector3::z(), k);
        let grazing = grating.alpha(&Vector3::new(0.999, 0.0, 0.04).normalize(), k);
        assert!(grazing > normal);
        assert!(grazing <= 1.0);
    }

    #[test]
    fn pdf_matches_sampled_pdf() {
        let grating = DiffractionGrating::new(
            0.0,
            Vector2::new(2.0, 2.0),
            0.3,
            7,
            DiffractionGratingType::Sinusoidal,
            1.0,
        )
        .unwrap();
        let wi = Vector3::new(0.1, 0.3, 0.95).normalize();
        let wl = 0.5;

        for sample in [
            Vector2::new(0.1, 0.9),
            Vector2::new(0.45, 0.55),
            Vector2::new(0.99, 0.01),
            Vector2::new(0.7, 0.2),
        ] {
            let (lobe, pdf) = grating.sample_lobe(&sample, &wi, wl);
            let joint = grating.lobe_pdf(&lobe, &wi, wl);
            assert!((pdf.x * pdf.y - joint).abs() < 1e-6);
        }
    }

    #[test]
    fn pdf_normalizes_to_one() {
        let grating = DiffractionGrating::new(
            0.0,
            Vector2::new(2.0, 2.0),
            0.3,
            7,
            DiffractionGratingType::Linear,
            1.0,
        )
        .unwrap();
        let wi = Vector3::z();
        let mut total = 0.0;
        for (lx, ly) in iproduct!(-3..=3, -3..=3) {
            total += grating.lobe_pdf(&Vector2::new(lx, ly), &wi, 0.5);
        }
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn radial_direction_follows_uv() {
        let grating = DiffractionGrating::new_radial(
            0.0,
            Vector2::new(2.0, 0.0),
            0.3,
            5,
            DiffractionGratingType::Linear,
            1.0,
            Vector2::new(1.0, 0.5),
        )
        .unwrap();
        // UV offset (0.5, 0.0) from center points along +x.
        assert!((grating.grating_dir - Vector2::x()).norm() < 1e-5);
    }
}
