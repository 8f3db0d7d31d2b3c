//! Mueller matrices acting on Stokes vectors.

use nalgebra::Matrix4;
use num_complex::Complex;

use crate::fresnel;

/// Rotation of the Stokes reference basis by `theta` about the propagation
/// direction. Linear polarization components rotate at twice the frame
/// angle; intensity and circular polarization are unaffected.
pub fn rotator(theta: f32) -> Matrix4<f32> {
    let (s, c) = (2.0 * theta).sin_cos();
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, c, s, 0.0, //
        0.0, -s, c, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Mueller matrix for specular reflection off a conductor with complex
/// relative index `eta`, in the reflection plane's s/p basis.
pub fn specular_reflection(cos_theta_i: f32, eta: Complex<f32>) -> Matrix4<f32> {
    let (r_s, r_p) = fresnel::conductor(cos_theta_i, eta);

    let ss = r_s.norm_sqr();
    let pp = r_p.norm_sqr();
    let cross = r_s * r_p.conj();

    let a = 0.5 * (ss + pp);
    let b = 0.5 * (ss - pp);
    let c = cross.re;
    let d = cross.im;

    Matrix4::new(
        a, b, 0.0, 0.0, //
        b, a, 0.0, 0.0, //
        0.0, 0.0, c, d, //
        0.0, 0.0, -d, c,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;
    use std::f32::consts::PI;

    #[test]
    fn rotator_composes_to_identity() {
        let m = rotator(0.3) * rotator(-0.3);
        assert!((m - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn quarter_turn_flips_linear_components() {
        let m = rotator(PI / 2.0);
        let s = m * Vector4::new(1.0, 0.5, 0.2, 0.0);
        assert!((s[1] + 0.5).abs() < 1e-6);
        assert!((s[2] + 0.2).abs() < 1e-6);
        assert!((s[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reflection_preserves_degree_of_polarization_bounds() {
        let m = specular_reflection(0.7, Complex::new(0.2, 3.0));
        let s = m * Vector4::new(1.0, 0.0, 0.0, 0.0);
        // Reflected intensity bounded by unity, polarization bounded by intensity.
        assert!(s[0] <= 1.0 + 1e-5);
        assert!(s[1].abs() <= s[0] + 1e-6);
    }
}
