//! Fresnel amplitude coefficients for conductor interfaces.
//!
//! Reflection from an absorbing medium is described by a complex relative
//! refractive index `eta = n + i kappa`. The returned coefficients are the
//! complex amplitude reflectances for the s (perpendicular) and p (parallel)
//! polarizations; their squared magnitudes are the reflected intensities.

use num_complex::Complex;

/// Complex amplitude reflection coefficients `(r_s, r_p)` at a conductor
/// boundary, for incidence cosine `cos_theta_i` from vacuum.
pub fn conductor(cos_theta_i: f32, eta: Complex<f32>) -> (Complex<f32>, Complex<f32>) {
    let cti = Complex::new(cos_theta_i.clamp(0.0, 1.0), 0.0);
    let sti2 = Complex::new(1.0 - cos_theta_i * cos_theta_i, 0.0);

    // cos(theta_t) continued into the complex plane
    let ctt = (Complex::new(1.0, 0.0) - sti2 / (eta * eta)).sqrt();

    let r_s = (cti - eta * ctt) / (cti + eta * ctt);
    let r_p = (eta * cti - ctt) / (eta * cti + ctt);

    (r_s, r_p)
}
