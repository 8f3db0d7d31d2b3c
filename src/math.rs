//! Small numerical helpers used throughout the transport core.
//!
//! Conditional logic in the hot paths is expressed with [`select`] rather
//! than control flow, so that a masked-out lane still produces a defined,
//! neutral value instead of being skipped.

use std::f32::consts::PI;

use nalgebra::Vector3;

/// Number of Simpson panels used for the Bessel quadrature. Even.
const BESSEL_PANELS: usize = 64;

/// Lane-wise blend: returns `a` where `mask` holds, `b` otherwise.
#[inline]
pub fn select<T>(mask: bool, a: T, b: T) -> T {
    if mask {
        a
    } else {
        b
    }
}

/// Replaces non-finite values by a sentinel so masked arithmetic cannot
/// contaminate active lanes.
#[inline]
pub fn guard_finite(x: f32, sentinel: f32) -> f32 {
    select(x.is_finite(), x, sentinel)
}

/// `sqrt` clamped at zero; negative arguments come from roundoff in the
/// grating equation and are treated as grazing.
#[inline]
pub fn safe_sqrt(x: f32) -> f32 {
    x.max(0.0).sqrt()
}

/// Normalised sinc, `sin(x)/x`, with the removable singularity filled in.
pub fn sinc(x: f32) -> f32 {
    if x.abs() < 1e-4 {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// Bessel function of the first kind of integer order `n`.
///
/// Uses the integral representation `J_n(x) = (1/pi) * int_0^pi cos(n*t - x*sin(t)) dt`
/// with composite Simpson quadrature, which stays stable for the moderate
/// arguments produced by grating height/wavelength ratios.
pub fn bessel_j(n: i32, x: f32) -> f32 {
    let n = n as f64;
    let x = x as f64;
    let h = std::f64::consts::PI / BESSEL_PANELS as f64;
    let f = |t: f64| (n * t - x * t.sin()).cos();

    let mut sum = f(0.0) + f(std::f64::consts::PI);
    for i in 1..BESSEL_PANELS {
        let w = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += w * f(i as f64 * h);
    }
    (sum * h / 3.0 / std::f64::consts::PI) as f32
}

/// Unsigned angle between two unit vectors, stable near 0 and pi.
pub fn unit_angle(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Mirror reflection of `v` about the unit normal `n`.
#[inline]
pub fn reflect(v: &Vector3<f32>, n: &Vector3<f32>) -> Vector3<f32> {
    2.0 * v.dot(n) * n - v
}

/// An arbitrary unit tangent orthogonal to the unit vector `dir`.
///
/// Branches on the dominant component to avoid the degenerate cross product.
pub fn orthonormal_tangent(dir: &Vector3<f32>) -> Vector3<f32> {
    if dir.x.abs() > dir.y.abs() {
        Vector3::new(-dir.z, 0.0, dir.x) / (dir.x * dir.x + dir.z * dir.z).sqrt()
    } else {
        Vector3::new(0.0, dir.z, -dir.y) / (dir.y * dir.y + dir.z * dir.z).sqrt()
    }
}

/// Angular wavenumber `k = 2 pi / lambda` for a wavelength in micrometers.
#[inline]
pub fn wavenumber(wavelength_um: f32) -> f32 {
    2.0 * PI / wavelength_um
}
