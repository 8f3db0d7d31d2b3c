//! Orthonormal shading frame for moving between world and surface-local
//! coordinates. Local space puts the normal along +z, so `cos_theta` of a
//! local direction is just its z component.

use nalgebra::Vector3;

use crate::math;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub t: Vector3<f32>,
    pub b: Vector3<f32>,
    pub n: Vector3<f32>,
}

impl Frame {
    /// Builds a frame around the unit normal `n` with an arbitrary tangent.
    pub fn new(n: Vector3<f32>) -> Self {
        let t = math::orthonormal_tangent(&n);
        let b = n.cross(&t);
        Self { t, b, n }
    }

    /// Builds a frame with a caller-chosen tangent, e.g. aligned with a
    /// grating direction. `t` must be unit length and orthogonal to `n`.
    pub fn with_tangent(n: Vector3<f32>, t: Vector3<f32>) -> Self {
        let b = n.cross(&t);
        Self { t, b, n }
    }

    pub fn to_local(&self, v: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(v.dot(&self.t), v.dot(&self.b), v.dot(&self.n))
    }

    pub fn to_world(&self, v: &Vector3<f32>) -> Vector3<f32> {
        v.x * self.t + v.y * self.b + v.z * self.n
    }

    /// Cosine of the polar angle of a direction already in local space.
    #[inline]
    pub fn cos_theta(v: &Vector3<f32>) -> f32 {
        v.z
    }
}
