//! Per-path interaction records for backward and bidirectional evaluation.
//!
//! The integrator pushes one [`BounceData`] per path vertex as it walks the
//! scene; backward passes pop them off in reverse. The buffer is a plain
//! stack and is owned by a single path, so there is no synchronization.

use std::fmt;

use nalgebra::{Point3, Vector2, Vector3};

use crate::sample::ScatterFlags;
use crate::spectrum::{Radiance, Wavelengths};

/// Minimal record of the surface interaction at a path vertex. The full
/// scene-graph interaction stays with the caller; replaying a path only
/// needs the local geometry and the wavelengths that were active there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionRecord {
    /// Hit point, world space.
    pub p: Point3<f32>,
    /// Shading normal at the hit.
    pub n: Vector3<f32>,
    /// Parametric surface coordinate.
    pub uv: Vector2<f32>,
    /// Hero wavelengths active at the vertex, nm.
    pub wavelengths: Wavelengths,
}

/// One bounce of a path traversing the scene: everything needed to replay
/// the vertex in either transport direction.
#[derive(Debug, Clone, PartialEq)]
pub struct BounceData {
    /// Index of the vertex along the path, mainly for debugging.
    pub id: u32,
    /// Local surface state at the vertex.
    pub interaction: InteractionRecord,
    /// Incident and outgoing direction, from the camera's perspective.
    pub wi: Vector3<f32>,
    pub wo: Vector3<f32>,
    /// Classification of the interaction at this vertex.
    pub flags: ScatterFlags,
    /// Survival factor from Russian-roulette termination.
    pub rr_throughput: f32,
    /// Path throughput accumulated from the camera up to this vertex.
    pub throughput: Radiance,
    /// Weight of the sample used to pick the next direction.
    pub bsdf_weight: Radiance,
    /// Whether this vertex lies on an emitter.
    pub is_emitter: bool,
    /// Density of the last non-delta interaction; zero for delta vertices,
    /// check `flags` first.
    pub last_nd_pdf: f32,
    /// Whether the vertex belongs to an active lane.
    pub active: bool,
}

impl fmt::Display for BounceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BounceData[")?;
        writeln!(f, "  id = {},", self.id)?;
        writeln!(f, "  p = {:?},", self.interaction.p)?;
        writeln!(f, "  n = {:?},", self.interaction.n)?;
        writeln!(f, "  wi = {:?},", self.wi)?;
        writeln!(f, "  wo = {:?},", self.wo)?;
        writeln!(f, "  flags = {:?},", self.flags)?;
        writeln!(f, "  rr_throughput = {},", self.rr_throughput)?;
        writeln!(f, "  is_emitter = {},", self.is_emitter)?;
        writeln!(f, "  last_nd_pdf = {},", self.last_nd_pdf)?;
        writeln!(f, "  active = {},", self.active)?;
        write!(f, "]")
    }
}

/// Stack of bounces recorded along one traced path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BounceBuffer {
    records: Vec<BounceData>,
}

impl BounceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bounce: BounceData) {
        self.records.push(bounce);
    }

    pub fn pop(&mut self) -> Option<BounceData> {
        self.records.pop()
    }

    pub fn last(&self) -> Option<&BounceData> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &BounceData> {
        self.records.iter()
    }
}
