//! Runtime configuration.
//!
//! Settings are deserialized from `config/default.toml` (overridden by
//! `config/local.toml` when present) plus `PLT_`-prefixed environment
//! variables. The grating block is validated eagerly: an invalid type
//! string or an even lobe count is a configuration error, not something to
//! recover from at render time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use log::debug;
use nalgebra::Vector2;
use serde::Deserialize;

use crate::config as constants;
use crate::grating::{DiffractionGrating, DiffractionGratingType};
use crate::spectrum::RenderMode;

/// Grating description as it appears in configuration files.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GratingSettings {
    /// Orientation of the grating in the tangent plane, radians.
    #[serde(default)]
    pub angle: f32,
    /// Reciprocal pitch per axis, um^-1. Zero y makes the grating 1-D.
    pub inv_period: [f32; 2],
    /// Groove depth, um.
    pub height: f32,
    /// Per-axis lobe count; must be odd.
    pub lobes: u32,
    /// One of "sinusoidal", "rectangular", "linear".
    pub lobe_type: String,
    /// Whether the grating direction follows the UV radial vector.
    #[serde(default)]
    pub radial: bool,
    /// Energy scale applied to every lobe.
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
}

fn default_multiplier() -> f32 {
    1.0
}

impl GratingSettings {
    /// Instantiates the grating model at a surface point with parametric
    /// coordinate `uv` (only consulted by radial gratings).
    pub fn build(&self, uv: Vector2<f32>) -> Result<DiffractionGrating> {
        let gtype = DiffractionGratingType::parse(&self.lobe_type)?;
        let inv_period = Vector2::new(self.inv_period[0], self.inv_period[1]);
        if self.radial {
            DiffractionGrating::new_radial(
                self.angle,
                inv_period,
                self.height,
                self.lobes,
                gtype,
                self.multiplier,
                uv,
            )
        } else {
            DiffractionGrating::new(
                self.angle,
                inv_period,
                self.height,
                self.lobes,
                gtype,
                self.multiplier,
            )
        }
    }
}

/// Runtime configuration for the transport core.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub mode: RenderMode,
    /// Hero wavelengths in nm.
    pub wavelengths: Vec<f32>,
    /// Clamp applied to emitter solid angles when seeding beam coherence.
    #[serde(default = "default_max_solid_angle")]
    pub max_solid_angle: f32,
    pub grating: Option<GratingSettings>,
}

fn default_max_solid_angle() -> f32 {
    constants::DEFAULT_MAX_SOLID_ANGLE
}

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Loads the default configuration, preferring `config/local.toml` when one
/// exists, with `PLT_*` environment overrides.
pub fn load_config() -> Result<Settings> {
    let root = project_root();
    let default_file = root.join("config/default.toml");
    let local_file = root.join("config/local.toml");

    let file = if local_file.exists() {
        debug!("using local configuration: {:?}", local_file);
        local_file
    } else {
        debug!("using default configuration: {:?}", default_file);
        default_file
    };

    let raw = Config::builder()
        .add_source(File::from(file).required(true))
        .add_source(Environment::with_prefix("plt"))
        .build()
        .context("failed to load configuration")?;

    let settings: Settings = raw
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<()> {
    if settings.wavelengths.is_empty() {
        anyhow::bail!("at least one wavelength is required");
    }
    if let Some(grating) = &settings.grating {
        // surfaces the type/lobe errors at load time
        grating.build(Vector2::new(0.5, 0.5))?;
    }
    Ok(())
}
