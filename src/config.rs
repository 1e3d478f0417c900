//! Engine settings.
//!
//! Loaded from `settings.json` in the working directory. Every field has a default, so the
//! file may be missing entirely or list only the values it overrides.

use std::{fs, path::Path};

use anyhow::{bail, Context};
use log::info;
use serde::{Deserialize, Serialize};

use crate::engine_state::voxels::{block::block_type::BlockType, chunk::generation::GeneratorKind};

/// Default location of the settings file.
pub const SETTINGS_FILE: &str = "settings.json";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Clock and physics settings
    pub simulation: SimulationConfig,
    /// Voxel world settings
    pub world: WorldConfig,
    /// Projection and orbit settings
    pub camera: CameraConfig,
    /// Local player body
    pub player: PlayerConfig,
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
}

/// Fixed-step clock and physics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed physics steps per simulated second
    pub fixed_steps_per_second: u32,
    /// Cap on fixed steps drained in one frame
    pub max_steps_per_frame: u32,
    /// Gravity in physics space (Y-up)
    pub gravity: [f32; 3],
}

/// Voxel world settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the chunk in cells
    pub chunk_edge: usize,
    /// Generator name, one of `reference`, `perlin`, `checkerboard`, `solid`, `empty`
    pub generator: String,
    /// Seed for generators with a random component
    pub seed: u32,
    /// Block name used by the `checkerboard` and `solid` generators, or `random`
    pub fill_block: String,
}

/// Projection and orbit camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub field_of_view_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Distance between the eye and the followed target
    pub orbit_distance: f32,
    /// Radians of rotation per pixel of mouse motion
    pub mouse_sensitivity: f32,
}

/// Local player body settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Spawn position in world space (Z-up)
    pub spawn: [f32; 3],
    /// Capsule radius
    pub radius: f32,
    /// Length of the capsule's cylindrical part
    pub height: f32,
    /// Body mass
    pub mass: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("cubewar"),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_steps_per_second: 60,
            max_steps_per_frame: 10,
            gravity: [0.0, -10.0, 0.0],
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_edge: 100,
            generator: String::from("reference"),
            seed: 0,
            fill_block: String::from("stone"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view_degrees: 85.0,
            near: 0.2,
            far: 200.01,
            orbit_distance: 12.0,
            mouse_sensitivity: 0.005,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: [45.0, 45.0, 60.0],
            radius: 0.4,
            height: 2.0,
            mass: 1.0,
        }
    }
}

impl EngineConfig {
    /// Loads `settings.json` from the working directory, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    /// Loads settings from `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("invalid settings in {}", path.display()))?;

        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Parses and validates settings.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.simulation.fixed_steps_per_second == 0 {
            bail!("simulation.fixed_steps_per_second must be positive");
        }
        if self.simulation.max_steps_per_frame == 0 {
            bail!("simulation.max_steps_per_frame must be positive");
        }
        if self.world.chunk_edge == 0 {
            bail!("world.chunk_edge must be positive");
        }
        self.generator_kind()?;
        self.fill_block()?;
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            bail!("camera clip planes must satisfy 0 < near < far");
        }
        if self.player.mass <= 0.0 {
            bail!("player.mass must be positive");
        }
        Ok(())
    }

    /// The configured world generator.
    pub fn generator_kind(&self) -> anyhow::Result<GeneratorKind> {
        GeneratorKind::from_name(&self.world.generator)
            .with_context(|| format!("unknown world generator '{}'", self.world.generator))
    }

    /// Block the uniform generators fill with. `random` picks a solid type on every call.
    pub fn fill_block(&self) -> anyhow::Result<BlockType> {
        if self.world.fill_block == "random" {
            return Ok(BlockType::get_random_type());
        }
        BlockType::from_name(&self.world.fill_block)
            .with_context(|| format!("unknown fill block '{}'", self.world.fill_block))
    }
}
