//! Scene manifest
//!
//! A JSON manifest describes what to load and how to render it. Every field
//! has a sensible default so a partial manifest (or none at all) still
//! renders the built-in test scene.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::octree::LoadConfig;

/// Which renderer drives the frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Six-face cubemap projection
    Cubemap,
    /// Direct-to-screen integer frustum
    #[default]
    Screen,
}

/// Scene manifest
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// ASCII voxel dump; absent means the built-in test scene
    pub voxels: Option<PathBuf>,
    /// Compiled octree cache; loaded when present, written after ingest
    pub snapshot: Option<PathBuf>,
    /// Ingest parameters
    pub load: LoadConfig,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Renderer selection
    pub renderer: RendererKind,
    /// Camera position in voxel units
    pub camera_position: [f64; 3],
    /// Camera yaw in degrees
    pub camera_yaw: f64,
    /// Camera pitch in degrees
    pub camera_pitch: f64,
    /// Six background images (+Y, +Z, +X, -Z, -X, -Y), cubemap renderer only
    pub background: Option<[PathBuf; 6]>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            voxels: None,
            snapshot: None,
            load: LoadConfig { depth: 8, ..LoadConfig::default() },
            width: 1024,
            height: 768,
            renderer: RendererKind::default(),
            camera_position: [128.0, 128.0, -300.0],
            camera_yaw: 0.0,
            camera_pitch: 0.0,
            background: None,
        }
    }
}

impl SceneConfig {
    /// Read a manifest from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Boot-time sanity checks
    pub fn validate(&self) -> Result<()> {
        self.load.validate()?;
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config("screen dimensions must be nonzero".into()));
        }
        if self.background.is_some() && self.renderer != RendererKind::Cubemap {
            return Err(Error::Config(
                "background images need the cubemap renderer".into(),
            ));
        }
        Ok(())
    }
}
