//! JSON application config. Every field has a default so a partial file
//! (or no file at all) still yields a runnable setup.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::foundation::core::Canvas;
use crate::foundation::error::BoothResult;
use crate::render::effects::Effect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub stage: StageConfig,
    pub gesture: GestureConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: crate::source::camera::DEFAULT_WIDTH,
            height: crate::source::camera::DEFAULT_HEIGHT,
            fps: crate::source::camera::DEFAULT_FPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Effect identifier as accepted by [`Effect::parse`].
    pub effect: String,
    pub mirror: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            effect: Effect::None.as_str().to_string(),
            mirror: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Eye opening below this many pixels counts as a blink.
    pub eye_closed_px: f64,
    /// Wrist must sit this many pixels below the hand centroid.
    pub raise_offset_px: f64,
    pub blink_debounce_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            eye_closed_px: crate::detect::gesture::DEFAULT_EYE_CLOSED_PX,
            raise_offset_px: crate::detect::gesture::DEFAULT_RAISE_OFFSET_PX,
            blink_debounce_ms: crate::detect::gesture::BLINK_DEBOUNCE.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for photos and recordings.
    pub dir: PathBuf,
    /// OS audio capture device for recordings; video-only when absent.
    pub audio_device: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            audio_device: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> BoothResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        cfg.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> BoothResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "config not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> BoothResult<()> {
        let text = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write config '{}'", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> BoothResult<()> {
        Canvas::new(self.camera.width, self.camera.height)?;
        Effect::parse(&self.stage.effect)?;
        Ok(())
    }

    pub fn canvas(&self) -> BoothResult<Canvas> {
        Canvas::new(self.camera.width, self.camera.height)
    }

    pub fn effect(&self) -> BoothResult<Effect> {
        Effect::parse(&self.stage.effect)
    }
}
