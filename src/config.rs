use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cine::DEFAULT_FRAME_RATE;
use crate::contrast_brightness::SENSITIVITY;
use crate::enums::Interpolation;
use crate::error::ConfigError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Pointer sensitivities divide drag distances and must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewport = &self.viewport;
        for (key, value) in [
            ("contrast_sensitivity", viewport.contrast_sensitivity),
            ("brightness_sensitivity", viewport.brightness_sensitivity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "viewport.{key} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Horizontal pointer travel (px) per unit of contrast.
    pub contrast_sensitivity: f64,
    /// Vertical pointer travel (px) per unit of brightness.
    pub brightness_sensitivity: f64,
    /// Brightness change of one `brightness_up`/`brightness_down` command.
    pub brightness_step: f64,
    pub interpolation: Interpolation,
    /// RGB fill outside the frame.
    pub background: [u8; 3],
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            contrast_sensitivity: SENSITIVITY,
            brightness_sensitivity: SENSITIVITY,
            brightness_step: 10.0,
            interpolation: Interpolation::default(),
            background: [0, 0, 0],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub marker_radius: f64,
    /// Markers keep their screen size instead of scaling with the zoom.
    pub fixed_size_markers: bool,
    /// Decimal places of measurement labels.
    pub distance_precision: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            marker_radius: 5.0,
            fixed_size_markers: true,
            distance_precision: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub frame_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Request every frame when a series is selected.
    pub prefetch_on_select: bool,
}
