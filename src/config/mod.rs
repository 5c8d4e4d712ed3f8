//! Configuration management for winsync
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. The tuned constants of the synchronizer (activation
//! window, surface tiling, frame limits and decoration metrics) all live
//! here so they can be overridden without a rebuild.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration struct containing all synchronizer settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SyncConfig {
    /// Focus/activation bridge settings
    #[serde(default)]
    pub activation: ActivationConfig,

    /// Back-buffer surface settings
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// Limits applied to frames before they reach the host
    #[serde(default)]
    pub frame: FrameConfig,

    /// Host-drawn decoration policy and metrics
    #[serde(default)]
    pub decorations: DecorationConfig,

    /// Default limits for interactive resizing
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivationConfig {
    /// How long an activation hint stays valid (milliseconds)
    #[serde(default = "ActivationConfig::default_recent_activation_ms")]
    pub recent_activation_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceConfig {
    /// Tile size surfaces are rounded out to; must be a power of two
    #[serde(default = "SurfaceConfig::default_granularity")]
    pub granularity: i32,

    /// Largest single back-buffer allocation (bytes)
    #[serde(default = "SurfaceConfig::default_max_bytes")]
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameConfig {
    /// Frame origins are clamped to +/- this value
    #[serde(default = "FrameConfig::default_coordinate_limit")]
    pub coordinate_limit: i32,

    /// Upper bound for frame width/height, further capped at twice the
    /// desktop extent
    #[serde(default = "FrameConfig::default_max_extent")]
    pub max_extent: i32,
}

/// Decoration metrics used to derive the host frame from a window rect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecorationConfig {
    /// When false the host never draws title bars or borders
    pub enabled: bool,

    /// Title bar height
    pub caption_height: i32,

    /// Title bar height of tool windows
    pub small_caption_height: i32,

    /// Resizable border thickness
    pub sizing_frame: i32,

    /// Dialog frame thickness
    pub dialog_frame: i32,

    /// Thin border thickness
    pub border: i32,
}

/// Smallest size a framed window can be resized to, before the window
/// adjusts it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    pub min_width: i32,
    pub min_height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            recent_activation_ms: Self::default_recent_activation_ms(),
        }
    }
}

impl ActivationConfig {
    fn default_recent_activation_ms() -> u64 {
        2000
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            granularity: Self::default_granularity(),
            max_bytes: Self::default_max_bytes(),
        }
    }
}

impl SurfaceConfig {
    fn default_granularity() -> i32 {
        128
    }

    fn default_max_bytes() -> u64 {
        512 * 1024 * 1024
    }

    /// Budget as a native size, saturating on narrow targets
    pub fn max_bytes(&self) -> usize {
        usize::try_from(self.max_bytes).unwrap_or(usize::MAX)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            coordinate_limit: Self::default_coordinate_limit(),
            max_extent: Self::default_max_extent(),
        }
    }
}

impl FrameConfig {
    fn default_coordinate_limit() -> i32 {
        16000
    }

    fn default_max_extent() -> i32 {
        32000
    }
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            caption_height: 25,
            small_caption_height: 17,
            sizing_frame: 5,
            dialog_frame: 3,
            border: 1,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_width: 112,
            min_height: 27,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: SyncConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let granularity = self.surface.granularity;
        if granularity < 1 || granularity & (granularity - 1) != 0 {
            anyhow::bail!(
                "Invalid surface granularity {}: must be a power of two",
                granularity
            );
        }

        if self.surface.max_bytes == 0 {
            anyhow::bail!("Invalid surface max_bytes: must be positive");
        }

        if self.frame.coordinate_limit <= 0 {
            anyhow::bail!("Invalid frame coordinate_limit: must be positive");
        }

        if self.frame.max_extent <= 0 {
            anyhow::bail!("Invalid frame max_extent: must be positive");
        }

        let d = &self.decorations;
        let metrics = [
            ("caption_height", d.caption_height),
            ("small_caption_height", d.small_caption_height),
            ("sizing_frame", d.sizing_frame),
            ("dialog_frame", d.dialog_frame),
            ("border", d.border),
        ];
        if let Some((name, value)) = metrics.iter().find(|(_, value)| *value < 0) {
            anyhow::bail!("Invalid decoration {}: {} is negative", name, value);
        }

        if self.tracking.min_width < 0 || self.tracking.min_height < 0 {
            anyhow::bail!(
                "Invalid tracking minimum {}x{}: must not be negative",
                self.tracking.min_width,
                self.tracking.min_height
            );
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
