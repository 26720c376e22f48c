//! Pipeline configuration module.
//!
//! Handles loading and validating `pipe.toml`. Configuration is sparse —
//! every field has a default, user files override only what they name, and
//! unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [features]
//! auto_webp = false        # Encode WebP when no format action is given
//! read_all_frames = true   # Decode every frame of animated sources
//!
//! [output]
//! quality = 90             # JPEG quality when no quality action is given
//!
//! [styles]
//! # Named instruction aliases, usable as style/<name>
//! # thumb = "image/resize,w_400,h_500,m_fill/format,webp"
//! ```

use crate::context::Features;
use crate::style::{MemStyleStore, is_valid_style_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// CLI configuration loaded from `pipe.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    /// Default per-request feature flags.
    pub features: FeatureConfig,
    /// Output encoding defaults.
    pub output: OutputConfig,
    /// Named instruction aliases.
    pub styles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    pub auto_webp: bool,
    pub read_all_frames: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            auto_webp: false,
            read_all_frames: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

impl PipeConfig {
    /// Load from a file, falling back to defaults when it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.quality < 1 || self.output.quality > 100 {
            return Err(ConfigError::Validation(format!(
                "output.quality must be between 1 and 100, got {}",
                self.output.quality
            )));
        }
        for (name, style) in &self.styles {
            if !is_valid_style_name(name) {
                return Err(ConfigError::Validation(format!(
                    "invalid style name: {name:?}"
                )));
            }
            if style.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "style {name:?} has an empty instruction"
                )));
            }
        }
        Ok(())
    }

    /// Per-request feature flags seeded from config.
    pub fn request_features(&self) -> Features {
        Features {
            auto_webp: self.features.auto_webp,
            read_all_frames: self.features.read_all_frames,
        }
    }

    /// Build a style store from the `[styles]` table.
    pub fn style_store(&self) -> MemStyleStore {
        MemStyleStore::from_styles(self.styles.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// A documented stock config, printed by `imgpipe gen-config`.
    pub fn stock_toml() -> &'static str {
        r#"# imgpipe configuration
# All options are optional - defaults shown below.

[features]
# Encode WebP when the instruction names no explicit format.
auto_webp = false
# Decode every frame of animated sources. Switched off automatically when
# the target format cannot carry animation.
read_all_frames = true

[output]
# JPEG quality used when the instruction names no quality action (1-100).
quality = 90

[styles]
# Named instruction aliases, usable as style/<name>:
# thumb = "image/resize,w_400,h_500,m_fill/format,webp"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipeConfig::load_or_default(&dir.path().join("pipe.toml")).unwrap();
        assert!(!config.features.auto_webp);
        assert!(config.features.read_all_frames);
        assert_eq!(config.output.quality, 90);
        assert!(config.styles.is_empty());
    }

    #[test]
    fn sparse_overrides_merge_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.toml");
        std::fs::write(&path, "[features]\nauto_webp = true\n").unwrap();

        let config = PipeConfig::load_or_default(&path).unwrap();
        assert!(config.features.auto_webp);
        assert!(config.features.read_all_frames);
        assert_eq!(config.output.quality, 90);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.toml");
        std::fs::write(&path, "[output]\nqualty = 80\n").unwrap();
        assert!(matches!(
            PipeConfig::load_or_default(&path),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn quality_out_of_range_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.toml");
        std::fs::write(&path, "[output]\nquality = 0\n").unwrap();
        assert!(matches!(
            PipeConfig::load_or_default(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn styles_table_becomes_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.toml");
        std::fs::write(&path, "[styles]\nthumb = \"image/resize,w_400\"\n").unwrap();

        let config = PipeConfig::load_or_default(&path).unwrap();
        let store = config.style_store();
        use crate::style::StyleStore;
        assert_eq!(store.get("thumb").unwrap().style, "image/resize,w_400");
    }

    #[test]
    fn bad_style_names_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.toml");
        std::fs::write(&path, "[styles]\n\"a b\" = \"image/resize,w_400\"\n").unwrap();
        assert!(matches!(
            PipeConfig::load_or_default(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_and_validates() {
        let config: PipeConfig = toml::from_str(PipeConfig::stock_toml()).unwrap();
        config.validate().unwrap();
    }
}
