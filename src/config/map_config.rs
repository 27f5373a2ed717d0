//! TOML-backed map configuration file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

use super::color::{Color, ColorKey, ColorPalette};
use super::defaults;
use super::drawable::{Drawable, DrawableSet, Sizes, TextOverlay};
use super::error::ConfigLoadError;
use super::render::{RenderConfig, Rotation, TrimConfig};

/// `[image]` section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageSection {
    #[serde(default = "defaults::scale")]
    pub scale: f32,

    #[serde(default)]
    pub rotate: Rotation,

    #[serde(default)]
    pub trim: TrimConfig,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            scale: defaults::scale(),
            rotate: Rotation::None,
            trim: TrimConfig::default(),
        }
    }
}

fn default_drawables() -> Vec<Drawable> {
    vec![Drawable::All]
}

/// Full map configuration loaded from TOML
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Enabled overlays
    #[serde(default = "default_drawables")]
    pub drawables: Vec<Drawable>,

    /// Scale, rotation and trim
    #[serde(default)]
    pub image: ImageSection,

    /// Colour overrides keyed by slot name (e.g. `map_inside`)
    #[serde(default)]
    pub colors: BTreeMap<String, Color>,

    /// Colour overrides keyed by room id
    #[serde(default)]
    pub room_colors: BTreeMap<String, Color>,

    /// Primitive sizes
    #[serde(default)]
    pub sizes: Sizes,

    /// User text overlays
    #[serde(default)]
    pub texts: Vec<TextOverlay>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            drawables: default_drawables(),
            image: ImageSection::default(),
            colors: BTreeMap::new(),
            room_colors: BTreeMap::new(),
            sizes: Sizes::default(),
            texts: Vec::new(),
        }
    }
}

impl MapConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: MapConfig = toml::from_str(contents)?;
        config.render_config().validate()?;
        config.palette()?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigLoadError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigLoadError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Runtime render configuration
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            scale: self.image.scale,
            rotation: self.image.rotate,
            trim: self.image.trim,
            drawables: DrawableSet::from_list(&self.drawables),
            sizes: self.sizes.clone(),
            texts: self.texts.clone(),
        }
    }

    /// Resolve colour names and room ids into a palette
    pub fn palette(&self) -> Result<ColorPalette, ConfigLoadError> {
        let mut palette = ColorPalette::new();
        for (name, color) in &self.colors {
            let key = ColorKey::deserialize(name.as_str().into_deserializer()).map_err(
                |e: serde::de::value::Error| {
                    ConfigLoadError::Invalid(format!("unknown colour '{}': {}", name, e))
                },
            )?;
            palette.colors.insert(key, *color);
        }
        for (id, color) in &self.room_colors {
            let id: u32 = id.parse().map_err(|_| {
                ConfigLoadError::Invalid(format!("room colour key '{}' is not a room id", id))
            })?;
            palette.room_colors.insert(id, *color);
        }
        Ok(palette)
    }
}
