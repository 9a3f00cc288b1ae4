use std::fs;
use std::path::Path;
use std::time::Duration;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::surface::SurfaceStyle;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings of one canvas editor.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub text: TextDefaults,
    pub backend: BackendConfig,
    pub surface: SurfaceStyle,
}

impl EditorConfig {
    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let canvas = &self.canvas;
        if canvas.min_edge == 0 {
            return Err(ConfigError::InvalidValue("canvas.min_edge must be positive".into()));
        }
        if canvas.width < canvas.min_edge || canvas.height < canvas.min_edge {
            return Err(ConfigError::InvalidValue(format!(
                "default canvas {}x{} is below the minimum edge {}",
                canvas.width, canvas.height, canvas.min_edge
            )));
        }
        if canvas.margin < 0.0 {
            return Err(ConfigError::InvalidValue("canvas.margin must not be negative".into()));
        }
        if self.text.font_size <= 0.0 {
            return Err(ConfigError::InvalidValue("text.font_size must be positive".into()));
        }
        parse_hex_color(&canvas.background_color)?;
        parse_hex_color(&self.text.fill)?;
        Ok(())
    }

    /// The configured background color, black when the value does not parse
    pub fn background_color(&self) -> Color32 {
        parse_hex_color(&self.canvas.background_color).unwrap_or(Color32::BLACK)
    }

    pub fn delayed_renders(&self) -> Vec<Duration> {
        self.canvas
            .delayed_render_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

/// Canvas dimensions and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Smallest width or height a canvas can be resized to
    pub min_edge: u32,
    /// Space kept free around the canvas inside its container
    pub margin: f32,
    /// Height taken by the widget controls when the node size is used as container
    pub control_height: f32,
    pub node_padding: f32,
    pub min_available: f32,
    pub background_color: String,
    /// Render passes queued after a payload apply, on top of the immediate one
    pub delayed_render_ms: Vec<u64>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            min_edge: 16,
            margin: 10.0,
            control_height: 70.0,
            node_padding: 20.0,
            min_available: 120.0,
            background_color: "#000000".to_owned(),
            delayed_render_ms: vec![50, 200],
        }
    }
}

/// Defaults for newly added text layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub fill: String,
    pub line_height: f32,
    pub char_spacing: f32,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "Text".to_owned(),
            font_family: "Arial".to_owned(),
            font_size: 72.0,
            fill: "#ffffff".to_owned(),
            line_height: 1.2,
            char_spacing: 0.0,
        }
    }
}

/// Where the backend lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Prefix of the canvas routes, e.g. `/funcode/canvas_export`
    pub route_prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8188".to_owned(),
            route_prefix: "/funcode".to_owned(),
        }
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`
pub fn parse_hex_color(value: &str) -> ConfigResult<Color32> {
    let invalid = || ConfigError::InvalidColor(value.to_owned());
    let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    if hex.len() == 8 {
        Ok(Color32::from_rgba_unmultiplied(r, g, b, channel(6)?))
    } else {
        Ok(Color32::from_rgb(r, g, b))
    }
}

/// Formats an opaque color as `#rrggbb`
pub fn to_hex_color(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}
