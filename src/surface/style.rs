use egui::Color32;
use serde::{Deserialize, Serialize};

/// Shape of the selection handles drawn at an object's corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    Rect,
    Circle,
}

/// Appearance of interactive objects on a surface.
///
/// Passed to a surface when it is constructed. A surface never mutates it and
/// there is no process-wide default that other editors could observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceStyle {
    pub transparent_corners: bool,
    pub corner_color: Color32,
    pub corner_stroke_color: Color32,
    pub border_color: Color32,
    pub corner_size: f32,
    /// Extra space between an object's bounds and its selection border; also
    /// widens the hit area
    pub padding: f32,
    pub corner_style: CornerStyle,
    pub border_dash: [f32; 2],
    pub border_scale_factor: f32,
    pub corner_stroke_width: f32,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            transparent_corners: false,
            corner_color: Color32::WHITE,
            corner_stroke_color: Color32::BLACK,
            border_color: Color32::from_rgb(0x00, 0xc3, 0xff),
            corner_size: 20.0,
            padding: 16.0,
            corner_style: CornerStyle::Circle,
            border_dash: [6.0, 6.0],
            border_scale_factor: 6.0,
            corner_stroke_width: 6.0,
        }
    }
}
