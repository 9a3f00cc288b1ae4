//! The rendering surface the editor draws through.
//!
//! A surface owns the visual objects (creation, hit-testing, selection, drawing).
//! The editor only keeps [`ObjectHandle`]s to them and never assumes anything
//! about how they are drawn.

mod raster;
mod style;

pub use raster::RasterSurface;
pub use style::{CornerStyle, SurfaceStyle};

use std::fmt;
use std::io::Cursor;
use std::time::Duration;

use egui::{Color32, Pos2};
use futures::future::BoxFuture;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SurfaceError;

/// Opaque reference to an object living on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(Uuid);

impl ObjectHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The active object or group of objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(ObjectHandle),
    Multiple(Vec<ObjectHandle>),
}

impl Selection {
    pub fn handles(&self) -> Vec<ObjectHandle> {
        match self {
            Selection::Single(handle) => vec![*handle],
            Selection::Multiple(handles) => handles.clone(),
        }
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        match self {
            Selection::Single(h) => *h == handle,
            Selection::Multiple(handles) => handles.contains(&handle),
        }
    }

    /// The single selected object, if exactly one is selected
    pub fn single(&self) -> Option<ObjectHandle> {
        match self {
            Selection::Single(handle) => Some(*handle),
            Selection::Multiple(handles) if handles.len() == 1 => Some(handles[0]),
            Selection::Multiple(_) => None,
        }
    }
}

/// Compositing operation of an object against what lies beneath it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Lighten,
    Darken,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    pub const ALL: [BlendMode; 10] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Lighten,
        BlendMode::Darken,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
    ];

    /// Canvas composite-operation name
    pub fn css_name(self) -> &'static str {
        match self {
            BlendMode::Normal => "source-over",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Lighten => "lighten",
            BlendMode::Darken => "darken",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
        }
    }

    pub fn from_css_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.css_name() == name)
    }
}

/// Per-object appearance that is not geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectStyle {
    pub opacity: f32,
    pub blend: BlendMode,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for ObjectStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend: BlendMode::Normal,
            flip_x: false,
            flip_y: false,
        }
    }
}

/// Content and typography of a text object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub fill: Color32,
    /// `None` is a transparent background
    pub background: Option<Color32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub char_spacing: f32,
    pub line_height: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: "Text".to_owned(),
            font_family: "Arial".to_owned(),
            font_size: 72.0,
            fill: Color32::WHITE,
            background: None,
            bold: false,
            italic: false,
            underline: false,
            char_spacing: 0.0,
            line_height: 1.2,
        }
    }
}

/// Stacking moves from the context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOrder {
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,
}

/// Things the surface reports back to the editor
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The user moved, scaled or rotated an object
    ObjectModified(ObjectHandle),
    /// The user changed the active selection
    SelectionChanged(Option<Selection>),
}

/// Capability set the editor needs from a drawing surface.
///
/// Positions are object centers in canvas pixels. The background image is a
/// separate, non-interactive object below every layer.
pub trait RenderingSurface: Send {
    /// Resolves once the surface can accept objects
    fn ready(&self) -> BoxFuture<'static, ()>;

    fn add_image(&mut self, image: RgbaImage, center: Pos2, interactive: bool) -> ObjectHandle;

    fn add_text(&mut self, style: &TextStyle, center: Pos2) -> ObjectHandle;

    fn remove(&mut self, handle: ObjectHandle) -> Result<(), SurfaceError>;

    /// Removes every object including the background image
    fn clear(&mut self);

    fn object_count(&self) -> usize;

    /// Replaces the background image
    fn set_background_image(&mut self, image: RgbaImage, center: Pos2) -> ObjectHandle;

    fn clear_background_image(&mut self);

    fn dimensions(&self) -> [u32; 2];

    fn set_dimensions(&mut self, size: [u32; 2]);

    fn background_color(&self) -> Color32;

    fn set_background_color(&mut self, color: Color32);

    fn position(&self, handle: ObjectHandle) -> Option<Pos2>;

    fn set_position(&mut self, handle: ObjectHandle, center: Pos2) -> Result<(), SurfaceError>;

    fn active(&self) -> Option<Selection>;

    fn set_active(&mut self, selection: Option<Selection>);

    fn discard_active(&mut self) {
        self.set_active(None);
    }

    fn style(&self, handle: ObjectHandle) -> Option<ObjectStyle>;

    fn set_style(&mut self, handle: ObjectHandle, style: ObjectStyle) -> Result<(), SurfaceError>;

    fn text_style(&self, handle: ObjectHandle) -> Option<TextStyle>;

    fn set_text_style(
        &mut self,
        handle: ObjectHandle,
        style: TextStyle,
    ) -> Result<(), SurfaceError>;

    fn restack(&mut self, handle: ObjectHandle, order: StackOrder) -> Result<(), SurfaceError>;

    fn request_render(&mut self);

    /// Queue an extra render pass after `delay`
    fn schedule_render(&mut self, delay: Duration);

    /// Changes whenever the drawn output may have changed
    fn render_revision(&self) -> u64;

    /// Flattens the canvas into one image
    fn composite(&self) -> Result<RgbaImage, SurfaceError>;

    /// The composite as PNG bytes
    fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        let image = self.composite()?;
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    /// Topmost interactive object under `pos`
    fn object_at(&self, pos: Pos2) -> Option<ObjectHandle>;

    /// Drag an object the way a user would: moves it and reports the modification
    fn move_object(&mut self, handle: ObjectHandle, center: Pos2) -> Result<(), SurfaceError>;

    /// Select like a user would: changes the selection and reports it
    fn select(&mut self, selection: Option<Selection>);

    /// Events that happened since the last drain
    fn drain_events(&mut self) -> Vec<SurfaceEvent>;
}
