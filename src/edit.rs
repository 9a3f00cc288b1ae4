use egui::Color32;

use crate::layer::LayerId;
use crate::surface::{BlendMode, ObjectHandle, Selection, StackOrder, TextStyle};

/// Which object an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// Whatever is active on the surface
    Active,
    Layer(LayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Both,
    Horizontal,
    Vertical,
}

/// Partial text style change; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyleEdit {
    pub content: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub fill: Option<Color32>,
    /// `Some(None)` makes the background transparent
    pub background: Option<Option<Color32>>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub char_spacing: Option<f32>,
    pub line_height: Option<f32>,
}

impl TextStyleEdit {
    pub fn apply_to(&self, style: &mut TextStyle) {
        if let Some(content) = &self.content {
            style.content = content.clone();
        }
        if let Some(family) = &self.font_family {
            style.font_family = family.clone();
        }
        if let Some(size) = self.font_size.filter(|size| *size > 0.0) {
            style.font_size = size;
        }
        if let Some(fill) = self.fill {
            style.fill = fill;
        }
        if let Some(background) = self.background {
            style.background = background;
        }
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underline) = self.underline {
            style.underline = underline;
        }
        if let Some(spacing) = self.char_spacing {
            style.char_spacing = spacing;
        }
        if let Some(line_height) = self.line_height.filter(|h| *h > 0.0) {
            style.line_height = line_height;
        }
    }
}

/// A direct user manipulation. Each one mutates the canvas synchronously and
/// is followed by exactly one export.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEdit {
    AddTextLayer,
    Remove(Selection),
    /// Remove whatever is active, as the delete key does
    RemoveActive,
    Flip { target: EditTarget, axis: Axis },
    Center { target: EditTarget, alignment: Alignment },
    Restack { target: EditTarget, order: StackOrder },
    SetBlendMode { target: EditTarget, mode: BlendMode },
    /// Commits an opacity previewed with `preview_opacity`
    SetOpacity { target: EditTarget, opacity: f32 },
    SetTextStyle { target: EditTarget, edit: TextStyleEdit },
    /// Clamped to the configured minimum edge
    ResizeCanvas { width: u32, height: u32 },
    SetBackgroundColor(Color32),
    /// Drop every layer but keep the background
    ClearLayers,
    /// Drop everything and forget the applied payload
    Reset,
    /// The user moved or transformed an object on the surface
    ObjectModified(ObjectHandle),
}

/// Layers an edit created or destroyed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub added: Vec<LayerId>,
    pub removed: Vec<LayerId>,
}

impl EditOutcome {
    pub fn added(id: LayerId) -> Self {
        Self {
            added: vec![id],
            removed: Vec::new(),
        }
    }

    pub fn removed(ids: Vec<LayerId>) -> Self {
        Self {
            added: Vec::new(),
            removed: ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
