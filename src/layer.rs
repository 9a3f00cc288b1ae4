use serde::{Deserialize, Serialize};
use std::fmt;

use crate::surface::ObjectHandle;

/// A stable identifier for a layer.
///
/// Ids start at 1 and are never reused within a session, so a stale selection
/// can never bind to an unrelated layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl LayerId {
    /// Creates a new LayerId from a raw value
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Gets the underlying value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a layer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Image,
    Text,
}

/// A registered layer: its id, its kind and the surface object that draws it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    pub id: LayerId,
    pub kind: LayerKind,
    pub handle: ObjectHandle,
}

impl LayerEntry {
    pub fn new(id: LayerId, kind: LayerKind, handle: ObjectHandle) -> Self {
        Self { id, kind, handle }
    }

    /// Name shown in the layer selector
    pub fn label(&self) -> String {
        match self.kind {
            LayerKind::Text => format!("Text {}", self.id),
            LayerKind::Image => format!("overlay{}", self.id),
        }
    }
}

/// The background image slot. Lives outside the layer-id space and is never interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundSlot {
    pub handle: ObjectHandle,
    /// Pixel size of the decoded image
    pub natural_size: [u32; 2],
}
