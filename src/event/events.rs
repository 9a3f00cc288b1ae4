use crate::layer::{LayerId, LayerKind};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    LayerChanged(LayerEvent),
    BackgroundChanged(BackgroundEvent),
    /// Every layer and the background were dropped at once
    RegistryCleared,
    CanvasResized {
        width: u32,
        height: u32,
    },
    /// A reset-and-apply committed its results
    PayloadApplied {
        generation: u64,
        layers: usize,
    },
    /// A reset-and-apply was overtaken by a newer one and dropped its results
    PayloadDiscarded {
        generation: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added { id: LayerId, kind: LayerKind },
    Removed { id: LayerId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundEvent {
    Installed { natural_size: [u32; 2] },
    Cleared,
}
