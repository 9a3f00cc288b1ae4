#![warn(clippy::all, rust_2018_idioms)]

pub mod asset;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod edit;
pub mod editor;
pub mod error;
pub mod event;
pub mod export;
pub mod geometry;
pub mod graph;
pub mod instances;
pub mod layer;
pub mod payload;
pub mod registry;
pub mod renderer;
pub mod selector;
pub mod surface;
pub mod sync;
pub mod trigger;
pub mod util;

pub use asset::{AssetLoader, HttpAssetLoader};
pub use backend::{CanvasBackend, HttpBackend};
pub use config::EditorConfig;
pub use edit::{EditOutcome, EditTarget, LocalEdit};
pub use editor::{CanvasEditor, EditorServices};
pub use error::{CanvasError, CanvasResult};
pub use instances::EditorInstances;
pub use layer::{LayerId, LayerKind};
pub use payload::{CanvasDataPayload, NodeId, PushNotification};
pub use registry::LayerRegistry;
pub use renderer::CanvasView;
pub use surface::{RasterSurface, RenderingSurface};
pub use sync::SyncPhase;
