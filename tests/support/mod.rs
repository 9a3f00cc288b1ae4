#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Once};

use canvas_sync::backend::CanvasBackend;
use canvas_sync::error::{AssetError, TransportError};
use canvas_sync::payload::{
    BackgroundData, CanvasDataPayload, ExportRequest, ImageSize, LayerData, NodeId, SaveRequest,
};
use canvas_sync::surface::{RasterSurface, SurfaceStyle};
use canvas_sync::trigger::ReloadTrigger;
use canvas_sync::{AssetLoader, CanvasEditor, EditorConfig, EditorServices};
use futures::FutureExt as _;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

static LOGGER: Once = Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Backend that remembers what it was sent
#[derive(Default)]
pub struct RecordingBackend {
    pub exports: Mutex<Vec<ExportRequest>>,
    pub saves: Mutex<Vec<SaveRequest>>,
    pub stored: Mutex<Option<CanvasDataPayload>>,
    pub gallery: Mutex<Vec<String>>,
    pub fetches: Mutex<usize>,
}

impl RecordingBackend {
    pub fn export_count(&self) -> usize {
        self.exports.lock().len()
    }

    pub fn store(&self, payload: CanvasDataPayload) {
        *self.stored.lock() = Some(payload);
    }
}

impl CanvasBackend for RecordingBackend {
    fn export(&self, request: ExportRequest) -> BoxFuture<'static, Result<(), TransportError>> {
        self.exports.lock().push(request);
        future::ready(Ok(())).boxed()
    }

    fn save(
        &self,
        request: SaveRequest,
    ) -> BoxFuture<'static, Result<Option<String>, TransportError>> {
        let path = format!("gallery/{}", request.filename);
        self.saves.lock().push(request);
        future::ready(Ok(Some(path))).boxed()
    }

    fn fetch_payload(
        &self,
        _node_id: &NodeId,
    ) -> BoxFuture<'static, Result<Option<CanvasDataPayload>, TransportError>> {
        *self.fetches.lock() += 1;
        future::ready(Ok(self.stored.lock().clone())).boxed()
    }

    fn list_gallery(&self) -> BoxFuture<'static, Result<Vec<String>, TransportError>> {
        future::ready(Ok(self.gallery.lock().clone())).boxed()
    }
}

/// Serves solid images; individual references can be held back until released
#[derive(Default)]
pub struct ManualAssets {
    sizes: Mutex<HashMap<String, (u32, u32)>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    failing: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<String>>,
}

impl ManualAssets {
    pub fn with_size(&self, reference: &str, width: u32, height: u32) {
        self.sizes.lock().insert(reference.to_owned(), (width, height));
    }

    /// The next load of `reference` waits until the returned sender fires
    pub fn hold(&self, reference: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(reference.to_owned(), rx);
        tx
    }

    pub fn fail(&self, reference: &str) {
        self.failing.lock().push(reference.to_owned());
    }
}

impl AssetLoader for ManualAssets {
    fn load(&self, reference: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>> {
        self.requests.lock().push(reference.to_owned());
        if self.failing.lock().iter().any(|r| r == reference) {
            return future::ready(Err(AssetError::Unavailable(reference.to_owned()))).boxed();
        }
        let (width, height) = self.sizes.lock().get(reference).copied().unwrap_or((10, 10));
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        match self.gates.lock().remove(reference) {
            Some(gate) => gate.map(move |_| Ok(image)).boxed(),
            None => future::ready(Ok(image)).boxed(),
        }
    }
}

#[derive(Default)]
pub struct RecordingTrigger {
    pub queued: Mutex<Vec<Vec<NodeId>>>,
}

impl ReloadTrigger for RecordingTrigger {
    fn queue_output_nodes(
        &self,
        node_ids: &[NodeId],
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        self.queued.lock().push(node_ids.to_vec());
        future::ready(Ok(())).boxed()
    }
}

pub struct Fixture {
    pub editor: CanvasEditor,
    pub backend: Arc<RecordingBackend>,
    pub assets: Arc<ManualAssets>,
}

pub fn services(backend: &Arc<RecordingBackend>, assets: &Arc<ManualAssets>) -> EditorServices {
    EditorServices::new(backend.clone(), assets.clone())
}

/// A 512x512 editor bound to `node` with a surface that is ready at once
pub fn fixture(node: &str) -> Fixture {
    init_logging();
    let backend = Arc::new(RecordingBackend::default());
    let assets = Arc::new(ManualAssets::default());
    let surface = RasterSurface::new(512, 512, SurfaceStyle::default());
    let editor = CanvasEditor::new(
        Some(NodeId::from(node)),
        EditorConfig::default(),
        Box::new(surface),
        services(&backend, &assets),
    );
    Fixture {
        editor,
        backend,
        assets,
    }
}

pub fn layer(id: u32, image: &str) -> LayerData {
    LayerData {
        id,
        image_ref: image.to_owned(),
        size: None,
    }
}

pub fn background(image: &str, size: Option<(f32, f32)>) -> BackgroundData {
    BackgroundData {
        id: Some(0),
        image_ref: image.to_owned(),
        size: size.map(|(w, h)| ImageSize::new(w, h)),
    }
}

pub fn payload(background: Option<BackgroundData>, layers: Vec<LayerData>) -> CanvasDataPayload {
    CanvasDataPayload { background, layers }
}

pub fn ids(editor: &CanvasEditor) -> Vec<u32> {
    editor.layer_ids().iter().map(|id| id.get()).collect()
}
