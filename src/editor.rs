//! The canvas editor bound to one graph node.
//!
//! [`CanvasEditor`] is the sync gatekeeper: backend pushes, reload triggers,
//! fallback fetches and local edits all funnel through it. State lives behind
//! one mutex that is never held across an `.await`, so every suspension point
//! (surface readiness, asset loads, network calls) lets other operations run.

use std::sync::Arc;
use std::time::Duration;

use egui::{Color32, pos2};
use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use image::RgbaImage;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::asset::{AssetLoader, HttpAssetLoader};
use crate::backend::{CanvasBackend, HttpBackend};
use crate::config::{EditorConfig, parse_hex_color};
use crate::edit::{Alignment, Axis, EditOutcome, EditTarget, LocalEdit};
use crate::error::{CanvasError, CanvasResult, RegistryError, SurfaceError};
use crate::event::{EditorEvent, EventHandler};
use crate::export::{ExportChannel, encode_composition};
use crate::geometry::{CanvasGeometry, ScaleManager, canvas_center, rescale_position};
use crate::graph::{GraphInputs, view_url};
use crate::layer::{BackgroundSlot, LayerId, LayerKind};
use crate::payload::{CanvasDataPayload, ImageSize, NodeId, PushNotification, SaveRequest};
use crate::registry::LayerRegistry;
use crate::selector::LayerSelector;
use crate::surface::{ObjectHandle, RenderingSurface, Selection, TextStyle};
use crate::sync::{SyncDecision, SyncPhase, SyncState};
use crate::trigger::ReloadTrigger;
use crate::util::time;

/// The collaborators an editor talks to
#[derive(Clone)]
pub struct EditorServices {
    pub backend: Arc<dyn CanvasBackend>,
    pub assets: Arc<dyn AssetLoader>,
    pub trigger: Option<Arc<dyn ReloadTrigger>>,
    pub graph: Option<Arc<dyn GraphInputs>>,
}

impl EditorServices {
    pub fn new(backend: Arc<dyn CanvasBackend>, assets: Arc<dyn AssetLoader>) -> Self {
        Self {
            backend,
            assets,
            trigger: None,
            graph: None,
        }
    }

    /// HTTP backend and asset loader pointed at the configured server
    pub fn http(config: &EditorConfig) -> Self {
        Self::new(
            Arc::new(HttpBackend::new(&config.backend)),
            Arc::new(HttpAssetLoader::new(&config.backend.base_url)),
        )
    }

    pub fn with_trigger(mut self, trigger: Arc<dyn ReloadTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphInputs>) -> Self {
        self.graph = Some(graph);
        self
    }
}

struct EditorCore {
    registry: LayerRegistry,
    surface: Box<dyn RenderingSurface>,
    scale: ScaleManager,
    sync: SyncState,
    selector: LayerSelector,
    background_color: Color32,
    min_edge: u32,
}

impl EditorCore {
    /// Layer behind the surface's single active object
    fn active_layer(&self) -> Option<LayerId> {
        let handle = self.surface.active()?.single()?;
        self.registry.find_by_handle(handle).map(|entry| entry.id)
    }

    fn rebuild_selector(&mut self) {
        let active = self.active_layer();
        self.selector.rebuild(&self.registry, active);
    }

    fn sync_selector(&mut self) {
        let active = self.active_layer();
        self.selector.sync_with_active(&self.registry, active);
    }

    fn target_handle(&self, target: EditTarget) -> CanvasResult<ObjectHandle> {
        match target {
            EditTarget::Active => self
                .surface
                .active()
                .and_then(|selection| selection.single())
                .filter(|handle| !self.registry.is_background(*handle))
                .ok_or(CanvasError::NoTarget),
            EditTarget::Layer(id) => self
                .registry
                .get(id)
                .map(|entry| entry.handle)
                .ok_or_else(|| RegistryError::NotFound(id).into()),
        }
    }

    /// Resizes the canvas. Layer positions scale with it, their sizes do not,
    /// and the background stays centered.
    fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        let new = [width.max(self.min_edge), height.max(self.min_edge)];
        let old = self.surface.dimensions();
        if new == old {
            return false;
        }

        self.surface.set_dimensions(new);
        self.surface.set_background_color(self.background_color);
        for entry in self.registry.ordered_layers() {
            if let Some(pos) = self.surface.position(entry.handle) {
                let moved = rescale_position(pos, old, new);
                if let Err(err) = self.surface.set_position(entry.handle, moved) {
                    warn!("layer {} could not follow the resize: {err}", entry.id);
                }
            }
        }
        if let Some(slot) = self.registry.background().copied() {
            if let Err(err) = self.surface.set_position(slot.handle, canvas_center(new)) {
                warn!("background could not be re-centered: {err}");
            }
        }
        self.scale.set_content_size(new[0], new[1]);
        self.registry.notify(EditorEvent::CanvasResized {
            width: new[0],
            height: new[1],
        });
        self.surface.request_render();
        true
    }

    /// Removes every layer in the selection; the background is never removed
    fn remove_selection(&mut self, selection: &Selection) -> Vec<LayerId> {
        if matches!(selection, Selection::Multiple(_)) {
            self.surface.discard_active();
        }
        let mut removed = Vec::new();
        for handle in selection.handles() {
            if self.registry.is_background(handle) {
                continue;
            }
            if let Some(id) = self.registry.find_by_handle(handle).map(|entry| entry.id) {
                if self.registry.remove(id).is_ok() {
                    removed.push(id);
                }
            }
            if let Err(err) = self.surface.remove(handle) {
                debug!("object {handle} was already gone: {err}");
            }
        }
        self.rebuild_selector();
        self.surface.request_render();
        removed
    }

    fn clear_layers(&mut self) -> Vec<LayerId> {
        let ids = self.registry.layer_ids();
        for handle in self.registry.clear_layers() {
            if let Err(err) = self.surface.remove(handle) {
                debug!("object {handle} was already gone: {err}");
            }
        }
        self.surface.discard_active();
        self.rebuild_selector();
        self.surface.request_render();
        ids
    }

    /// Empties registry and surface and paints the background color
    fn wipe(&mut self) {
        self.registry.clear();
        self.surface.clear();
        self.surface.set_background_color(self.background_color);
    }

    fn install_background(&mut self, image: RgbaImage, size: Option<ImageSize>) {
        let natural = [image.width(), image.height()];
        let [width, height] = size.and_then(|size| size.to_dimensions()).unwrap_or(natural);
        self.resize_canvas(width, height);
        let center = canvas_center(self.surface.dimensions());
        let handle = self.surface.set_background_image(image, center);
        self.registry.set_background(BackgroundSlot {
            handle,
            natural_size: natural,
        });
    }
}

struct EditorShared {
    node_id: Option<NodeId>,
    config: EditorConfig,
    services: EditorServices,
    export: ExportChannel,
    ready: Shared<BoxFuture<'static, ()>>,
    core: Mutex<EditorCore>,
}

/// A canvas editor instance. Cloning yields another handle to the same editor.
#[derive(Clone)]
pub struct CanvasEditor {
    shared: Arc<EditorShared>,
}

impl std::fmt::Debug for CanvasEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasEditor")
            .field("node_id", &self.shared.node_id)
            .finish_non_exhaustive()
    }
}

/// Loaded assets of one apply, waiting to be committed
struct StagedPayload {
    background: Option<(Option<ImageSize>, RgbaImage)>,
    layers: Vec<(u32, RgbaImage)>,
}

impl CanvasEditor {
    pub fn new(
        node_id: Option<NodeId>,
        config: EditorConfig,
        mut surface: Box<dyn RenderingSurface>,
        services: EditorServices,
    ) -> Self {
        let background_color = config.background_color();
        let canvas = &config.canvas;
        surface.set_dimensions([canvas.width, canvas.height]);
        surface.set_background_color(background_color);
        let ready = surface.ready().shared();

        let core = EditorCore {
            registry: LayerRegistry::new(),
            scale: ScaleManager::new(canvas.width, canvas.height, canvas.margin),
            surface,
            sync: SyncState::new(),
            selector: LayerSelector::new(),
            background_color,
            min_edge: canvas.min_edge,
        };
        let export = ExportChannel::new(node_id.clone(), services.backend.clone());

        Self {
            shared: Arc::new(EditorShared {
                node_id,
                config,
                services,
                export,
                ready,
                core: Mutex::new(core),
            }),
        }
    }

    pub fn node_id(&self) -> Option<&NodeId> {
        self.shared.node_id.as_ref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, EditorCore> {
        self.shared.core.lock()
    }

    fn tag(&self) -> String {
        match &self.shared.node_id {
            Some(id) => id.to_string(),
            None => "unbound".to_owned(),
        }
    }

    /// Waits for the surface. Only the first call actually suspends.
    pub async fn ensure_ready(&self) {
        self.shared.ready.clone().await;
        let mut core = self.lock();
        if !core.sync.is_ready() {
            core.sync.mark_ready();
            info!("[{}] surface ready", self.tag());
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lock().sync.is_ready()
    }

    pub fn sync_phase(&self) -> SyncPhase {
        self.lock().sync.phase()
    }

    /// Called once the widget is mounted in the host node
    pub async fn on_attached(&self) {
        self.ensure_ready().await;
        self.apply_pending().await;

        let current = self.lock().sync.current_payload().cloned();
        match current {
            Some(payload) => {
                self.reset_and_apply(payload).await;
            }
            None => {
                {
                    let mut core = self.lock();
                    let color = core.background_color;
                    core.surface.set_background_color(color);
                    core.surface.request_render();
                }
                self.export().await;
                self.fetch_and_apply_latest(true).await;
            }
        }
    }

    /// A payload arrived from the backend
    pub async fn on_server_payload(&self, payload: CanvasDataPayload) {
        self.lock().sync.park(payload, false);
        self.ensure_ready().await;
        self.apply_pending().await;
    }

    /// Handles a push notification addressed to this editor, then exports once
    pub async fn handle_push(&self, notification: PushNotification) -> CanvasResult<()> {
        if self.shared.node_id.as_ref() != Some(&notification.node_id) {
            return Err(CanvasError::IdentityMismatch(notification.node_id.to_string()));
        }
        self.ensure_ready().await;
        if let Some(payload) = notification.canvas_data {
            self.on_server_payload(payload).await;
        }
        self.export().await;
        Ok(())
    }

    /// Applies the parked payload, if any
    pub async fn apply_pending(&self) {
        let pending = self.lock().sync.take_pending();
        let Some(pending) = pending else {
            return;
        };
        if pending.force_reset {
            self.reset_and_apply(pending.payload).await;
            return;
        }

        let fingerprint = pending.payload.fingerprint();
        let decision = {
            let mut core = self.lock();
            let decision = core.sync.decide(&fingerprint, core.registry.is_empty());
            if decision == SyncDecision::RecordOnly {
                debug!("[{}] payload {fingerprint} already shown", self.tag());
                core.sync.record(&pending.payload, fingerprint);
            }
            decision
        };
        if decision == SyncDecision::ResetAndApply {
            self.reset_and_apply(pending.payload).await;
        }
    }

    /// Replaces the whole canvas with the payload's content.
    ///
    /// Assets load one after another without holding the state lock. The
    /// result only commits if no newer apply started meanwhile; returns whether
    /// it did.
    pub async fn reset_and_apply(&self, payload: CanvasDataPayload) -> bool {
        let fingerprint = payload.fingerprint();
        let generation = self.lock().sync.begin_apply(&payload, fingerprint.clone());
        info!(
            "[{}] applying payload {fingerprint} as #{generation} ({} layers)",
            self.tag(),
            payload.layers.len()
        );

        let staged = self.stage(&payload).await;

        let mut core = self.lock();
        let committed = core.sync.is_current(generation);
        if committed {
            let layers = self.commit(&mut core, staged);
            core.registry.notify(EditorEvent::PayloadApplied { generation, layers });
        } else {
            info!("[{}] payload #{generation} superseded, discarding", self.tag());
            core.registry.notify(EditorEvent::PayloadDiscarded { generation });
        }
        core.sync.finish_apply(generation);
        committed
    }

    async fn stage(&self, payload: &CanvasDataPayload) -> StagedPayload {
        let mut staged = StagedPayload {
            background: None,
            layers: Vec::new(),
        };
        if let Some(background) = payload
            .background
            .as_ref()
            .filter(|bg| !bg.image_ref.is_empty())
        {
            if let Some(image) = self.load_asset(&background.image_ref).await {
                staged.background = Some((background.size, image));
            }
        }
        for layer in payload.layers.iter().filter(|layer| !layer.image_ref.is_empty()) {
            if let Some(image) = self.load_asset(&layer.image_ref).await {
                staged.layers.push((layer.id, image));
            }
        }
        staged
    }

    async fn load_asset(&self, reference: &str) -> Option<RgbaImage> {
        match self.shared.services.assets.load(reference).await {
            Ok(image) => Some(image),
            Err(source) => {
                let err = CanvasError::AssetLoad {
                    reference: reference.to_owned(),
                    source,
                };
                warn!("[{}] {err}", self.tag());
                None
            }
        }
    }

    fn commit(&self, core: &mut EditorCore, staged: StagedPayload) -> usize {
        core.wipe();
        if let Some((size, image)) = staged.background {
            core.install_background(image, size);
        }

        // Explicit ids first, so allocated ones land above all of them
        for (raw, _) in &staged.layers {
            if *raw > 0 {
                core.registry.reserve(LayerId(*raw));
            }
        }
        let center = canvas_center(core.surface.dimensions());
        for (raw, image) in staged.layers {
            let id = if raw > 0 {
                LayerId(raw)
            } else {
                match core.registry.allocate_id() {
                    Ok(id) => id,
                    Err(err) => {
                        warn!("[{}] skipping layer: {err}", self.tag());
                        continue;
                    }
                }
            };
            let handle = core.surface.add_image(image, center, true);
            if let Err(err) = core.registry.insert(id, LayerKind::Image, handle) {
                warn!("[{}] skipping layer: {err}", self.tag());
                if let Err(err) = core.surface.remove(handle) {
                    debug!("object {handle} was already gone: {err}");
                }
            }
        }

        core.rebuild_selector();
        core.surface.request_render();
        for delay in self.shared.config.delayed_renders() {
            core.surface.schedule_render(delay);
        }
        core.registry.layer_count()
    }

    /// Fetches the latest payload stored for this node. Returns whether one was applied.
    pub async fn fetch_and_apply_latest(&self, force_reset: bool) -> bool {
        self.ensure_ready().await;
        let Some(node_id) = self.shared.node_id.clone() else {
            debug!("[unbound] no node to fetch a payload for");
            return false;
        };
        match self.shared.services.backend.fetch_payload(&node_id).await {
            Ok(Some(payload)) => {
                if force_reset {
                    self.reset_and_apply(payload).await;
                } else {
                    self.lock().sync.park(payload, false);
                    self.apply_pending().await;
                }
                true
            }
            Ok(None) => {
                debug!("[{node_id}] backend holds no payload");
                false
            }
            Err(err) => {
                warn!("[{node_id}] fetching latest payload failed: {err}");
                false
            }
        }
    }

    /// "Reload from backend". With an addressable node the pipeline is asked to
    /// recompute it and the result arrives as a push. Otherwise the latest
    /// stored payload, or failing that the wired graph inputs, are applied
    /// with a forced reset.
    pub async fn trigger_reload(&self) {
        self.ensure_ready().await;
        let node_id = self.shared.node_id.clone();
        if let (Some(node_id), Some(trigger)) = (node_id, self.shared.services.trigger.clone()) {
            info!("[{node_id}] queueing recompute");
            if let Err(err) = trigger.queue_output_nodes(&[node_id.clone()]).await {
                error!("[{node_id}] {}", CanvasError::Trigger(err));
            }
            return;
        }

        let mut applied = self.fetch_and_apply_latest(true).await;
        if !applied {
            if let Some(payload) = self
                .shared
                .services
                .graph
                .as_ref()
                .and_then(|graph| graph.scan())
            {
                debug!("[{}] applying payload scanned from graph inputs", self.tag());
                applied = self.reset_and_apply(payload).await;
            }
        }
        if !applied {
            debug!("[{}] reload found nothing to apply", self.tag());
        }
        self.export().await;
    }

    /// Applies a direct manipulation, then exports once whatever the outcome
    pub async fn apply_local_edit(&self, edit: LocalEdit) -> CanvasResult<EditOutcome> {
        self.ensure_ready().await;
        let outcome = {
            let mut core = self.lock();
            self.apply_edit(&mut core, edit)
        };
        if let Err(err) = &outcome {
            warn!("[{}] edit failed: {err}", self.tag());
        }
        self.export().await;
        outcome
    }

    fn apply_edit(&self, core: &mut EditorCore, edit: LocalEdit) -> CanvasResult<EditOutcome> {
        debug!("[{}] local edit {edit:?}", self.tag());
        match edit {
            LocalEdit::AddTextLayer => {
                let id = core.registry.allocate_id()?;
                let style = self.default_text_style();
                let center = canvas_center(core.surface.dimensions());
                let handle = core.surface.add_text(&style, center);
                core.registry.insert(id, LayerKind::Text, handle)?;
                core.surface.set_active(Some(Selection::Single(handle)));
                core.rebuild_selector();
                core.surface.request_render();
                core.surface.schedule_render(Duration::ZERO);
                Ok(EditOutcome::added(id))
            }
            LocalEdit::Remove(selection) => {
                Ok(EditOutcome::removed(core.remove_selection(&selection)))
            }
            LocalEdit::RemoveActive => {
                let removed = match core.surface.active() {
                    Some(selection) => core.remove_selection(&selection),
                    None => Vec::new(),
                };
                Ok(EditOutcome::removed(removed))
            }
            LocalEdit::Flip { target, axis } => {
                let handle = core.target_handle(target)?;
                let mut style = core
                    .surface
                    .style(handle)
                    .ok_or(SurfaceError::UnknownObject(handle))?;
                match axis {
                    Axis::Horizontal => style.flip_x = !style.flip_x,
                    Axis::Vertical => style.flip_y = !style.flip_y,
                }
                core.surface.set_style(handle, style)?;
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::Center { target, alignment } => {
                let handle = core.target_handle(target)?;
                let pos = core.surface.position(handle).ok_or(SurfaceError::UnknownObject(handle))?;
                let center = canvas_center(core.surface.dimensions());
                let moved = match alignment {
                    Alignment::Both => center,
                    Alignment::Horizontal => pos2(center.x, pos.y),
                    Alignment::Vertical => pos2(pos.x, center.y),
                };
                core.surface.set_position(handle, moved)?;
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::Restack { target, order } => {
                let handle = core.target_handle(target)?;
                core.surface.restack(handle, order)?;
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::SetBlendMode { target, mode } => {
                let handle = core.target_handle(target)?;
                let mut style = core
                    .surface
                    .style(handle)
                    .ok_or(SurfaceError::UnknownObject(handle))?;
                style.blend = mode;
                core.surface.set_style(handle, style)?;
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::SetOpacity { target, opacity } => {
                Self::set_opacity(core, target, opacity)?;
                Ok(EditOutcome::default())
            }
            LocalEdit::SetTextStyle { target, edit } => {
                let handle = core.target_handle(target)?;
                let mut style = core
                    .surface
                    .text_style(handle)
                    .ok_or(SurfaceError::NotText(handle))?;
                edit.apply_to(&mut style);
                core.surface.set_text_style(handle, style)?;
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::ResizeCanvas { width, height } => {
                core.resize_canvas(width, height);
                Ok(EditOutcome::default())
            }
            LocalEdit::SetBackgroundColor(color) => {
                core.background_color = color;
                core.surface.set_background_color(color);
                core.surface.request_render();
                Ok(EditOutcome::default())
            }
            LocalEdit::ClearLayers => Ok(EditOutcome::removed(core.clear_layers())),
            LocalEdit::Reset => {
                let removed = core.registry.layer_ids();
                core.sync.forget_payload();
                core.wipe();
                core.rebuild_selector();
                core.surface.request_render();
                info!("[{}] canvas reset", self.tag());
                Ok(EditOutcome::removed(removed))
            }
            LocalEdit::ObjectModified(handle) => {
                core.surface.request_render();
                debug!("[{}] object {handle} modified", self.tag());
                Ok(EditOutcome::default())
            }
        }
    }

    fn set_opacity(core: &mut EditorCore, target: EditTarget, opacity: f32) -> CanvasResult<()> {
        let handle = core.target_handle(target)?;
        let mut style = core.surface.style(handle).ok_or(SurfaceError::UnknownObject(handle))?;
        style.opacity = opacity.clamp(0.0, 1.0);
        core.surface.set_style(handle, style)?;
        core.surface.request_render();
        Ok(())
    }

    fn default_text_style(&self) -> TextStyle {
        let text = &self.shared.config.text;
        TextStyle {
            content: text.content.clone(),
            font_family: text.font_family.clone(),
            font_size: text.font_size,
            fill: parse_hex_color(&text.fill).unwrap_or(Color32::WHITE),
            background: None,
            char_spacing: text.char_spacing,
            line_height: text.line_height,
            ..TextStyle::default()
        }
    }

    /// Shows an opacity while the slider moves; nothing is exported
    pub fn preview_opacity(&self, target: EditTarget, opacity: f32) -> CanvasResult<()> {
        Self::set_opacity(&mut self.lock(), target, opacity)
    }

    pub fn opacity(&self, target: EditTarget) -> Option<f32> {
        let core = self.lock();
        let handle = core.target_handle(target).ok()?;
        core.surface.style(handle).map(|style| style.opacity)
    }

    /// Shows a background color while the picker is open; nothing is exported
    pub fn preview_background_color(&self, color: Color32) {
        let mut core = self.lock();
        core.surface.set_background_color(color);
        core.surface.request_render();
    }

    pub fn background_color(&self) -> Color32 {
        self.lock().background_color
    }

    /// Picks a layer from the dropdown; `None` clears the selection
    pub fn select_layer(&self, id: Option<LayerId>) -> Option<LayerId> {
        let mut core = self.lock();
        let chosen = core.selector.choose(id);
        let handle = chosen.and_then(|id| core.registry.get(id)).map(|entry| entry.handle);
        match handle {
            Some(handle) => core.surface.set_active(Some(Selection::Single(handle))),
            None => core.surface.discard_active(),
        }
        core.surface.request_render();
        chosen
    }

    /// Whether the active selection holds anything besides the background
    pub fn has_active_layer(&self) -> bool {
        let core = self.lock();
        core.surface.active().is_some_and(|selection| {
            selection
                .handles()
                .iter()
                .any(|h| !core.registry.is_background(*h))
        })
    }

    /// Follow the surface's selection in the dropdown
    pub fn sync_selector(&self) {
        self.lock().sync_selector();
    }

    pub fn selector(&self) -> LayerSelector {
        self.lock().selector.clone()
    }

    /// Serializes the composition and sends it to the backend
    pub async fn export(&self) {
        self.ensure_ready().await;
        let pending = {
            let core = self.lock();
            self.shared.export.prepare(core.surface.as_ref())
        };
        if let Some(pending) = pending {
            self.shared.export.transmit(pending).await;
        }
    }

    /// Exports handed to the backend so far
    pub fn export_attempts(&self) -> u64 {
        self.shared.export.attempts()
    }

    /// Stores the composition in the gallery as `canvas_<millis>.png`
    pub async fn save_to_gallery(&self) -> CanvasResult<Option<String>> {
        self.ensure_ready().await;
        let image_b64 = {
            let core = self.lock();
            encode_composition(core.surface.as_ref())?
        };
        let request = SaveRequest {
            image_b64,
            filename: time::gallery_filename(),
        };
        info!("[{}] saving {}", self.tag(), request.filename);
        self.shared
            .services
            .backend
            .save(request)
            .await
            .map_err(CanvasError::ExportTransmission)
    }

    pub async fn list_gallery(&self) -> CanvasResult<Vec<String>> {
        self.shared
            .services
            .backend
            .list_gallery()
            .await
            .map_err(CanvasError::ExportTransmission)
    }

    /// Replaces the canvas with a gallery image as background, sized to the image
    pub async fn import_background(&self, file: &str) -> CanvasResult<()> {
        self.ensure_ready().await;
        let reference = view_url(file);
        let image = self
            .shared
            .services
            .assets
            .load(&reference)
            .await
            .map_err(|source| CanvasError::AssetLoad { reference, source })?;
        {
            let mut core = self.lock();
            core.sync.forget_payload();
            core.wipe();
            core.install_background(image, None);
            core.rebuild_selector();
            core.surface.request_render();
        }
        info!("[{}] imported {file} as background", self.tag());
        self.export().await;
        Ok(())
    }

    /// Feed the laid-out container size. Returns whether the display size changed.
    pub fn set_container_size(&self, width: f32, height: f32) -> bool {
        self.lock().scale.set_container_size(width, height)
    }

    /// Derive the container from the host node size when no layout measurement exists
    pub fn fit_node_size(&self, node_width: f32, node_height: f32) -> bool {
        let canvas = &self.shared.config.canvas;
        self.lock().scale.fit_node_size(
            node_width,
            node_height,
            canvas.control_height,
            canvas.node_padding,
            canvas.min_available,
        )
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.lock().scale.geometry()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.lock().registry.layer_ids()
    }

    pub fn with_registry<R>(&self, f: impl FnOnce(&LayerRegistry) -> R) -> R {
        f(&self.lock().registry)
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&dyn RenderingSurface) -> R) -> R {
        f(self.lock().surface.as_ref())
    }

    /// Direct surface access for the host; must not call back into the editor
    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut dyn RenderingSurface) -> R) -> R {
        f(self.lock().surface.as_mut())
    }

    pub fn render_revision(&self) -> u64 {
        self.lock().surface.render_revision()
    }

    pub fn composite(&self) -> CanvasResult<RgbaImage> {
        Ok(self.lock().surface.composite()?)
    }

    /// Observe registry and apply events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.lock().registry.subscribe(handler);
    }
}
