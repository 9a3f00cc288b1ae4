use std::time::Duration;

use egui::{Color32, Pos2, Rect, Vec2};
use futures::FutureExt as _;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use super::{
    BlendMode, ObjectHandle, ObjectStyle, RenderingSurface, Selection, StackOrder, SurfaceEvent,
    SurfaceStyle, TextStyle,
};
use crate::error::SurfaceError;

#[derive(Debug, Clone)]
enum Content {
    Image(RgbaImage),
    Text(TextStyle),
}

#[derive(Debug, Clone)]
struct RasterObject {
    handle: ObjectHandle,
    content: Content,
    center: Pos2,
    style: ObjectStyle,
    interactive: bool,
}

impl RasterObject {
    fn size(&self) -> Vec2 {
        match &self.content {
            Content::Image(image) => Vec2::new(image.width() as f32, image.height() as f32),
            Content::Text(text) => text_extent(text),
        }
    }

    fn bounds(&self) -> Rect {
        Rect::from_center_size(self.center, self.size())
    }
}

/// Rough box a text object occupies; glyphs themselves are not rasterized
fn text_extent(text: &TextStyle) -> Vec2 {
    let lines: Vec<&str> = text.content.split('\n').collect();
    let longest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0) as f32;
    let advance = text.font_size * 0.6 + text.char_spacing * text.font_size / 1000.0;
    Vec2::new(
        (longest * advance).max(1.0),
        (lines.len() as f32 * text.font_size * text.line_height).max(1.0),
    )
}

/// A software surface that composites objects with the `image` crate.
///
/// Useful headless, in tests and behind [`crate::renderer::CanvasView`], which
/// uploads the composite as a texture. Text objects contribute their
/// background box only.
pub struct RasterSurface {
    size: [u32; 2],
    background_color: Color32,
    background: Option<RasterObject>,
    /// Bottom to top
    objects: Vec<RasterObject>,
    active: Option<Selection>,
    style: SurfaceStyle,
    revision: u64,
    render_requests: usize,
    scheduled: Vec<Duration>,
    events: Vec<SurfaceEvent>,
    ready: Mutex<Option<oneshot::Receiver<()>>>,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("size", &self.size)
            .field("objects", &self.objects.len())
            .field("has_background", &self.background.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}

/// Opens a gated surface; see [`RasterSurface::gated`]
pub struct ReadyGate(oneshot::Sender<()>);

impl ReadyGate {
    pub fn open(self) {
        // The surface may already be gone, nothing to wake then
        let _ = self.0.send(());
    }
}

impl RasterSurface {
    /// A surface that is ready immediately
    pub fn new(width: u32, height: u32, style: SurfaceStyle) -> Self {
        Self {
            size: [width, height],
            background_color: Color32::BLACK,
            background: None,
            objects: Vec::new(),
            active: None,
            style,
            revision: 0,
            render_requests: 0,
            scheduled: Vec::new(),
            events: Vec::new(),
            ready: Mutex::new(None),
        }
    }

    /// A surface whose `ready()` future only resolves once the gate is opened
    pub fn gated(width: u32, height: u32, style: SurfaceStyle) -> (Self, ReadyGate) {
        let (tx, rx) = oneshot::channel();
        let surface = Self::new(width, height, style);
        *surface.ready.lock() = Some(rx);
        (surface, ReadyGate(tx))
    }

    pub fn surface_style(&self) -> &SurfaceStyle {
        &self.style
    }

    /// How many immediate renders were requested
    pub fn render_requests(&self) -> usize {
        self.render_requests
    }

    /// Delays of queued render passes, oldest first
    pub fn scheduled_renders(&self) -> &[Duration] {
        &self.scheduled
    }

    /// Runs every queued render pass
    pub fn flush_scheduled(&mut self) -> usize {
        let count = self.scheduled.len();
        self.scheduled.clear();
        self.revision += count as u64;
        count
    }

    /// Handles bottom to top, background excluded
    pub fn stacking_order(&self) -> Vec<ObjectHandle> {
        self.objects.iter().map(|object| object.handle).collect()
    }

    pub fn background_handle(&self) -> Option<ObjectHandle> {
        self.background.as_ref().map(|object| object.handle)
    }

    pub fn object_size(&self, handle: ObjectHandle) -> Option<Vec2> {
        self.find(handle).map(RasterObject::size)
    }

    fn find(&self, handle: ObjectHandle) -> Option<&RasterObject> {
        self.objects
            .iter()
            .chain(self.background.iter())
            .find(|object| object.handle == handle)
    }

    fn find_mut(&mut self, handle: ObjectHandle) -> Result<&mut RasterObject, SurfaceError> {
        self.objects
            .iter_mut()
            .chain(self.background.iter_mut())
            .find(|object| object.handle == handle)
            .ok_or(SurfaceError::UnknownObject(handle))
    }

    fn index_of(&self, handle: ObjectHandle) -> Result<usize, SurfaceError> {
        self.objects
            .iter()
            .position(|object| object.handle == handle)
            .ok_or(SurfaceError::UnknownObject(handle))
    }

    fn push(&mut self, content: Content, center: Pos2, interactive: bool) -> ObjectHandle {
        let handle = ObjectHandle::new();
        self.objects.push(RasterObject {
            handle,
            content,
            center,
            style: ObjectStyle::default(),
            interactive,
        });
        self.revision += 1;
        handle
    }

    fn drop_from_selection(&mut self, handle: ObjectHandle) {
        self.active = match self.active.take() {
            Some(Selection::Single(h)) if h == handle => None,
            Some(Selection::Multiple(mut handles)) => {
                handles.retain(|h| *h != handle);
                (!handles.is_empty()).then_some(Selection::Multiple(handles))
            }
            other => other,
        };
    }
}

impl RenderingSurface for RasterSurface {
    fn ready(&self) -> BoxFuture<'static, ()> {
        match self.ready.lock().take() {
            // A dropped gate counts as ready
            Some(rx) => rx.map(|_| ()).boxed(),
            None => future::ready(()).boxed(),
        }
    }

    fn add_image(&mut self, image: RgbaImage, center: Pos2, interactive: bool) -> ObjectHandle {
        self.push(Content::Image(image), center, interactive)
    }

    fn add_text(&mut self, style: &TextStyle, center: Pos2) -> ObjectHandle {
        self.push(Content::Text(style.clone()), center, true)
    }

    fn remove(&mut self, handle: ObjectHandle) -> Result<(), SurfaceError> {
        if self.background_handle() == Some(handle) {
            self.clear_background_image();
            return Ok(());
        }
        let index = self.index_of(handle)?;
        self.objects.remove(index);
        self.drop_from_selection(handle);
        self.revision += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.objects.clear();
        self.background = None;
        self.active = None;
        self.revision += 1;
    }

    fn object_count(&self) -> usize {
        self.objects.len() + usize::from(self.background.is_some())
    }

    fn set_background_image(&mut self, image: RgbaImage, center: Pos2) -> ObjectHandle {
        let handle = ObjectHandle::new();
        self.background = Some(RasterObject {
            handle,
            content: Content::Image(image),
            center,
            style: ObjectStyle::default(),
            interactive: false,
        });
        self.revision += 1;
        handle
    }

    fn clear_background_image(&mut self) {
        if self.background.take().is_some() {
            self.revision += 1;
        }
    }

    fn dimensions(&self) -> [u32; 2] {
        self.size
    }

    fn set_dimensions(&mut self, size: [u32; 2]) {
        if self.size != size {
            self.size = size;
            self.revision += 1;
        }
    }

    fn background_color(&self) -> Color32 {
        self.background_color
    }

    fn set_background_color(&mut self, color: Color32) {
        self.background_color = color;
        self.revision += 1;
    }

    fn position(&self, handle: ObjectHandle) -> Option<Pos2> {
        self.find(handle).map(|object| object.center)
    }

    fn set_position(&mut self, handle: ObjectHandle, center: Pos2) -> Result<(), SurfaceError> {
        self.find_mut(handle)?.center = center;
        self.revision += 1;
        Ok(())
    }

    fn active(&self) -> Option<Selection> {
        self.active.clone()
    }

    fn set_active(&mut self, selection: Option<Selection>) {
        self.active = selection;
    }

    fn style(&self, handle: ObjectHandle) -> Option<ObjectStyle> {
        self.find(handle).map(|object| object.style)
    }

    fn set_style(&mut self, handle: ObjectHandle, style: ObjectStyle) -> Result<(), SurfaceError> {
        self.find_mut(handle)?.style = ObjectStyle {
            opacity: style.opacity.clamp(0.0, 1.0),
            ..style
        };
        self.revision += 1;
        Ok(())
    }

    fn text_style(&self, handle: ObjectHandle) -> Option<TextStyle> {
        match &self.find(handle)?.content {
            Content::Text(text) => Some(text.clone()),
            Content::Image(_) => None,
        }
    }

    fn set_text_style(
        &mut self,
        handle: ObjectHandle,
        style: TextStyle,
    ) -> Result<(), SurfaceError> {
        let object = self.find_mut(handle)?;
        match &mut object.content {
            Content::Text(text) => *text = style,
            Content::Image(_) => return Err(SurfaceError::NotText(handle)),
        }
        self.revision += 1;
        Ok(())
    }

    fn restack(&mut self, handle: ObjectHandle, order: StackOrder) -> Result<(), SurfaceError> {
        let index = self.index_of(handle)?;
        let last = self.objects.len() - 1;
        let target = match order {
            StackOrder::BringForward => (index + 1).min(last),
            StackOrder::SendBackward => index.saturating_sub(1),
            StackOrder::BringToFront => last,
            StackOrder::SendToBack => 0,
        };
        if target != index {
            let object = self.objects.remove(index);
            self.objects.insert(target, object);
            self.revision += 1;
        }
        Ok(())
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
        self.revision += 1;
    }

    fn schedule_render(&mut self, delay: Duration) {
        self.scheduled.push(delay);
    }

    fn render_revision(&self) -> u64 {
        self.revision
    }

    fn composite(&self) -> Result<RgbaImage, SurfaceError> {
        let [width, height] = self.size;
        if width == 0 || height == 0 {
            return Err(SurfaceError::EmptyCanvas { width, height });
        }
        let [r, g, b, a] = self.background_color.to_srgba_unmultiplied();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, a]));
        for object in self.background.iter().chain(self.objects.iter()) {
            draw_object(&mut canvas, object);
        }
        Ok(canvas)
    }

    fn object_at(&self, pos: Pos2) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .rev()
            .filter(|object| object.interactive)
            .find(|object| object.bounds().expand(self.style.padding).contains(pos))
            .map(|object| object.handle)
    }

    fn move_object(&mut self, handle: ObjectHandle, center: Pos2) -> Result<(), SurfaceError> {
        self.set_position(handle, center)?;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        Ok(())
    }

    fn select(&mut self, selection: Option<Selection>) {
        self.set_active(selection.clone());
        self.events.push(SurfaceEvent::SelectionChanged(selection));
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

fn draw_object(canvas: &mut RgbaImage, object: &RasterObject) {
    let bounds = object.bounds();
    let left = bounds.min.x.round() as i64;
    let top = bounds.min.y.round() as i64;
    match &object.content {
        Content::Image(image) => {
            let (w, h) = image.dimensions();
            for y in 0..h {
                for x in 0..w {
                    let sx = if object.style.flip_x { w - 1 - x } else { x };
                    let sy = if object.style.flip_y { h - 1 - y } else { y };
                    let src = *image.get_pixel(sx, sy);
                    blend_into(canvas, left + x as i64, top + y as i64, src, &object.style);
                }
            }
        }
        Content::Text(text) => {
            let Some(fill) = text.background else {
                return;
            };
            let [r, g, b, a] = fill.to_srgba_unmultiplied();
            let (w, h) = (bounds.width().round() as i64, bounds.height().round() as i64);
            for y in 0..h {
                for x in 0..w {
                    blend_into(canvas, left + x, top + y, Rgba([r, g, b, a]), &object.style);
                }
            }
        }
    }
}

fn blend_into(canvas: &mut RgbaImage, x: i64, y: i64, src: Rgba<u8>, style: &ObjectStyle) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = src.0[3] as f32 / 255.0 * style.opacity;
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let s = src.0[channel] as f32 / 255.0;
        let d = dst.0[channel] as f32 / 255.0;
        let mixed = blend_channel(style.blend, s, d);
        dst.0[channel] = ((d * (1.0 - alpha) + mixed * alpha) * 255.0).round() as u8;
    }
    let d_alpha = dst.0[3] as f32 / 255.0;
    dst.0[3] = ((alpha + d_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

/// Separable blend functions on normalized channels, source `s` over backdrop `d`
fn blend_channel(mode: BlendMode, s: f32, d: f32) -> f32 {
    let hard_light = |s: f32, d: f32| {
        if s <= 0.5 {
            2.0 * s * d
        } else {
            1.0 - 2.0 * (1.0 - s) * (1.0 - d)
        }
    };
    match mode {
        BlendMode::Normal => s,
        BlendMode::Multiply => s * d,
        BlendMode::Screen => s + d - s * d,
        BlendMode::Overlay => hard_light(d, s),
        BlendMode::Lighten => s.max(d),
        BlendMode::Darken => s.min(d),
        BlendMode::HardLight => hard_light(s, d),
        BlendMode::SoftLight => {
            if s <= 0.5 {
                d - (1.0 - 2.0 * s) * d * (1.0 - d)
            } else {
                let dd = if d <= 0.25 {
                    ((16.0 * d - 12.0) * d + 4.0) * d
                } else {
                    d.sqrt()
                };
                d + (2.0 * s - 1.0) * (dd - d)
            }
        }
        BlendMode::Difference => (s - d).abs(),
        BlendMode::Exclusion => s + d - 2.0 * s * d,
    }
}
