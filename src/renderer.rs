use egui::{Color32, ColorImage, Context, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use image::RgbaImage;
use log::{debug, warn};

use crate::editor::CanvasEditor;
use crate::geometry::CanvasGeometry;
use crate::surface::{RenderingSurface, Selection};

/// Converts a composited frame into something egui can upload
pub fn to_color_image(image: &RgbaImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// Rectangle the canvas occupies when centered in `available`
pub fn display_rect(available: Rect, geometry: &CanvasGeometry) -> Rect {
    Rect::from_center_size(
        available.center(),
        Vec2::new(geometry.display_width, geometry.display_height),
    )
}

/// Maps a screen position inside `rect` back to canvas content coordinates
pub fn screen_to_content(rect: Rect, geometry: &CanvasGeometry, pos: Pos2) -> Option<Pos2> {
    let scale = geometry.scale();
    if scale <= 0.0 || !rect.contains(pos) {
        return None;
    }
    let local = pos - rect.min;
    Some(Pos2::new(local.x / scale, local.y / scale))
}

/// Draws an editor's surface into an egui layout.
///
/// The composite is uploaded once per surface revision; frames in between
/// reuse the cached texture.
pub struct CanvasView {
    texture: Option<TextureHandle>,
    /// Surface revision the cached texture was built from
    revision: Option<u64>,
    uploads: u64,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasView {
    pub fn new() -> Self {
        Self {
            texture: None,
            revision: None,
            uploads: 0,
        }
    }

    /// How many times the composite has been uploaded
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    /// Returns the cached texture, re-compositing when the surface changed
    pub fn texture(&mut self, ctx: &Context, editor: &CanvasEditor) -> Option<&TextureHandle> {
        let revision = editor.render_revision();
        if self.revision != Some(revision) || self.texture.is_none() {
            match editor.composite() {
                Ok(frame) => {
                    let image = to_color_image(&frame);
                    match &mut self.texture {
                        Some(handle) => handle.set(image, TextureOptions::LINEAR),
                        None => {
                            self.texture =
                                Some(ctx.load_texture("canvas", image, TextureOptions::LINEAR));
                        }
                    }
                    self.revision = Some(revision);
                    self.uploads += 1;
                    debug!("uploaded canvas revision {revision}");
                }
                Err(err) => {
                    warn!("could not composite canvas: {err}");
                    return None;
                }
            }
        }
        self.texture.as_ref()
    }

    /// Lays out and paints the canvas, centered in the available space.
    ///
    /// Clicks select the object under the pointer and drags move it. Both go
    /// through the surface so they show up in its events; feed those back with
    /// [`crate::bridge::pump_surface_events`].
    pub fn show(&mut self, ui: &mut egui::Ui, editor: &CanvasEditor) -> egui::Response {
        let available = ui.available_size();
        editor.set_container_size(available.x, available.y);
        let geometry = editor.geometry();

        let (outer, response) = ui.allocate_exact_size(available, Sense::click_and_drag());
        let rect = display_rect(outer, &geometry);

        if response.clicked() || response.drag_started() {
            if let Some(pos) = response
                .interact_pointer_pos()
                .and_then(|pos| screen_to_content(rect, &geometry, pos))
            {
                editor.with_surface_mut(|surface| {
                    let hit = surface.object_at(pos);
                    surface.select(hit.map(Selection::Single));
                });
            }
        }
        if response.dragged() {
            let scale = geometry.scale();
            if scale > 0.0 {
                let delta = response.drag_delta() / scale;
                editor.with_surface_mut(|surface| drag_active(surface, delta));
            }
        }

        let painter = ui.painter_at(outer);
        if let Some(texture) = self.texture(ui.ctx(), editor) {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        } else {
            painter.rect_filled(rect, 0.0, editor.background_color());
        }
        response
    }
}

/// Moves the single active object by `delta` content pixels
pub fn drag_active(surface: &mut dyn RenderingSurface, delta: Vec2) -> bool {
    let Some(handle) = surface.active().and_then(|selection| selection.single()) else {
        return false;
    };
    let Some(center) = surface.position(handle) else {
        return false;
    };
    match surface.move_object(handle, center + delta) {
        Ok(()) => true,
        Err(err) => {
            warn!("drag failed: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use image::Rgba;

    fn geometry() -> CanvasGeometry {
        CanvasGeometry {
            content_width: 512,
            content_height: 256,
            display_width: 256.0,
            display_height: 128.0,
        }
    }

    #[test]
    fn color_image_keeps_size_and_pixels() {
        let frame = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let image = to_color_image(&frame);
        assert_eq!(image.size, [3, 2]);
        assert_eq!(image.pixels[0], Color32::from_rgb(10, 20, 30));
    }

    #[test]
    fn display_rect_is_centered() {
        let available = Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 200.0));
        let rect = display_rect(available, &geometry());
        assert_eq!(rect.min, pos2(72.0, 36.0));
        assert_eq!(rect.size(), Vec2::new(256.0, 128.0));
    }

    #[test]
    fn screen_positions_map_to_content() {
        let rect = Rect::from_min_size(pos2(72.0, 36.0), Vec2::new(256.0, 128.0));
        let content = screen_to_content(rect, &geometry(), pos2(72.0 + 128.0, 36.0 + 64.0));
        assert_eq!(content, Some(pos2(256.0, 128.0)));
        assert_eq!(screen_to_content(rect, &geometry(), pos2(0.0, 0.0)), None);
    }

    #[test]
    fn drag_moves_only_the_active_object() {
        use crate::surface::{RasterSurface, SurfaceEvent, SurfaceStyle};

        let mut surface = RasterSurface::new(100, 100, SurfaceStyle::default());
        assert!(!drag_active(&mut surface, Vec2::new(5.0, 0.0)));

        let handle = surface.add_image(RgbaImage::new(4, 4), pos2(50.0, 50.0), true);
        surface.select(Some(Selection::Single(handle)));
        surface.drain_events();

        assert!(drag_active(&mut surface, Vec2::new(5.0, -10.0)));
        assert_eq!(surface.position(handle), Some(pos2(55.0, 40.0)));
        assert_eq!(surface.drain_events(), vec![SurfaceEvent::ObjectModified(handle)]);
    }
}
