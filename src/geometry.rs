use egui::{Pos2, Vec2, pos2};

/// How large the canvas is drawn inside its container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Fits content of `content_w` x `content_h` into a container, keeping the aspect ratio.
///
/// `scale = min((cw - margin) / content_w, (ch - margin) / content_h)`, clamped at zero.
/// Display edges are rounded to whole pixels.
pub fn compute_display_size(
    container_w: f32,
    container_h: f32,
    content_w: f32,
    content_h: f32,
    margin: f32,
) -> DisplaySize {
    if content_w <= 0.0 || content_h <= 0.0 {
        return DisplaySize {
            width: 0.0,
            height: 0.0,
            scale: 0.0,
        };
    }
    let scale = ((container_w - margin) / content_w)
        .min((container_h - margin) / content_h)
        .max(0.0);
    DisplaySize {
        width: (content_w * scale).round(),
        height: (content_h * scale).round(),
        scale,
    }
}

/// Content size is authoritative, display size is derived from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub content_width: u32,
    pub content_height: u32,
    pub display_width: f32,
    pub display_height: f32,
}

impl CanvasGeometry {
    pub fn scale(&self) -> f32 {
        if self.content_width == 0 {
            0.0
        } else {
            self.display_width / self.content_width as f32
        }
    }
}

/// Keeps the display size in step with content and container changes
#[derive(Debug, Clone)]
pub struct ScaleManager {
    content: [u32; 2],
    container: Option<Vec2>,
    margin: f32,
    display: DisplaySize,
}

impl ScaleManager {
    pub fn new(content_width: u32, content_height: u32, margin: f32) -> Self {
        let mut manager = Self {
            content: [content_width, content_height],
            container: None,
            margin,
            display: DisplaySize {
                width: content_width as f32,
                height: content_height as f32,
                scale: 1.0,
            },
        };
        manager.recompute();
        manager
    }

    /// Call whenever the container is laid out. Non-positive sizes are ignored.
    pub fn set_container_size(&mut self, width: f32, height: f32) -> bool {
        if !(width > 0.0 && height > 0.0) {
            return false;
        }
        let size = Vec2::new(width, height);
        if self.container == Some(size) {
            return false;
        }
        self.container = Some(size);
        self.recompute();
        true
    }

    /// Container derived from the host node's size when no layout measurement exists
    pub fn fit_node_size(
        &mut self,
        node_w: f32,
        node_h: f32,
        control_height: f32,
        padding: f32,
        min_available: f32,
    ) -> bool {
        let available_w = (node_w - padding).max(min_available);
        let available_h = (node_h - control_height - padding).max(min_available);
        self.set_container_size(available_w, available_h)
    }

    pub fn set_content_size(&mut self, width: u32, height: u32) {
        self.content = [width, height];
        self.recompute();
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn container(&self) -> Option<Vec2> {
        self.container
    }

    pub fn geometry(&self) -> CanvasGeometry {
        CanvasGeometry {
            content_width: self.content[0],
            content_height: self.content[1],
            display_width: self.display.width,
            display_height: self.display.height,
        }
    }

    fn recompute(&mut self) {
        let [w, h] = self.content;
        // Without a container the canvas is shown at its natural size
        self.display = match self.container {
            Some(container) => compute_display_size(
                container.x,
                container.y,
                w as f32,
                h as f32,
                self.margin,
            ),
            None => DisplaySize {
                width: w as f32,
                height: h as f32,
                scale: 1.0,
            },
        };
    }
}

/// Scales a position by the ratio between two canvas sizes
pub fn rescale_position(pos: Pos2, old: [u32; 2], new: [u32; 2]) -> Pos2 {
    if old[0] == 0 || old[1] == 0 {
        return pos;
    }
    pos2(
        pos.x * new[0] as f32 / old[0] as f32,
        pos.y * new[1] as f32 / old[1] as f32,
    )
}

pub fn canvas_center(size: [u32; 2]) -> Pos2 {
    pos2(size[0] as f32 / 2.0, size[1] as f32 / 2.0)
}
