use log::debug;
use reqwest::Url;

use crate::payload::{BackgroundData, CanvasDataPayload, LayerData};

/// File extensions a loader widget value must end with to count as an image
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "bmp", "gif", "tiff"];

/// A graph node that can feed an image into the canvas data node
pub trait ImageSource: Send + Sync {
    fn has_image_output(&self) -> bool;

    /// Input-folder path of the image the node would load, e.g. `sub/cat.png`
    fn image_reference(&self) -> Option<String>;
}

/// The host's view of the inputs wired into this canvas
pub trait GraphInputs: Send + Sync {
    /// A payload built from the upstream nodes, `None` when none yields an image
    fn scan(&self) -> Option<CanvasDataPayload>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetValue {
    pub name: String,
    pub value: String,
}

/// A loader node whose widgets hold a file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadImageNode {
    pub widgets: Vec<WidgetValue>,
}

impl LoadImageNode {
    pub fn with_file(file: &str) -> Self {
        Self {
            widgets: vec![WidgetValue {
                name: "image".to_owned(),
                value: file.to_owned(),
            }],
        }
    }
}

pub fn has_image_extension(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
}

impl ImageSource for LoadImageNode {
    fn has_image_output(&self) -> bool {
        true
    }

    fn image_reference(&self) -> Option<String> {
        self.widgets
            .iter()
            .find(|widget| has_image_extension(&widget.value))
            .map(|widget| widget.value.clone())
    }
}

/// One named input slot of the canvas data node
pub struct GraphInput {
    pub name: String,
    pub source: Option<Box<dyn ImageSource>>,
}

impl GraphInput {
    pub fn linked(name: &str, source: impl ImageSource + 'static) -> Self {
        Self {
            name: name.to_owned(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unlinked(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            source: None,
        }
    }

    fn image_reference(&self) -> Option<String> {
        self.source
            .as_ref()
            .filter(|source| source.has_image_output())
            .and_then(|source| source.image_reference())
    }
}

/// The node collecting a background plus numbered overlays for the canvas
#[derive(Default)]
pub struct CanvasDataNode {
    pub inputs: Vec<GraphInput>,
}

impl CanvasDataNode {
    pub fn new(inputs: Vec<GraphInput>) -> Self {
        Self { inputs }
    }
}

impl GraphInputs for CanvasDataNode {
    fn scan(&self) -> Option<CanvasDataPayload> {
        scan_canvas_inputs(self)
    }
}

/// Layer id of an overlay input: `overlay3`, or the older `overlay_3`
pub fn parse_overlay_slot(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("overlay")?;
    let digits = rest.strip_prefix('_').unwrap_or(rest);
    digits.parse().ok()
}

/// Host URL serving an input-folder file: `/view?filename=..&type=input&subfolder=..`
pub fn view_url(path: &str) -> String {
    let (subfolder, filename) = path.rsplit_once('/').unwrap_or(("", path));
    match Url::parse_with_params(
        "http://host/view",
        &[("filename", filename), ("type", "input"), ("subfolder", subfolder)],
    ) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => format!("/view?filename={filename}&type=input&subfolder={subfolder}"),
    }
}

/// Builds a payload from whatever the canvas data node's inputs point at
pub fn scan_canvas_inputs(node: &CanvasDataNode) -> Option<CanvasDataPayload> {
    let mut payload = CanvasDataPayload::default();

    if let Some(reference) = node
        .inputs
        .iter()
        .find(|input| input.name == "bg_image")
        .and_then(GraphInput::image_reference)
    {
        payload.background = Some(BackgroundData {
            id: Some(0),
            image_ref: view_url(&reference),
            size: None,
        });
    }

    for input in &node.inputs {
        let Some(id) = parse_overlay_slot(&input.name) else {
            continue;
        };
        if let Some(reference) = input.image_reference() {
            payload.layers.push(LayerData {
                id,
                image_ref: view_url(&reference),
                size: None,
            });
        }
    }
    payload.layers.sort_by_key(|layer| layer.id);

    debug!(
        "graph scan found background: {}, overlays: {}",
        payload.background.is_some(),
        payload.layers.len()
    );
    (!payload.is_empty()).then_some(payload)
}
