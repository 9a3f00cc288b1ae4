use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of the graph node an editor is bound to.
///
/// Hosts send node ids as numbers or strings; both deserialize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Int(int) => Self(int.to_string()),
            Raw::Float(float) if float.fract() == 0.0 => Self((float as i64).to_string()),
            Raw::Float(float) => Self(float.to_string()),
        })
    }
}

/// Explicit size attached to a background or layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both edges are finite and positive
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Rounded canvas dimensions, or `None` when the size is unusable
    pub fn to_dimensions(&self) -> Option<[u32; 2]> {
        self.is_valid()
            .then(|| [self.width.round().max(1.0) as u32, self.height.round().max(1.0) as u32])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// URL or data URL of the image
    #[serde(rename = "image")]
    pub image_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    /// Zero means "allocate a fresh id"
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "image", default)]
    pub image_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
}

/// What the backend believes the canvas should show
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasDataPayload {
    #[serde(default)]
    pub background: Option<BackgroundData>,
    /// Order is advisory, presentation sorts by id
    #[serde(default)]
    pub layers: Vec<LayerData>,
}

impl CanvasDataPayload {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Digest of the canonical serialization. Equal payloads share a fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        // Serializing plain structs cannot fail; an empty buffer still yields a stable digest
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        Fingerprint(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.layers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for logs
        f.write_str(self.0.get(..12).unwrap_or(&self.0))
    }
}

/// Inbound push event from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub node_id: NodeId,
    #[serde(default)]
    pub canvas_data: Option<CanvasDataPayload>,
}

/// Body of `canvas_export`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub node_id: NodeId,
    pub image_b64: String,
}

/// Body of `canvas_save`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub image_b64: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryListing {
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadResponse {
    #[serde(default)]
    pub payload: Option<CanvasDataPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "background": {
            "id": 0,
            "image": "/view?filename=bg.png",
            "size": {"width": 640, "height": 480}
        },
        "layers": [
            {"id": 5, "image": "/view?filename=a.png", "size": {"height": 10, "width": 20}},
            {"id": 2, "image": "/view?filename=b.png"}
        ]
    }"#;

    #[test]
    fn parses_the_wire_shape() {
        let payload = CanvasDataPayload::from_json(SAMPLE).unwrap();
        let background = payload.background.as_ref().unwrap();
        assert_eq!(background.image_ref, "/view?filename=bg.png");
        assert_eq!(background.size.unwrap().to_dimensions(), Some([640, 480]));
        assert_eq!(payload.layers[0].id, 5);
        assert_eq!(payload.layers[1].size, None);
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = CanvasDataPayload::from_json(SAMPLE).unwrap();
        let b = CanvasDataPayload::from_json(SAMPLE).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = b.clone();
        c.layers[1].id = 3;
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn null_background_and_missing_layers() {
        let payload = CanvasDataPayload::from_json(r#"{"background": null}"#).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn node_ids_accept_numbers_and_strings() {
        let numeric: PushNotification = serde_json::from_str(r#"{"node_id": 12}"#).unwrap();
        let text: PushNotification =
            serde_json::from_str(r#"{"node_id": "12", "canvas_data": null}"#).unwrap();
        assert_eq!(numeric.node_id, NodeId::from(12));
        assert_eq!(numeric, text);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!(!ImageSize::new(0.0, 10.0).is_valid());
        assert!(!ImageSize::new(f32::NAN, 10.0).is_valid());
        assert_eq!(ImageSize::new(-1.0, 10.0).to_dimensions(), None);
    }

    #[test]
    fn export_body_uses_snake_case_keys() {
        let body = serde_json::to_value(ExportRequest {
            node_id: NodeId::new("7"),
            image_b64: "data:image/png;base64,AA==".into(),
        })
        .unwrap();
        assert_eq!(body["node_id"], "7");
        assert_eq!(body["image_b64"], "data:image/png;base64,AA==");
    }
}
