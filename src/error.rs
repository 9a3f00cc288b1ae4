use thiserror::Error;

use crate::layer::LayerId;
use crate::surface::ObjectHandle;

/// Errors raised by the layer registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The id is already bound to a live layer
    #[error("layer {0} is already registered")]
    DuplicateId(LayerId),
    /// No live layer carries the id
    #[error("layer {0} not found")]
    NotFound(LayerId),
    /// Every layer id up to `u32::MAX` has been handed out or reserved
    #[error("no layer ids left to allocate")]
    Exhausted,
}

/// Errors raised by a rendering surface
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectHandle),
    #[error("object {0} is not a text object")]
    NotText(ObjectHandle),
    #[error("canvas has no area ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("failed to encode composition: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors raised while loading a single image asset
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("malformed data url")]
    MalformedDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid asset url `{0}`")]
    InvalidUrl(String),
    #[error("fetching asset failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("asset request answered with status {0}")]
    Status(u16),
    #[error("{0}")]
    Unavailable(String),
}

/// Errors raised by a network round-trip to the backend
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
    #[error("{0}")]
    Rejected(String),
}

/// Errors that can occur while loading editor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid color `{0}`, expected #rrggbb")]
    InvalidColor(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Top-level error taxonomy of the canvas editor.
///
/// None of these abort an enclosing operation: asset failures drop one entry,
/// transmission and trigger failures are logged, identity mismatches drop the notification.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("asset `{reference}` could not be loaded: {source}")]
    AssetLoad {
        reference: String,
        #[source]
        source: AssetError,
    },
    #[error("export transmission failed: {0}")]
    ExportTransmission(#[source] TransportError),
    #[error("reload trigger failed: {0}")]
    Trigger(#[source] TransportError),
    #[error("no live editor for node {0}")]
    IdentityMismatch(String),
    #[error("no object to apply the edit to")]
    NoTarget,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid canvas payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type CanvasResult<T> = Result<T, CanvasError>;
