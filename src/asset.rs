use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt as _;
use futures::future::BoxFuture;
use image::RgbaImage;
use reqwest::Client;

use crate::error::AssetError;

/// Turns an image reference from a payload into pixels
pub trait AssetLoader: Send + Sync {
    fn load(&self, reference: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>>;
}

/// Decodes `data:<mime>;base64,<data>` URLs without touching the network
pub fn decode_data_url(reference: &str) -> Result<RgbaImage, AssetError> {
    let rest = reference.strip_prefix("data:").ok_or(AssetError::MalformedDataUrl)?;
    let (header, data) = rest.split_once(',').ok_or(AssetError::MalformedDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(AssetError::MalformedDataUrl);
    }
    let bytes = STANDARD.decode(data.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Encodes PNG bytes as a `data:image/png;base64,` URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Loads data URLs in place and everything else over HTTP.
///
/// Relative references such as `/view?filename=...` are resolved against the
/// backend base URL.
#[derive(Debug, Clone)]
pub struct HttpAssetLoader {
    client: Client,
    base_url: String,
}

impl HttpAssetLoader {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
        }
    }
}

impl AssetLoader for HttpAssetLoader {
    fn load(&self, reference: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>> {
        if reference.starts_with("data:") {
            let decoded = decode_data_url(reference);
            return async move { decoded }.boxed();
        }
        if reference.trim().is_empty() {
            let err = AssetError::InvalidUrl(reference.to_string());
            return futures::future::ready(Err(err)).boxed();
        }

        let url = self.resolve(reference);
        let client = self.client.clone();
        async move {
            let response = client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AssetError::Status(status.as_u16()));
            }
            let bytes = response.bytes().await?;
            Ok(image::load_from_memory(&bytes)?.to_rgba8())
        }
        .boxed()
    }
}
