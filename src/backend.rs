use futures::FutureExt as _;
use futures::future::BoxFuture;
use reqwest::{Client, Response};
use serde::Serialize;

use crate::config::BackendConfig;
use crate::error::TransportError;
use crate::payload::{
    CanvasDataPayload, ExportRequest, GalleryListing, NodeId, PayloadResponse, SaveRequest,
    SaveResponse,
};

/// The server side of the canvas widget.
///
/// Every call is one-shot: no retries and no acknowledgement beyond the HTTP status.
pub trait CanvasBackend: Send + Sync {
    fn export(&self, request: ExportRequest) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Stores the image in the gallery, answering with the saved path if the server reports one
    fn save(
        &self,
        request: SaveRequest,
    ) -> BoxFuture<'static, Result<Option<String>, TransportError>>;

    fn fetch_payload(
        &self,
        node_id: &NodeId,
    ) -> BoxFuture<'static, Result<Option<CanvasDataPayload>, TransportError>>;

    fn list_gallery(&self) -> BoxFuture<'static, Result<Vec<String>, TransportError>>;
}

/// Talks to the canvas routes over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    prefix: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &BackendConfig) -> Self {
        let prefix = config.route_prefix.trim_end_matches('/');
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            prefix: if prefix.is_empty() || prefix.starts_with('/') {
                prefix.to_string()
            } else {
                format!("/{prefix}")
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}{prefix}/{name}`
    pub fn route(&self, name: &str) -> String {
        format!("{}{}/{}", self.base_url, self.prefix, name)
    }

    fn post_json<B: Serialize>(
        &self,
        name: &str,
        body: &B,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        let url = self.route(name);
        let request = self.client.post(&url).json(body);
        async move {
            let response = request.send().await.map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
            ensure_success(response, &url)
        }
        .boxed()
    }
}

/// Non-2xx answers are errors
pub(crate) fn ensure_success(response: Response, url: &str) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

impl CanvasBackend for HttpBackend {
    fn export(&self, request: ExportRequest) -> BoxFuture<'static, Result<(), TransportError>> {
        self.post_json("canvas_export", &request).map(|result| result.map(|_| ())).boxed()
    }

    fn save(
        &self,
        request: SaveRequest,
    ) -> BoxFuture<'static, Result<Option<String>, TransportError>> {
        let url = self.route("canvas_save");
        let sent = self.post_json("canvas_save", &request);
        async move {
            let response = sent.await?;
            let body: SaveResponse = response
                .json()
                .await
                .map_err(|source| TransportError::Request { url, source })?;
            Ok(body.path)
        }
        .boxed()
    }

    fn fetch_payload(
        &self,
        node_id: &NodeId,
    ) -> BoxFuture<'static, Result<Option<CanvasDataPayload>, TransportError>> {
        let url = self.route("canvas_payload");
        let request = self.client.get(&url).query(&[("node_id", node_id.as_str())]);
        async move {
            let response = request.send().await.map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
            let response = ensure_success(response, &url)?;
            let body: PayloadResponse = response
                .json()
                .await
                .map_err(|source| TransportError::Request { url, source })?;
            Ok(body.payload)
        }
        .boxed()
    }

    fn list_gallery(&self) -> BoxFuture<'static, Result<Vec<String>, TransportError>> {
        let url = self.route("canvas_list");
        let request = self.client.get(&url);
        async move {
            let response = request.send().await.map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
            let response = ensure_success(response, &url)?;
            let listing: GalleryListing = response
                .json()
                .await
                .map_err(|source| TransportError::Request { url, source })?;
            Ok(listing.files)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_join_base_and_prefix() {
        let backend = HttpBackend::new(&BackendConfig {
            base_url: "http://host:8188/".into(),
            route_prefix: "funcode/".into(),
        });
        assert_eq!(backend.route("canvas_export"), "http://host:8188/funcode/canvas_export");
        assert_eq!(backend.base_url(), "http://host:8188");
    }

    #[test]
    fn default_routes() {
        let backend = HttpBackend::new(&BackendConfig::default());
        assert_eq!(backend.route("canvas_list"), "http://127.0.0.1:8188/funcode/canvas_list");
    }

    #[test]
    fn empty_prefix_is_allowed() {
        let backend = HttpBackend::new(&BackendConfig {
            base_url: "http://host".into(),
            route_prefix: String::new(),
        });
        assert_eq!(backend.route("canvas_save"), "http://host/canvas_save");
    }
}
