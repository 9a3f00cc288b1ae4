use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt as _;
use futures::future::BoxFuture;
use log::{debug, error, info};

use crate::asset::png_data_url;
use crate::backend::CanvasBackend;
use crate::error::{CanvasError, SurfaceError};
use crate::payload::{ExportRequest, NodeId};
use crate::surface::RenderingSurface;

/// Serializes the composition and sends it to the backend.
///
/// Exports are fire-and-forget: one attempt, no coalescing, failures are logged.
/// Encoding happens in [`ExportChannel::prepare`] while the caller holds the
/// editor state; the network round-trip in [`ExportChannel::transmit`] must
/// run after that lock is released.
#[derive(Clone)]
pub struct ExportChannel {
    node_id: Option<NodeId>,
    backend: Arc<dyn CanvasBackend>,
    attempts: Arc<AtomicU64>,
}

/// An encoded composition waiting to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExport {
    pub request: ExportRequest,
}

/// The composition as a `data:image/png;base64,` URL
pub fn encode_composition(surface: &dyn RenderingSurface) -> Result<String, SurfaceError> {
    Ok(png_data_url(&surface.encode_png()?))
}

impl ExportChannel {
    pub fn new(node_id: Option<NodeId>, backend: Arc<dyn CanvasBackend>) -> Self {
        Self {
            node_id,
            backend,
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// How many exports were handed to the backend
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Encodes the surface. Nothing is prepared for an editor without a node.
    pub fn prepare(&self, surface: &dyn RenderingSurface) -> Option<PendingExport> {
        let Some(node_id) = self.node_id.clone() else {
            debug!("export skipped: editor is not bound to a node");
            return None;
        };
        match encode_composition(surface) {
            Ok(image_b64) => Some(PendingExport {
                request: ExportRequest { node_id, image_b64 },
            }),
            Err(err) => {
                error!("[{node_id}] export skipped, composition could not be encoded: {err}");
                None
            }
        }
    }

    /// Sends a prepared export; failures are logged and dropped
    pub fn transmit(&self, pending: PendingExport) -> BoxFuture<'static, ()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let node_id = pending.request.node_id.clone();
        let sent = self.backend.export(pending.request);
        async move {
            match sent.await {
                Ok(()) => info!("[{node_id}] canvas exported"),
                Err(err) => error!("[{node_id}] {}", CanvasError::ExportTransmission(err)),
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for ExportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportChannel")
            .field("node_id", &self.node_id)
            .field("attempts", &self.attempts())
            .finish()
    }
}
