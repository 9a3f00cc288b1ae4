use std::collections::HashMap;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::editor::CanvasEditor;
use crate::error::{CanvasError, CanvasResult};
use crate::payload::{NodeId, PushNotification};

/// Live editors keyed by the node they are bound to.
///
/// Push notifications are routed through here; one for a node without a
/// live editor is dropped.
#[derive(Default)]
pub struct EditorInstances {
    editors: Mutex<HashMap<NodeId, CanvasEditor>>,
}

impl EditorInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an editor to its node, replacing any previous one.
    /// Editors without a node id cannot receive pushes and are not tracked.
    pub fn attach(&self, editor: CanvasEditor) -> Option<CanvasEditor> {
        let Some(node_id) = editor.node_id().cloned() else {
            debug!("not tracking an editor without node id");
            return None;
        };
        info!("[{node_id}] editor attached");
        self.editors.lock().insert(node_id, editor)
    }

    pub fn detach(&self, node_id: &NodeId) -> Option<CanvasEditor> {
        let removed = self.editors.lock().remove(node_id);
        if removed.is_some() {
            info!("[{node_id}] editor detached");
        }
        removed
    }

    pub fn get(&self, node_id: &NodeId) -> Option<CanvasEditor> {
        self.editors.lock().get(node_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.editors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.lock().is_empty()
    }

    /// Routes a push notification to its editor
    pub async fn dispatch(&self, notification: PushNotification) -> CanvasResult<()> {
        let Some(editor) = self.get(&notification.node_id) else {
            let err = CanvasError::IdentityMismatch(notification.node_id.to_string());
            warn!("dropping push: {err}");
            return Err(err);
        };
        editor.handle_push(notification).await
    }

    /// Parses and routes a raw `funcode_canvas_update` event body
    pub async fn dispatch_json(&self, body: &str) -> CanvasResult<()> {
        let notification: PushNotification = serde_json::from_str(body)?;
        self.dispatch(notification).await
    }
}
