use egui::Key;
use log::debug;

use crate::edit::LocalEdit;
use crate::editor::CanvasEditor;
use crate::surface::SurfaceEvent;

/// Feeds what happened on the surface back into the editor.
///
/// A modified object is rendered and exported, a selection change moves the
/// layer dropdown. Returns how many events were handled.
pub async fn pump_surface_events(editor: &CanvasEditor) -> usize {
    let events = editor.with_surface_mut(|surface| surface.drain_events());
    let count = events.len();
    for event in events {
        match event {
            SurfaceEvent::ObjectModified(handle) => {
                // Errors are logged by the editor; the export still happens
                let _ = editor.apply_local_edit(LocalEdit::ObjectModified(handle)).await;
            }
            SurfaceEvent::SelectionChanged(_) => editor.sync_selector(),
        }
    }
    count
}

/// Delete and Backspace remove the active layer unless a text field has focus.
/// Returns whether the key was consumed.
pub async fn handle_key(editor: &CanvasEditor, key: Key, from_text_input: bool) -> bool {
    if from_text_input || !matches!(key, Key::Delete | Key::Backspace) {
        return false;
    }
    let has_layer = editor.has_active_layer();
    if !has_layer {
        return false;
    }
    match editor.apply_local_edit(LocalEdit::RemoveActive).await {
        Ok(outcome) => {
            debug!("delete key removed layers {:?}", outcome.removed);
            true
        }
        Err(_) => false,
    }
}
