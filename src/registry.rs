use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::event::{BackgroundEvent, EditorEvent, EventBus, EventHandler, LayerEvent};
use crate::layer::{BackgroundSlot, LayerEntry, LayerId, LayerKind};
use crate::surface::ObjectHandle;

/// Owns the mapping from layer ids to surface objects plus the background slot.
///
/// Every mutating call bumps the revision and emits an [`EditorEvent`] so the
/// layer selector can follow along. The registry never exports on its own.
#[derive(Debug)]
pub struct LayerRegistry {
    entries: BTreeMap<LayerId, LayerEntry>,
    background: Option<BackgroundSlot>,
    /// Next id handed out by `allocate_id`; only ever grows. Wider than a
    /// layer id so reserving `u32::MAX` cannot overflow.
    next_id: u64,
    revision: u64,
    events: EventBus,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            background: None,
            next_id: 1,
            revision: 0,
            events: EventBus::new(),
        }
    }

    /// Hands out a fresh id, strictly greater than every id seen so far.
    ///
    /// Fails once the id space is used up; the counter is left untouched.
    pub fn allocate_id(&mut self) -> Result<LayerId, RegistryError> {
        let mut candidate = self.next_id;
        loop {
            let id = u32::try_from(candidate)
                .map(LayerId)
                .map_err(|_| RegistryError::Exhausted)?;
            if !self.entries.contains_key(&id) {
                self.next_id = candidate + 1;
                return Ok(id);
            }
            candidate += 1;
        }
    }

    /// Peek at the id the next `allocate_id` call starts from, `None` when exhausted
    pub fn next_id(&self) -> Option<LayerId> {
        u32::try_from(self.next_id).ok().map(LayerId)
    }

    /// Moves the allocation counter past an externally supplied id.
    pub fn reserve(&mut self, id: LayerId) {
        self.next_id = self.next_id.max(u64::from(id.0) + 1);
    }

    pub fn insert(
        &mut self,
        id: LayerId,
        kind: LayerKind,
        handle: ObjectHandle,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.reserve(id);
        self.entries.insert(id, LayerEntry::new(id, kind, handle));
        self.touch(EditorEvent::LayerChanged(LayerEvent::Added { id, kind }));
        Ok(())
    }

    /// Detaches a layer and hands back its surface object
    pub fn remove(&mut self, id: LayerId) -> Result<ObjectHandle, RegistryError> {
        let entry = self.entries.remove(&id).ok_or(RegistryError::NotFound(id))?;
        self.touch(EditorEvent::LayerChanged(LayerEvent::Removed { id }));
        Ok(entry.handle)
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Reverse lookup from a surface object to its layer
    pub fn find_by_handle(&self, handle: ObjectHandle) -> Option<&LayerEntry> {
        self.entries.values().find(|entry| entry.handle == handle)
    }

    /// Layers sorted by id. The background is never part of this list.
    pub fn ordered_layers(&self) -> Vec<&LayerEntry> {
        self.entries.values().collect()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.entries.keys().copied().collect()
    }

    pub fn layer_count(&self) -> usize {
        self.entries.len()
    }

    /// True when there is neither a layer nor a background
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.background.is_none()
    }

    pub fn background(&self) -> Option<&BackgroundSlot> {
        self.background.as_ref()
    }

    pub fn is_background(&self, handle: ObjectHandle) -> bool {
        self.background.is_some_and(|slot| slot.handle == handle)
    }

    /// Installs a background, returning the one it replaced
    pub fn set_background(&mut self, slot: BackgroundSlot) -> Option<BackgroundSlot> {
        let previous = self.background.replace(slot);
        self.touch(EditorEvent::BackgroundChanged(BackgroundEvent::Installed {
            natural_size: slot.natural_size,
        }));
        previous
    }

    pub fn take_background(&mut self) -> Option<BackgroundSlot> {
        let previous = self.background.take();
        if previous.is_some() {
            self.touch(EditorEvent::BackgroundChanged(BackgroundEvent::Cleared));
        }
        previous
    }

    /// Drops every layer but keeps the background. Returns the detached handles.
    pub fn clear_layers(&mut self) -> Vec<ObjectHandle> {
        let ids: Vec<LayerId> = self.entries.keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| self.remove(id).ok())
            .collect()
    }

    /// Drops every layer and the background. The allocation counter is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.background = None;
        self.touch(EditorEvent::RegistryCleared);
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.events.subscribe(handler);
    }

    /// Broadcast an editor-level event through the registry's bus
    pub fn notify(&self, event: EditorEvent) {
        self.events.emit(event);
    }

    fn touch(&mut self, event: EditorEvent) {
        self.revision += 1;
        self.events.emit(event);
    }
}
