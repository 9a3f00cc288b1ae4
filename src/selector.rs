use crate::layer::LayerId;
use crate::registry::LayerRegistry;

/// Label of the "no selection" entry
pub const PLACEHOLDER_LABEL: &str = "- Select Layer -";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    /// `None` for the placeholder
    pub id: Option<LayerId>,
    pub label: String,
}

/// The layer dropdown: one option per layer sorted by id, behind a placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSelector {
    options: Vec<SelectorOption>,
    selected: Option<LayerId>,
}

impl LayerSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    /// Labels in display order, placeholder included
    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|option| option.label.as_str()).collect()
    }

    /// Rebuilds the options. The previous choice survives if its layer does,
    /// otherwise the selection follows the surface's active layer.
    pub fn rebuild(&mut self, registry: &LayerRegistry, active: Option<LayerId>) {
        let layers = registry.ordered_layers();
        self.options.clear();
        if layers.is_empty() {
            self.selected = None;
            return;
        }

        self.options.push(SelectorOption {
            id: None,
            label: PLACEHOLDER_LABEL.to_owned(),
        });
        self.options.extend(layers.iter().map(|entry| SelectorOption {
            id: Some(entry.id),
            label: entry.label(),
        }));

        let kept = self.selected.filter(|id| registry.contains(*id));
        if kept.is_none() {
            self.sync_with_active(registry, active);
        }
    }

    /// Mirror the surface's active object
    pub fn sync_with_active(&mut self, registry: &LayerRegistry, active: Option<LayerId>) {
        self.selected = active.filter(|id| registry.contains(*id));
    }

    /// User picked an option. Returns the layer to activate, `None` for the placeholder
    /// or an id that is no longer listed.
    pub fn choose(&mut self, id: Option<LayerId>) -> Option<LayerId> {
        let listed = id.filter(|id| self.options.iter().any(|option| option.id == Some(*id)));
        self.selected = listed;
        listed
    }
}
