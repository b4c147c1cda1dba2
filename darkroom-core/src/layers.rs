//! Layer manager: the ordered layer stack and the active-layer pointer.
//!
//! Index 0 is the bottom of the stack. Mutations tolerate stale ids by doing
//! nothing, and never push history on their own: callers commit explicitly so
//! a multi-step gesture becomes one undo step.

use serde::{Deserialize, Serialize};

use crate::layer::{DrawingPath, Layer, LayerId, LayerKind, LayerProps};

/// The serializable content of a layer manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    /// Layers, bottom first.
    pub layers: Vec<Layer>,
    /// Currently active layer.
    pub active: Option<LayerId>,
}

/// Owns every layer of a document.
#[derive(Debug, Clone, Default)]
pub struct LayerManager {
    stack: LayerStack,
    /// Bumped on every successful mutation; the canvas re-renders on change.
    revision: u64,
}

impl LayerManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Add a layer of the given kind on top of the stack.
    ///
    /// The layer becomes active only if its kind needs a drawing surface.
    pub fn add_layer(&mut self, kind: LayerKind, props: LayerProps) -> LayerId {
        let activate = kind.requires_drawing_surface();
        let mut layer = Layer::new(kind);
        layer.apply_props(props);
        let id = layer.id;
        tracing::debug!("Layer {id} added ({})", layer.kind.type_name());
        self.stack.layers.push(layer);
        if activate {
            self.stack.active = Some(id);
        }
        self.touch();
        id
    }

    /// Insert a fully built layer on top of the stack.
    ///
    /// Returns `None` if a layer with the same id already exists.
    pub fn insert_layer(&mut self, layer: Layer) -> Option<LayerId> {
        if self.index_of(layer.id).is_some() {
            return None;
        }
        let id = layer.id;
        self.stack.layers.push(layer);
        self.touch();
        Some(id)
    }

    /// Get a layer by ID.
    #[must_use]
    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.stack.layers.iter().find(|l| l.id == id)
    }

    pub(crate) fn get_layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.stack.layers.iter_mut().find(|l| l.id == id)
    }

    /// Position of a layer in the stack (0 = bottom).
    #[must_use]
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.stack.layers.iter().position(|l| l.id == id)
    }

    /// Merge `props` into a layer. Unknown ids are a no-op returning `false`.
    pub fn update_layer(&mut self, id: LayerId, props: LayerProps) -> bool {
        let Some(layer) = self.get_layer_mut(id) else {
            tracing::debug!("update_layer ignored, layer {id} not found");
            return false;
        };
        layer.apply_props(props);
        self.touch();
        true
    }

    /// Remove a layer. Clears the active pointer if it pointed there.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        let layer = self.stack.layers.remove(index);
        if self.stack.active == Some(id) {
            self.stack.active = None;
        }
        self.touch();
        Some(layer)
    }

    /// Move a layer to `new_index`, clamped to the stack bounds.
    pub fn reorder(&mut self, id: LayerId, new_index: usize) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let target = new_index.min(self.stack.layers.len() - 1);
        if target != index {
            let layer = self.stack.layers.remove(index);
            self.stack.layers.insert(target, layer);
            self.touch();
        }
        true
    }

    /// Copy a layer under a fresh id directly above the original.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let mut copy = self.stack.layers[index].clone();
        copy.id = LayerId::new();
        copy.name = format!("{} copy", copy.name);
        let new_id = copy.id;
        self.stack.layers.insert(index + 1, copy);
        self.touch();
        Some(new_id)
    }

    /// The active layer, if any.
    #[must_use]
    pub fn active_layer(&self) -> Option<&Layer> {
        self.stack.active.and_then(|id| self.get_layer(id))
    }

    /// The active layer ID, if any.
    #[must_use]
    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.stack.active
    }

    /// Set or clear the active layer. Unknown ids are ignored.
    pub fn set_active_layer(&mut self, id: Option<LayerId>) -> bool {
        if let Some(id) = id {
            if self.index_of(id).is_none() {
                return false;
            }
        }
        if self.stack.active != id {
            self.stack.active = id;
            self.touch();
        }
        true
    }

    /// All layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.stack.layers
    }

    /// First layer (from the bottom) matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&Layer) -> bool) -> Option<&Layer> {
        self.stack.layers.iter().find(|l| predicate(l))
    }

    /// Append a committed stroke to a drawing layer.
    pub(crate) fn append_path(&mut self, id: LayerId, path: DrawingPath) -> bool {
        let Some(layer) = self.get_layer_mut(id) else {
            return false;
        };
        let LayerKind::Drawing { paths } = &mut layer.kind else {
            return false;
        };
        paths.push(path);
        self.touch();
        true
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.layers.len()
    }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.layers.is_empty()
    }

    /// Mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Copy of the full stack.
    #[must_use]
    pub fn snapshot(&self) -> LayerStack {
        self.stack.clone()
    }

    /// Atomically replace the whole stack.
    pub fn restore(&mut self, stack: LayerStack) {
        self.stack = stack;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{AdjustmentParams, BlendMode};

    fn adjustment() -> LayerKind {
        LayerKind::Adjustment {
            params: AdjustmentParams::default(),
        }
    }

    #[test]
    fn test_add_appends_on_top_without_activating() {
        let mut layers = LayerManager::new();
        let a = layers.add_layer(adjustment(), LayerProps::named("a"));
        let b = layers.add_layer(adjustment(), LayerProps::named("b"));

        assert_eq!(layers.index_of(a), Some(0));
        assert_eq!(layers.index_of(b), Some(1));
        assert!(layers.active_layer().is_none());
    }

    #[test]
    fn test_drawing_layer_is_activated() {
        let mut layers = LayerManager::new();
        let id = layers.add_layer(LayerKind::drawing(), LayerProps::default());
        assert_eq!(layers.active_layer_id(), Some(id));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut layers = LayerManager::new();
        layers.add_layer(adjustment(), LayerProps::default());
        let revision = layers.revision();

        assert!(!layers.update_layer(LayerId::new(), LayerProps::named("x")));
        assert_eq!(layers.revision(), revision);
    }

    #[test]
    fn test_update_bumps_revision() {
        let mut layers = LayerManager::new();
        let id = layers.add_layer(adjustment(), LayerProps::default());
        let revision = layers.revision();

        assert!(layers.update_layer(
            id,
            LayerProps {
                blend_mode: Some(BlendMode::Multiply),
                ..LayerProps::default()
            }
        ));
        assert!(layers.revision() > revision);
        assert_eq!(
            layers.get_layer(id).map(|l| l.blend_mode),
            Some(BlendMode::Multiply)
        );
    }

    #[test]
    fn test_reorder_clamps_index() {
        let mut layers = LayerManager::new();
        let a = layers.add_layer(adjustment(), LayerProps::default());
        let b = layers.add_layer(adjustment(), LayerProps::default());

        assert!(layers.reorder(a, 99));
        assert_eq!(layers.index_of(a), Some(1));
        assert_eq!(layers.index_of(b), Some(0));
        assert!(!layers.reorder(LayerId::new(), 0));
    }

    #[test]
    fn test_remove_clears_active() {
        let mut layers = LayerManager::new();
        let id = layers.add_layer(LayerKind::drawing(), LayerProps::default());
        assert!(layers.remove_layer(id).is_some());
        assert!(layers.active_layer_id().is_none());
        assert!(layers.remove_layer(id).is_none());
    }

    #[test]
    fn test_set_active_rejects_unknown() {
        let mut layers = LayerManager::new();
        let id = layers.add_layer(adjustment(), LayerProps::default());
        assert!(!layers.set_active_layer(Some(LayerId::new())));
        assert!(layers.set_active_layer(Some(id)));
        assert_eq!(layers.active_layer_id(), Some(id));
    }

    #[test]
    fn test_duplicate_inserts_above_with_new_id() {
        let mut layers = LayerManager::new();
        let a = layers.add_layer(adjustment(), LayerProps::named("base"));
        layers.add_layer(adjustment(), LayerProps::default());

        let copy = layers.duplicate_layer(a).expect("duplicate");
        assert_ne!(copy, a);
        assert_eq!(layers.index_of(copy), Some(1));
        assert_eq!(
            layers.get_layer(copy).map(|l| l.name.as_str()),
            Some("base copy")
        );
    }

    #[test]
    fn test_restore_replaces_stack() {
        let mut layers = LayerManager::new();
        layers.add_layer(adjustment(), LayerProps::default());
        let saved = layers.snapshot();
        layers.add_layer(LayerKind::drawing(), LayerProps::default());

        layers.restore(saved.clone());
        assert_eq!(layers.snapshot(), saved);
        assert_eq!(layers.len(), 1);
    }
}
