//! Filter engine: id-addressed pure pixel transforms applied per layer.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::filters;
use crate::layer::Layer;
use crate::pixel::PixelBuffer;

/// Named numeric filter parameters.
///
/// Ordered so serialized snapshots are byte-stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, f32>);

impl FilterParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f32) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Set a parameter.
    pub fn set(&mut self, name: impl Into<String>, value: f32) {
        self.0.insert(name.into(), value);
    }

    /// Read a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    /// Read a parameter or fall back to `default`.
    #[must_use]
    pub fn get_or(&self, name: &str, default: f32) -> f32 {
        self.get(name).unwrap_or(default)
    }

    /// Whether no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A filter chosen for one layer, with concrete parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilter {
    /// Registered filter id.
    pub id: String,
    /// Parameters for this application.
    #[serde(default)]
    pub params: FilterParams,
}

impl AppliedFilter {
    /// Filter with default parameters.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: FilterParams::new(),
        }
    }

    /// Builder-style parameter setter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.params.set(name, value);
        self
    }
}

/// Signature every filter implements. Must be pure.
pub type FilterFn = fn(&PixelBuffer, &FilterParams) -> PixelBuffer;

/// A registered filter.
#[derive(Debug, Clone)]
pub struct FilterDefinition {
    /// Stable id referenced by [`AppliedFilter::id`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// The transform.
    pub apply: FilterFn,
}

impl FilterDefinition {
    /// Create a definition.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, apply: FilterFn) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            apply,
        }
    }
}

/// A named, reusable list of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Filters in application order.
    pub filters: Vec<AppliedFilter>,
}

/// Presets shipped with the engine.
#[must_use]
pub fn builtin_presets() -> Vec<FilterPreset> {
    vec![
        FilterPreset {
            id: "noir".to_string(),
            name: "Noir".to_string(),
            filters: vec![
                AppliedFilter::new("grayscale"),
                AppliedFilter::new("contrast").with_param("amount", 0.4),
            ],
        },
        FilterPreset {
            id: "vivid".to_string(),
            name: "Vivid".to_string(),
            filters: vec![
                AppliedFilter::new("saturate").with_param("amount", 0.5),
                AppliedFilter::new("contrast").with_param("amount", 0.15),
            ],
        },
        FilterPreset {
            id: "soft".to_string(),
            name: "Soft".to_string(),
            filters: vec![
                AppliedFilter::new("blur").with_param("radius", 1.0),
                AppliedFilter::new("brighten").with_param("amount", 0.05),
            ],
        },
    ]
}

/// Filter definitions by id.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    definitions: HashMap<String, FilterDefinition>,
}

impl FilterRegistry {
    /// Registry with no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every builtin filter.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for definition in filters::builtins() {
            registry.register(definition);
        }
        registry
    }

    /// Keep only the listed ids. An empty list keeps everything.
    #[must_use]
    pub fn restricted_to(mut self, ids: &[String]) -> Self {
        if !ids.is_empty() {
            self.definitions.retain(|id, _| ids.contains(id));
        }
        self
    }

    /// Register a definition, returning the one it replaced.
    pub fn register(&mut self, definition: FilterDefinition) -> Option<FilterDefinition> {
        self.definitions.insert(definition.id.clone(), definition)
    }

    /// Look up a definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FilterDefinition> {
        self.definitions.get(id)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Apply a layer's filters in list order.
    #[must_use]
    pub fn apply(&self, layer: &Layer, pixels: PixelBuffer) -> PixelBuffer {
        self.apply_filters(&layer.filters, pixels)
    }

    /// Apply `filters` left to right. Unknown ids are skipped.
    #[must_use]
    pub fn apply_filters(&self, filters: &[AppliedFilter], pixels: PixelBuffer) -> PixelBuffer {
        filters.iter().fold(pixels, |acc, applied| {
            match self.definitions.get(&applied.id) {
                Some(definition) => (definition.apply)(&acc, &applied.params),
                None => {
                    tracing::warn!("Skipping unknown filter: {}", applied.id);
                    acc
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgba;

    fn gradient() -> PixelBuffer {
        let mut buf = PixelBuffer::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                let v = if x < 8 { 0 } else { 255 };
                buf.put(x, y, Rgba::new(v, v, v, 255));
            }
        }
        buf
    }

    #[test]
    fn test_unknown_filter_is_skipped() {
        let registry = FilterRegistry::with_builtins();
        let input = gradient();
        let out = registry.apply_filters(&[AppliedFilter::new("does-not-exist")], input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn test_blur_sharpen_order_matters() {
        let registry = FilterRegistry::with_builtins();
        let blur = AppliedFilter::new("blur").with_param("radius", 1.5);
        let sharpen = AppliedFilter::new("sharpen").with_param("amount", 1.0);

        let a = registry.apply_filters(&[blur.clone(), sharpen.clone()], gradient());
        let b = registry.apply_filters(&[sharpen, blur], gradient());
        assert_ne!(a, b);
    }

    #[test]
    fn test_restricted_registry() {
        let registry = FilterRegistry::with_builtins().restricted_to(&["invert".to_string()]);
        assert_eq!(registry.ids(), vec!["invert"]);
    }

    #[test]
    fn test_builtin_presets_reference_registered_filters() {
        let registry = FilterRegistry::with_builtins();
        for preset in builtin_presets() {
            for filter in &preset.filters {
                assert!(registry.contains(&filter.id), "{} missing", filter.id);
            }
        }
    }

    #[test]
    fn test_params_serialize_in_key_order() {
        let params = FilterParams::new().with("b", 1.0).with("a", 2.0);
        let json = serde_json::to_string(&params).expect("serialize");
        assert_eq!(json, r#"{"a":2.0,"b":1.0}"#);
    }
}
