//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::EditorResult;
use crate::history::DEFAULT_MAX_HISTORY_STEPS;
use crate::tool::ToolKind;

/// A named crop aspect ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPreset {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Width / height, or `None` for a free crop.
    #[serde(default)]
    pub aspect_ratio: Option<f32>,
}

impl CropPreset {
    /// Create a preset.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, aspect_ratio: Option<f32>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aspect_ratio,
        }
    }
}

/// Crop presets shipped with the editor.
#[must_use]
pub fn default_crop_presets() -> Vec<CropPreset> {
    vec![
        CropPreset::new("free", "Free", None),
        CropPreset::new("square", "1:1", Some(1.0)),
        CropPreset::new("4:3", "4:3", Some(4.0 / 3.0)),
        CropPreset::new("16:9", "16:9", Some(16.0 / 9.0)),
    ]
}

fn default_tools() -> Vec<ToolKind> {
    vec![ToolKind::Crop, ToolKind::Transform, ToolKind::Brush]
}

/// Top-level editor configuration, usually loaded from JSON.
///
/// Every field has a default so partial documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Initial canvas width in pixels.
    pub width: u32,
    /// Initial canvas height in pixels.
    pub height: u32,
    /// Tools that may be activated.
    pub tools: Vec<ToolKind>,
    /// Filter ids to expose. Empty means every registered filter.
    pub filters: Vec<String>,
    /// Filter preset ids to expose. Empty means every builtin preset.
    pub presets: Vec<String>,
    /// Crop aspect presets.
    pub crop_presets: Vec<CropPreset>,
    /// Bound on undo history entries.
    pub max_history_steps: usize,
    /// Whether [`crate::Editor::handle_key`] acts on shortcuts.
    pub enable_keyboard_shortcuts: bool,
    /// Whether [`crate::Editor::handle_touch`] forwards touches.
    pub enable_touch_gestures: bool,
    /// UI theme name, passed through to the host.
    pub theme: String,
    /// UI locale, passed through to the host.
    pub locale: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            tools: default_tools(),
            filters: Vec::new(),
            presets: Vec::new(),
            crop_presets: default_crop_presets(),
            max_history_steps: DEFAULT_MAX_HISTORY_STEPS,
            enable_keyboard_shortcuts: true,
            enable_touch_gestures: true,
            theme: "light".to_string(),
            locale: "en".to_string(),
        }
    }
}

impl EditorConfig {
    /// Config for a canvas of the given size, everything else default.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has mistyped fields.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether `kind` is enabled.
    #[must_use]
    pub fn tool_enabled(&self, kind: ToolKind) -> bool {
        self.tools.contains(&kind)
    }
}
