//! AI capabilities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An AI capability a provider may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiFeature {
    /// Separate the subject from its background.
    BackgroundRemoval,
    /// General quality enhancement.
    Enhance,
    /// Super-resolution.
    Upscale,
    /// Prompted inpainting inside a mask.
    GenerativeFill,
}

impl AiFeature {
    /// Every feature.
    pub const ALL: [Self; 4] = [
        Self::BackgroundRemoval,
        Self::Enhance,
        Self::Upscale,
        Self::GenerativeFill,
    ];

    /// Wire name, matching the serde representation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BackgroundRemoval => "backgroundRemoval",
            Self::Enhance => "enhance",
            Self::Upscale => "upscale",
            Self::GenerativeFill => "generativeFill",
        }
    }

    /// History label used when a result is applied.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BackgroundRemoval => "AI: Remove Background",
            Self::Enhance => "AI: Enhance",
            Self::Upscale => "AI: Upscale",
            Self::GenerativeFill => "AI: Generative Fill",
        }
    }
}

impl fmt::Display for AiFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
