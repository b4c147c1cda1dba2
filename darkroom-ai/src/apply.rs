//! Moving pixels between the document and providers.
//!
//! Results are applied non-destructively: the decoded image becomes a new
//! source on the target layer and the change is one undo step. A
//! [`StaleGuard`] taken at submit time refuses results once the document
//! has changed underneath the request.

use darkroom_core::{Editor, LayerId, LayerKind, SourceId};
use darkroom_renderer::{decode_image, export_pixels, ExportOptions};

use crate::error::{AiError, AiResult};
use crate::feature::AiFeature;
use crate::payload::{
    BackgroundRemovalResult, EnhanceResult, GenerativeFillResult, ImagePayload, UpscaleResult,
};

/// Document revision captured when a request is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleGuard {
    layer: LayerId,
    revision: u64,
}

impl StaleGuard {
    /// Remember the current revision for a request targeting `layer`.
    #[must_use]
    pub fn capture(editor: &Editor, layer: LayerId) -> Self {
        Self {
            layer,
            revision: editor.revision(),
        }
    }

    /// Layer the result is meant for.
    #[must_use]
    pub const fn layer(&self) -> LayerId {
        self.layer
    }

    /// Revision at capture time.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Fail if the document changed since capture.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Stale`] on any intervening mutation.
    pub fn check(&self, editor: &Editor) -> AiResult<()> {
        let current = editor.revision();
        if current == self.revision {
            Ok(())
        } else {
            Err(AiError::Stale {
                captured: self.revision,
                current,
            })
        }
    }
}

/// Encode an image or sticker layer's source pixels as PNG for upload.
///
/// # Errors
///
/// Returns an editor error if the layer is missing or has no pixel source.
pub fn layer_payload(editor: &Editor, layer: LayerId) -> AiResult<ImagePayload> {
    let found = editor
        .layers()
        .get_layer(layer)
        .ok_or_else(|| darkroom_core::EditorError::LayerNotFound(layer.to_string()))?;
    let source = match found.kind {
        LayerKind::Image { source } | LayerKind::Sticker { source } => source,
        _ => {
            return Err(darkroom_core::EditorError::InvalidOperation(format!(
                "{} layer has no pixel source",
                found.kind.type_name()
            ))
            .into())
        }
    };
    let pixels = editor.sources().get(source).ok_or_else(|| {
        darkroom_core::EditorError::InvalidOperation(format!("missing source {source}"))
    })?;
    Ok(ImagePayload::new(export_pixels(pixels, &ExportOptions::default())?))
}

/// Replace the guarded layer's pixels with a background-removal result.
///
/// # Errors
///
/// Returns [`AiError::Stale`] if the document changed, or a decode/editor error.
pub fn apply_background_removal(
    editor: &mut Editor,
    guard: &StaleGuard,
    result: &BackgroundRemovalResult,
) -> AiResult<SourceId> {
    apply_payload(editor, guard, &result.foreground, AiFeature::BackgroundRemoval)
}

/// Replace the guarded layer's pixels with an enhanced image.
///
/// # Errors
///
/// As [`apply_background_removal`].
pub fn apply_enhance(
    editor: &mut Editor,
    guard: &StaleGuard,
    result: &EnhanceResult,
) -> AiResult<SourceId> {
    apply_payload(editor, guard, &result.enhanced, AiFeature::Enhance)
}

/// Replace the guarded layer's pixels with an upscaled image.
///
/// # Errors
///
/// As [`apply_background_removal`].
pub fn apply_upscale(
    editor: &mut Editor,
    guard: &StaleGuard,
    result: &UpscaleResult,
) -> AiResult<SourceId> {
    apply_payload(editor, guard, &result.upscaled, AiFeature::Upscale)
}

/// Replace the guarded layer's pixels with a generative-fill result.
///
/// # Errors
///
/// As [`apply_background_removal`].
pub fn apply_generative_fill(
    editor: &mut Editor,
    guard: &StaleGuard,
    result: &GenerativeFillResult,
) -> AiResult<SourceId> {
    apply_payload(editor, guard, &result.filled, AiFeature::GenerativeFill)
}

fn apply_payload(
    editor: &mut Editor,
    guard: &StaleGuard,
    payload: &ImagePayload,
    feature: AiFeature,
) -> AiResult<SourceId> {
    if let Err(err) = guard.check(editor) {
        tracing::warn!("Dropping {feature} result for layer {}: {err}", guard.layer);
        return Err(err);
    }
    let pixels = decode_image(&payload.bytes)?;
    let (width, height) = (pixels.width(), pixels.height());
    let source = editor.replace_layer_source(guard.layer, pixels, feature.label())?;
    tracing::info!(
        "Applied {feature} to layer {} ({width}x{height})",
        guard.layer
    );
    Ok(source)
}
