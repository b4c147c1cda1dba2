//! Layers - the building blocks of a document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::AppliedFilter;
use crate::pixel::{Point, Rgba};
use crate::source::SourceId;

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a layer's pixels combine with the accumulated pixels beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Multiply channels.
    Multiply,
    /// Inverse multiply of inverses.
    Screen,
    /// Multiply or screen depending on the base.
    Overlay,
    /// Per-channel minimum.
    Darken,
    /// Per-channel maximum.
    Lighten,
    /// Brighten base by dividing by the inverted top.
    ColorDodge,
    /// Darken base by dividing the inverted base by the top.
    ColorBurn,
    /// Overlay with base and top swapped.
    HardLight,
    /// W3C soft light.
    SoftLight,
    /// Absolute difference.
    Difference,
    /// Lower-contrast difference.
    Exclusion,
    /// Clamped sum.
    Additive,
}

/// Position, rotation and scale of a layer in canvas space.
///
/// Rotation and scale pivot around the centre of the layer's own raster.
/// Negative scales flip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X offset of the layer origin (pixels from left).
    pub x: f32,
    /// Y offset of the layer origin (pixels from top).
    pub y: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Horizontal scale.
    pub scale_x: f32,
    /// Vertical scale.
    pub scale_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Transform {
    /// Transform with only a translation.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// True when the transform leaves pixels where they are.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Apply scale then rotation to a vector, ignoring translation.
    #[must_use]
    pub fn linear(&self, v: Point) -> Point {
        let (sin, cos) = self.rotation.sin_cos();
        let (x, y) = (v.x * self.scale_x, v.y * self.scale_y);
        Point::new(x.mul_add(cos, -y * sin), x.mul_add(sin, y * cos))
    }

    /// Map a canvas point into the local raster of a layer pivoting on
    /// `pivot`. Inverse of how the compositor places that raster.
    ///
    /// A degenerate scale leaves the axis unscaled.
    #[must_use]
    pub fn to_local(&self, canvas: Point, pivot: Point) -> Point {
        let (sin, cos) = (-self.rotation).sin_cos();
        let qx = canvas.x - self.x - pivot.x;
        let qy = canvas.y - self.y - pivot.y;
        let rx = qx.mul_add(cos, -qy * sin);
        let ry = qx.mul_add(sin, qy * cos);
        let unscale = |v: f32, s: f32| if s.abs() < f32::EPSILON { v } else { v / s };
        Point::new(
            unscale(rx, self.scale_x) + pivot.x,
            unscale(ry, self.scale_y) + pivot.y,
        )
    }
}

/// Which tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    /// Paints colour.
    #[default]
    Brush,
    /// Removes alpha from earlier strokes.
    Eraser,
}

/// One committed stroke on a drawing layer. Never mutated after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPath {
    /// Ordered stroke points in the layer's local raster, which is canvas
    /// sized. Equal to canvas coordinates while the layer transform is the
    /// identity.
    pub points: Vec<Point>,
    /// Stroke colour.
    pub color: Rgba,
    /// Stroke width in pixels.
    pub width: f32,
    /// Stroke opacity (0.0 to 1.0).
    pub opacity: f32,
    /// Tool that produced the stroke.
    pub tool: StrokeTool,
}

/// Geometric primitive for shape layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rectangle,
    /// Ellipse inscribed in the shape bounds.
    Ellipse,
}

/// Non-destructive colour grading parameters.
///
/// All values are offsets from neutral; the default changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParams {
    /// Additive brightness (-1.0 to 1.0).
    pub brightness: f32,
    /// Contrast offset (-1.0 to 1.0).
    pub contrast: f32,
    /// Saturation offset (-1.0 = greyscale).
    pub saturation: f32,
    /// Exposure in stops.
    pub exposure: f32,
    /// Hue rotation in degrees.
    pub hue: f32,
}

/// Type-specific payload of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LayerKind {
    /// A raster image.
    Image {
        /// Handle into the document's source store.
        source: SourceId,
    },

    /// A text label.
    Text {
        /// Text content.
        content: String,
        /// Font size in pixels.
        font_size: f32,
        /// Text colour.
        color: Rgba,
    },

    /// A vector shape.
    Shape {
        /// Primitive.
        shape: ShapeKind,
        /// Width in pixels.
        width: f32,
        /// Height in pixels.
        height: f32,
        /// Fill colour.
        fill: Rgba,
        /// Outline colour.
        stroke: Rgba,
        /// Outline width in pixels (0 = none).
        stroke_width: f32,
    },

    /// Freehand strokes.
    Drawing {
        /// Committed strokes, oldest first.
        paths: Vec<DrawingPath>,
    },

    /// A sticker image.
    Sticker {
        /// Handle into the document's source store.
        source: SourceId,
    },

    /// Colour grading applied to everything beneath.
    Adjustment {
        /// Grading parameters.
        params: AdjustmentParams,
    },
}

impl LayerKind {
    /// Create an empty drawing payload.
    #[must_use]
    pub fn drawing() -> Self {
        Self::Drawing { paths: Vec::new() }
    }

    /// Whether adding a layer of this kind should make it the active layer.
    #[must_use]
    pub fn requires_drawing_surface(&self) -> bool {
        matches!(self, Self::Drawing { .. })
    }

    /// Whether this is a drawing layer.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing { .. })
    }

    /// Stable type name, used for default layer names and logging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Image { .. } => "Image",
            Self::Text { .. } => "Text",
            Self::Shape { .. } => "Shape",
            Self::Drawing { .. } => "Drawing",
            Self::Sticker { .. } => "Sticker",
            Self::Adjustment { .. } => "Adjustment",
        }
    }
}

/// A layer with common properties and a type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Whether the layer takes part in compositing.
    pub visible: bool,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
    /// Blend mode against the accumulator.
    pub blend_mode: BlendMode,
    /// Placement in canvas space.
    pub transform: Transform,
    /// Filters applied in order to this layer's pixels.
    pub filters: Vec<AppliedFilter>,
    /// Type-specific payload.
    pub kind: LayerKind,
}

impl Layer {
    /// Create a new layer named after its kind.
    #[must_use]
    pub fn new(kind: LayerKind) -> Self {
        Self {
            id: LayerId::new(),
            name: kind.type_name().to_string(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            transform: Transform::default(),
            filters: Vec::new(),
            kind,
        }
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the blend mode.
    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Set the opacity, clamped to 0.0..=1.0.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Whether this layer contributes to a render pass.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    /// Merge the `Some` fields of `props` into this layer.
    pub fn apply_props(&mut self, props: LayerProps) {
        if let Some(name) = props.name {
            self.name = name;
        }
        if let Some(visible) = props.visible {
            self.visible = visible;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(blend_mode) = props.blend_mode {
            self.blend_mode = blend_mode;
        }
        if let Some(transform) = props.transform {
            self.transform = transform;
        }
        if let Some(filters) = props.filters {
            self.filters = filters;
        }
        if let Some(kind) = props.kind {
            self.kind = kind;
        }
    }
}

/// Partial layer properties, used both as initial props and as updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerProps {
    /// New display name.
    pub name: Option<String>,
    /// New visibility.
    pub visible: Option<bool>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New blend mode.
    pub blend_mode: Option<BlendMode>,
    /// New transform.
    pub transform: Option<Transform>,
    /// Replacement filter list.
    pub filters: Option<Vec<AppliedFilter>>,
    /// Replacement payload.
    pub kind: Option<LayerKind>,
}

impl LayerProps {
    /// Props that only set a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Props that only set a transform.
    #[must_use]
    pub fn transform(transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_local_inverts_scale_about_pivot() {
        let t = Transform {
            x: 5.0,
            scale_x: 2.0,
            scale_y: 2.0,
            ..Transform::default()
        };
        let pivot = Point::new(100.0, 100.0);
        let local = t.to_local(Point::new(25.0, 20.0), pivot);
        assert!((local.x - 60.0).abs() < 1e-4);
        assert!((local.y - 60.0).abs() < 1e-4);

        let back = t.linear(Point::new(local.x - pivot.x, local.y - pivot.y));
        assert!((back.x + pivot.x + t.x - 25.0).abs() < 1e-4);
        assert!((back.y + pivot.y + t.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_linear_rotates_after_scaling() {
        let t = Transform {
            rotation: std::f32::consts::FRAC_PI_2,
            scale_x: 3.0,
            ..Transform::default()
        };
        let v = t.linear(Point::new(1.0, 0.0));
        assert!(v.x.abs() < 1e-4);
        assert!((v.y - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_apply_props_merges_only_some_fields() {
        let mut layer = Layer::new(LayerKind::drawing()).with_name("Sketch");
        layer.apply_props(LayerProps {
            opacity: Some(1.5),
            blend_mode: Some(BlendMode::Screen),
            ..LayerProps::default()
        });

        assert_eq!(layer.name, "Sketch");
        assert!((layer.opacity - 1.0).abs() < f32::EPSILON);
        assert_eq!(layer.blend_mode, BlendMode::Screen);
        assert!(layer.visible);
    }

    #[test]
    fn test_only_drawing_requires_surface() {
        assert!(LayerKind::drawing().requires_drawing_surface());
        assert!(!LayerKind::Adjustment {
            params: AdjustmentParams::default()
        }
        .requires_drawing_surface());
    }

    #[test]
    fn test_layer_json_tags_kind() {
        let layer = Layer::new(LayerKind::Text {
            content: "Hi".to_string(),
            font_size: 12.0,
            color: Rgba::BLACK,
        });
        let json = serde_json::to_string(&layer).expect("serialize");
        assert!(json.contains("\"type\":\"Text\""));
    }
}
