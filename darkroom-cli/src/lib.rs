//! # Darkroom CLI
//!
//! Headless host for the Darkroom editor. One invocation runs a fixed
//! pipeline over a single image:
//!
//! 1. load the input as the base layer
//! 2. optionally run one AI operation on it
//! 3. crop
//! 4. append filters and presets
//! 5. export by the output file's extension
//!
//! ## Configuration
//!
//! `--config` (or `EDITOR_CONFIG`) points at a JSON document holding the
//! editor settings plus an `ai` section:
//!
//! ```json
//! {
//!   "max_history_steps": 20,
//!   "ai": {
//!     "features": { "backgroundRemoval": { "provider": "removebg" } }
//!   }
//! }
//! ```
//!
//! Empty API keys are filled from `REMOVEBG_API_KEY` and
//! `REPLICATE_API_TOKEN`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use darkroom_ai::{
    apply_background_removal, apply_enhance, apply_generative_fill, apply_upscale, layer_payload,
    AiConfig, AiManager, ImagePayload, ProviderKind, StaleGuard,
};
use darkroom_core::{
    AppliedFilter, CropRect, Editor, EditorConfig, LayerId, Rgba, ToolKind,
};
use darkroom_renderer::{load_image_file, EditorExport, ExportFormat, ExportOptions};
use serde::{Deserialize, Serialize};

/// AI operation to run on the loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AiOperation {
    /// Cut the subject out of its background.
    RemoveBackground,
    /// General quality enhancement.
    Enhance,
    /// Super-resolution by `--scale`.
    Upscale,
    /// Inpaint `--mask` from `--prompt`.
    GenerativeFill,
}

/// Command-line arguments for `darkroom`.
#[derive(Debug, Clone, Parser)]
#[command(name = "darkroom")]
#[command(about = "Non-destructive image editing from the command line")]
#[command(version)]
pub struct CliArgs {
    /// Image to edit (PNG, JPEG or WebP).
    pub input: PathBuf,

    /// Where to write the result. The extension picks the format.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format, overriding the extension.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// JSON host configuration.
    #[arg(long, env = "EDITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Filter to append, as `id` or `id:param=value,...`. Repeatable.
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<AppliedFilter>,

    /// Filter preset to append. Repeatable.
    #[arg(long = "preset")]
    pub presets: Vec<String>,

    /// Crop rectangle as `x,y,width,height` in image pixels.
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropRect>,

    /// AI operation to run before cropping and filtering.
    #[arg(long, value_enum)]
    pub ai: Option<AiOperation>,

    /// Requested upscale factor.
    #[arg(long, default_value = "2")]
    pub scale: u32,

    /// Prompt for generative fill.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Mask image for generative fill.
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// JPEG quality 1-100.
    #[arg(long, default_value = "90", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Flatten onto this colour (`#rrggbb` or `#rrggbbaa`).
    #[arg(long, value_parser = parse_color)]
    pub background: Option<Rgba>,

    /// Resample the exported frame by this factor.
    #[arg(long, default_value = "1.0")]
    pub export_scale: f32,

    /// remove.bg API key.
    #[arg(long, env = "REMOVEBG_API_KEY", hide_env_values = true)]
    pub removebg_api_key: Option<String>,

    /// Replicate API token.
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub replicate_api_token: Option<String>,
}

/// Editor settings plus AI providers, as read from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Editor settings at the top level of the document.
    #[serde(flatten)]
    pub editor: EditorConfig,
    /// AI provider mapping.
    pub ai: AiConfig,
}

impl HostConfig {
    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Fill empty provider keys from command-line or environment values.
    pub fn apply_credentials(&mut self, removebg: Option<&str>, replicate: Option<&str>) {
        if let Some(key) = removebg {
            self.ai.fill_api_key(ProviderKind::RemoveBg, key);
        }
        if let Some(key) = replicate {
            self.ai.fill_api_key(ProviderKind::Replicate, key);
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Canvas width before export scaling.
    pub width: u32,
    /// Canvas height before export scaling.
    pub height: u32,
    /// Encoded output size.
    pub bytes: usize,
    /// Undo entries recorded along the way.
    pub history_steps: usize,
}

/// Run the whole pipeline described by `args`.
///
/// # Errors
///
/// Returns the first failing step with context.
pub async fn run(args: &CliArgs) -> anyhow::Result<RunSummary> {
    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    config.apply_credentials(
        args.removebg_api_key.as_deref(),
        args.replicate_api_token.as_deref(),
    );

    let format = match args.format {
        Some(format) => format,
        None => output_format(&args.output)?,
    };

    let mut editor = Editor::new(config.editor.clone())?;
    let pixels = load_image_file(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let name = args
        .input
        .file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());
    let layer = editor.load_image(pixels, &name)?;

    if let Some(operation) = args.ai {
        let manager = AiManager::from_config(&config.ai)?;
        run_ai(&mut editor, layer, &manager, args, operation).await?;
    }

    if let Some(rect) = args.crop {
        editor.activate_tool(ToolKind::Crop)?;
        editor.crop_tool_mut().set_rect(rect);
        editor.apply_crop()?;
        editor.deactivate_tool()?;
    }

    for filter in &args.filters {
        editor
            .add_filter(layer, filter.clone())
            .with_context(|| format!("applying filter {}", filter.id))?;
    }
    for preset in &args.presets {
        editor
            .apply_preset(layer, preset)
            .with_context(|| format!("applying preset {preset}"))?;
    }

    let options = ExportOptions {
        format,
        quality: args.quality,
        background: args.background,
        scale: args.export_scale,
    };
    let bytes = editor.export(&options)?;
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let size = editor.canvas().size();
    Ok(RunSummary {
        width: size.width,
        height: size.height,
        bytes: bytes.len(),
        history_steps: editor.history().len(),
    })
}

async fn run_ai(
    editor: &mut Editor,
    layer: LayerId,
    manager: &AiManager,
    args: &CliArgs,
    operation: AiOperation,
) -> anyhow::Result<()> {
    let guard = StaleGuard::capture(editor, layer);
    let payload = layer_payload(editor, layer)?;
    tracing::info!("Running {operation:?} on {} bytes", payload.len());

    match operation {
        AiOperation::RemoveBackground => {
            let result = manager.remove_background(&payload).await?;
            apply_background_removal(editor, &guard, &result)?;
        }
        AiOperation::Enhance => {
            let result = manager.enhance(&payload).await?;
            apply_enhance(editor, &guard, &result)?;
        }
        AiOperation::Upscale => {
            let result = manager.upscale(&payload, args.scale).await?;
            let source = apply_upscale(editor, &guard, &result)?;
            if let Some(pixels) = editor.sources().get(source) {
                let (width, height) = (pixels.width(), pixels.height());
                editor.canvas_mut().resize(width, height);
            }
        }
        AiOperation::GenerativeFill => {
            let mask_path = args
                .mask
                .as_ref()
                .context("--mask is required for generative-fill")?;
            let prompt = args
                .prompt
                .as_deref()
                .context("--prompt is required for generative-fill")?;
            let mask = ImagePayload::new(
                std::fs::read(mask_path)
                    .with_context(|| format!("reading mask {}", mask_path.display()))?,
            );
            let result = manager.generative_fill(&payload, &mask, prompt).await?;
            apply_generative_fill(editor, &guard, &result)?;
        }
    }
    Ok(())
}

fn output_format(path: &Path) -> anyhow::Result<ExportFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    ExportFormat::from_extension(ext)
        .with_context(|| format!("cannot infer output format from {}", path.display()))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(value).ok_or_else(|| format!("unknown format: {value}"))
}

/// Parse `id` or `id:name=value,name=value`.
fn parse_filter(value: &str) -> Result<AppliedFilter, String> {
    let (id, params) = value.split_once(':').unwrap_or((value, ""));
    if id.trim().is_empty() {
        return Err("filter id is empty".to_string());
    }
    let mut filter = AppliedFilter::new(id.trim());
    for pair in params.split(',').filter(|p| !p.trim().is_empty()) {
        let (name, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got {pair}"))?;
        let number: f32 = raw
            .trim()
            .parse()
            .map_err(|_| format!("{} is not a number", raw.trim()))?;
        filter = filter.with_param(name.trim(), number);
    }
    Ok(filter)
}

fn parse_crop(value: &str) -> Result<CropRect, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop {value}: {e}"))?;
    match parts.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(CropRect::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err("crop width and height must be positive".to_string()),
        _ => Err(format!("expected x,y,width,height, got {value}")),
    }
}

fn parse_color(value: &str) -> Result<Rgba, String> {
    Rgba::from_hex(value).ok_or_else(|| format!("invalid colour: {value}"))
}
