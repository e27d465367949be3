use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use difflens::config::{LensConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use difflens::lens_crop::presets::StillPreset;
use difflens::lens_crop::viewport::{ContainerGeometry, CropMode, GuideRect};

/// Compare two sets of documents with a vision model.
#[derive(Parser, Debug)]
#[command(name = "difflens", author, version)]
#[command(about = "🔍 Find the differences between two sets of documents")]
#[command(long_about = "Collect two sets of documents (files or guided photo crops), send them to a \
generative model and print a structured report of what changed between them.")]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Crop a frame through the viewfinder guide and write the still
    Crop(CropArgs),
    /// Compare two document sets and print the report
    Compare(CompareArgs),
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store a key (read from stdin when omitted)
    Set { key: Option<String> },
    /// Remove the stored key
    Clear,
    /// Show whether a key is available
    Status,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Preview container size in screen units
    #[arg(long, value_parser = parse_container, help = "Preview container size, e.g. 390x844")]
    pub container: Option<ContainerGeometry>,

    /// Explicit guide rectangle inside the container
    #[arg(long, value_parser = parse_guide, help = "Guide rectangle x,y,w,h in container units")]
    pub guide: Option<GuideRect>,

    #[arg(long, value_enum, env = "DIFFLENS_CROP_MODE", default_value_t = CropMode::Guided)]
    pub mode: CropMode,

    #[arg(long, value_enum, env = "DIFFLENS_PRESET", default_value_t = StillPreset::Long768,
          help = "Long-side bound for captured stills")]
    pub preset: StillPreset,

    #[arg(long, env = "DIFFLENS_JPEG_QUALITY", default_value_t = 80)]
    pub jpeg_quality: u8,

    #[arg(long, default_value_t = 40.0, help = "Guide overlay inset from the container edges")]
    pub guide_padding: f64,

    #[arg(long, default_value_t = 0.75, help = "Fraction of the inset height the guide covers")]
    pub guide_height: f64,
}

#[derive(Args, Debug)]
pub struct CropArgs {
    /// Image standing in for the camera frame
    pub frame: Option<PathBuf>,

    /// Grab the frame from a camera instead of a file
    #[cfg(feature = "webcam")]
    #[arg(long, conflicts_with = "frame")]
    pub camera: Option<u32>,

    #[arg(short, long, default_value = "still.jpg", help = "Where to write the JPEG still")]
    pub output: PathBuf,

    #[command(flatten)]
    pub capture: CaptureArgs,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Files for Set 1 (pdf, doc, docx, xls, xlsx, txt, jpg, jpeg, png)
    #[arg(long, num_args = 1..)]
    pub first: Vec<PathBuf>,

    /// Files for Set 2
    #[arg(long, num_args = 1..)]
    pub second: Vec<PathBuf>,

    /// Frames captured through the guide into Set 1
    #[arg(long, num_args = 1..)]
    pub capture_first: Vec<PathBuf>,

    /// Frames captured through the guide into Set 2
    #[arg(long, num_args = 1..)]
    pub capture_second: Vec<PathBuf>,

    /// Print the Markdown as returned instead of the terminal rendering
    #[arg(long)]
    pub raw: bool,

    #[arg(long, env = "DIFFLENS_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "DIFFLENS_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, env = "DIFFLENS_TIMEOUT", default_value_t = 120, help = "Request timeout in seconds")]
    pub timeout: u64,

    #[command(flatten)]
    pub capture: CaptureArgs,
}

impl CaptureArgs {
    pub fn to_config(&self) -> LensConfig {
        LensConfig {
            jpeg_quality: self.jpeg_quality,
            still_preset: self.preset,
            crop_mode: self.mode,
            guide_padding: self.guide_padding,
            guide_height_fraction: self.guide_height,
            ..LensConfig::default()
        }
    }
}

impl CompareArgs {
    pub fn to_config(&self) -> LensConfig {
        LensConfig {
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            timeout_secs: self.timeout,
            ..self.capture.to_config()
        }
    }
}

/// Parse `WxH`, e.g. `390x844` or `390.5x844`.
fn parse_container(s: &str) -> Result<ContainerGeometry, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    Ok(ContainerGeometry { width, height })
}

/// Parse `x,y,w,h`.
fn parse_guide(s: &str) -> Result<GuideRect, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid guide '{}': {}", s, e))?;
    match values.as_slice() {
        &[x, y, width, height] => Ok(GuideRect { x, y, width, height }),
        _ => Err(format!("expected x,y,w,h, got '{}'", s)),
    }
}
