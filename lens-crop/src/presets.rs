// SPDX-License-Identifier: MIT
//! # Still Size Presets and Plan Computation
//!
//! A cropped document still is usually far larger than a vision model needs.
//! Request size (and cost) tracks pixel count, while legibility tracks the
//! longest side, so presets clamp the long side and keep the aspect ratio.
//!
//! - **1024px**: dense pages, small print
//! - **768px**: default; receipts, forms, single-column text
//! - **512px**: large print, quick checks
//!
//! Plans never upscale and never produce a zero-sized side.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side, derive the other side proportionally.
    MaxLongSide(u32),
}

/// Output dimensions for one scaling operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target used for planning; `None` keeps the input size
    pub target: Option<ScaleTarget>,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the input untouched.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a scaling plan. `None` keeps the input size.
pub fn build_plan(input: Size, target: Option<ScaleTarget>) -> ScalePlan {
    let out = match target {
        None => input,
        Some(ScaleTarget::MaxLongSide(max_side)) => {
            let (w, h) = fit_long_side(input, max_side);
            Size { w, h }
        }
    };

    ScalePlan { input, target, out }
}

fn fit_long_side(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h).max(1.0);
    let s = (max_long as f64 / long).min(1.0); // don't upscale
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Long-side bounds applied to captured stills before upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StillPreset {
    /// Longest side 1024px
    #[clap(name = "long1024")]
    Long1024,
    /// Longest side 768px
    #[default]
    #[clap(name = "long768")]
    Long768,
    /// Longest side 512px
    #[clap(name = "long512")]
    Long512,
    /// Keep the cropped region at native resolution
    #[clap(name = "original")]
    Original,
}

impl StillPreset {
    pub fn to_target(self) -> Option<ScaleTarget> {
        match self {
            StillPreset::Long1024 => Some(ScaleTarget::MaxLongSide(1024)),
            StillPreset::Long768 => Some(ScaleTarget::MaxLongSide(768)),
            StillPreset::Long512 => Some(ScaleTarget::MaxLongSide(512)),
            StillPreset::Original => None,
        }
    }

    pub fn plan(self, input: Size) -> ScalePlan {
        build_plan(input, self.to_target())
    }
}
