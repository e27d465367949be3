// SPDX-License-Identifier: MIT
//! # Cover-Fit Viewport Mapping
//!
//! The live preview shows the camera feed scaled with "cover" semantics: the
//! frame keeps its aspect ratio, is magnified until the container is filled on
//! both axes, and the overflow is clipped equally on opposing edges. A guide
//! rectangle drawn over that preview therefore does not correspond to the
//! same coordinates in the native frame.
//!
//! ## Mapping
//!
//! 1. `scale = max(Wc / Wv, Hc / Hv)`
//! 2. `render = (Wv * scale, Hv * scale)`
//! 3. `offset = ((renderW - Wc) / 2, (renderH - Hc) / 2)`
//! 4. guide shifted into rendered-content space by `offset`
//! 5. divided by `scale` to land in native pixels
//!
//! One offset is always ~0 (the axis that fits exactly); the other is the
//! amount clipped from each side. Matching aspect ratios fall out of the same
//! formula with both offsets at zero.
//!
//! ## Limitations
//!
//! No rotation or non-uniform scaling. If the device hands over frames that
//! are rotated relative to the preview, the mapping is wrong.

use std::fmt;

/// Native resolution of the frame delivered by the capture device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

/// On-screen size of the element presenting the video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerGeometry {
    pub width: f64,
    pub height: f64,
}

/// Crop guide in container coordinates (origin at the container's top-left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuideRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Region of the native frame, in native pixel units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel region, guaranteed to lie inside the frame it was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Geometry that cannot be mapped.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// Frame has a zero dimension (device not delivering frames yet).
    InvalidFrame { width: u32, height: u32 },
    /// Container has a non-positive dimension (not laid out).
    InvalidContainer { width: f64, height: f64 },
    /// A NaN or infinite coordinate was supplied.
    NonFinite(&'static str),
    /// Guide (or the clamped region) has no area.
    DegenerateGuide { width: f64, height: f64 },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::InvalidFrame { width, height } => {
                write!(f, "Frame geometry {}x{} is not ready", width, height)
            }
            GeometryError::InvalidContainer { width, height } => {
                write!(f, "Container geometry {}x{} must be positive", width, height)
            }
            GeometryError::NonFinite(what) => write!(f, "Non-finite value in {}", what),
            GeometryError::DegenerateGuide { width, height } => {
                write!(f, "Crop region {}x{} has no area", width, height)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// How a capture decides which part of the frame to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CropMode {
    /// Map the on-screen guide into the native frame.
    #[default]
    Guided,
    /// Legacy behaviour: keep the whole frame and ignore the guide.
    FullFrame,
}

impl CropMode {
    /// Resolve the source region for one capture event.
    pub fn source_rect(
        self,
        frame: FrameGeometry,
        container: ContainerGeometry,
        guide: GuideRect,
    ) -> Result<SourceRect, GeometryError> {
        match self {
            CropMode::Guided => compute_source_rect(frame, container, guide),
            CropMode::FullFrame => {
                validate_frame(frame)?;
                Ok(SourceRect::full(frame))
            }
        }
    }
}

/// Scale and centering offsets of a cover-fitted frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    /// Uniform magnification from native pixels to container units.
    pub scale: f64,
    /// Rendered content clipped off the left (and right) edge, container units.
    pub offset_x: f64,
    /// Rendered content clipped off the top (and bottom) edge, container units.
    pub offset_y: f64,
}

impl CoverFit {
    pub fn new(frame: FrameGeometry, container: ContainerGeometry) -> Result<Self, GeometryError> {
        validate_frame(frame)?;
        validate_container(container)?;

        let (wv, hv) = (frame.width as f64, frame.height as f64);
        let scale = (container.width / wv).max(container.height / hv);
        let render_w = wv * scale;
        let render_h = hv * scale;

        Ok(Self {
            scale,
            offset_x: (render_w - container.width) / 2.0,
            offset_y: (render_h - container.height) / 2.0,
        })
    }

    /// Guide → native pixels. No clamping and no degeneracy check.
    pub fn map_guide(&self, guide: GuideRect) -> SourceRect {
        SourceRect {
            x: (guide.x + self.offset_x) / self.scale,
            y: (guide.y + self.offset_y) / self.scale,
            width: guide.width / self.scale,
            height: guide.height / self.scale,
        }
    }

    /// Native pixels → container coordinates; inverse of [`CoverFit::map_guide`].
    pub fn project_to_container(&self, source: SourceRect) -> GuideRect {
        GuideRect {
            x: source.x * self.scale - self.offset_x,
            y: source.y * self.scale - self.offset_y,
            width: source.width * self.scale,
            height: source.height * self.scale,
        }
    }
}

/// Map an on-screen guide into native frame coordinates.
///
/// Fails on a frame or container with a non-positive dimension, on
/// non-finite guide coordinates, and on a guide with no area. The result is
/// not clamped; use [`SourceRect::clamp_to`] or [`SourceRect::to_pixel_rect`]
/// before touching pixels.
pub fn compute_source_rect(
    frame: FrameGeometry,
    container: ContainerGeometry,
    guide: GuideRect,
) -> Result<SourceRect, GeometryError> {
    if ![guide.x, guide.y, guide.width, guide.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(GeometryError::NonFinite("guide"));
    }
    if guide.width <= 0.0 || guide.height <= 0.0 {
        return Err(GeometryError::DegenerateGuide {
            width: guide.width,
            height: guide.height,
        });
    }

    let fit = CoverFit::new(frame, container)?;
    Ok(fit.map_guide(guide))
}

impl GuideRect {
    /// Guide overlay of the capture screen: full width minus `padding`,
    /// `height_fraction` of the padded height, centered in the container.
    pub fn centered_inset(container: ContainerGeometry, padding: f64, height_fraction: f64) -> Self {
        let inner_w = (container.width - 2.0 * padding).max(0.0);
        let inner_h = (container.height - 2.0 * padding).max(0.0);
        let height = inner_h * height_fraction.clamp(0.0, 1.0);

        Self {
            x: padding.min(container.width / 2.0),
            y: padding.min(container.height / 2.0) + (inner_h - height) / 2.0,
            width: inner_w,
            height,
        }
    }
}

impl SourceRect {
    /// The entire native frame.
    pub fn full(frame: FrameGeometry) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width as f64,
            height: frame.height as f64,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || ![self.x, self.y, self.width, self.height]
                .iter()
                .all(|v| v.is_finite())
    }

    /// True when the rect lies within the frame, allowing `eps` of float slop.
    pub fn within(&self, frame: FrameGeometry, eps: f64) -> bool {
        self.x >= -eps
            && self.y >= -eps
            && self.x + self.width <= frame.width as f64 + eps
            && self.y + self.height <= frame.height as f64 + eps
    }

    /// Clip to the frame so that `0 <= x`, `0 <= y`, `x + w <= Wv`, `y + h <= Hv`.
    /// Portions outside the frame are cut off; a fully outside rect ends up
    /// with zero area.
    pub fn clamp_to(&self, frame: FrameGeometry) -> SourceRect {
        let (wv, hv) = (frame.width as f64, frame.height as f64);

        let left = self.x.clamp(0.0, wv);
        let top = self.y.clamp(0.0, hv);
        let right = (self.x + self.width).clamp(0.0, wv);
        let bottom = (self.y + self.height).clamp(0.0, hv);

        SourceRect {
            x: left,
            y: top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    /// Clamp to the frame and snap edges to whole pixels.
    pub fn to_pixel_rect(&self, frame: FrameGeometry) -> Result<PixelRect, GeometryError> {
        validate_frame(frame)?;
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(GeometryError::NonFinite("source rect"));
        }
        let clamped = self.clamp_to(frame);

        let x0 = clamped.x.round() as u32;
        let y0 = clamped.y.round() as u32;
        let x1 = ((clamped.x + clamped.width).round() as u32).min(frame.width);
        let y1 = ((clamped.y + clamped.height).round() as u32).min(frame.height);

        if x1 <= x0 || y1 <= y0 {
            return Err(GeometryError::DegenerateGuide {
                width: clamped.width,
                height: clamped.height,
            });
        }

        Ok(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

fn validate_frame(frame: FrameGeometry) -> Result<(), GeometryError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(GeometryError::InvalidFrame {
            width: frame.width,
            height: frame.height,
        });
    }
    Ok(())
}

fn validate_container(container: ContainerGeometry) -> Result<(), GeometryError> {
    if !container.width.is_finite() || !container.height.is_finite() {
        return Err(GeometryError::NonFinite("container"));
    }
    if container.width <= 0.0 || container.height <= 0.0 {
        return Err(GeometryError::InvalidContainer {
            width: container.width,
            height: container.height,
        });
    }
    Ok(())
}
