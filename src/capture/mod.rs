//! # Capture Module
//!
//! Guided still capture. A [`FrameSource`] delivers native frames, a
//! [`Viewfinder`] reports where the preview and its guide sit on screen, and
//! [`StillCapture`] turns one shutter press into a cropped JPEG document.

pub mod file_source;
pub mod still;
#[cfg(feature = "webcam")]
pub mod webcam;

use std::sync::Arc;

use async_trait::async_trait;
use lens_crop::viewport::{ContainerGeometry, FrameGeometry, GuideRect};

use crate::error::LensResult;

pub use file_source::ImageFileSource;
pub use still::{CapturedStill, StillCapture};
#[cfg(feature = "webcam")]
pub use webcam::WebcamSource;

/// Tightly packed or strided RGBA8 frame.
#[derive(Clone, Debug)]
pub struct RgbaFrame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
}

impl RgbaFrame {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
        }
    }
}

/// Device (or stand-in) that produces native frames.
#[async_trait(?Send)]
pub trait FrameSource {
    /// Native resolution, or `None` while the device is not delivering frames.
    fn frame_geometry(&self) -> Option<FrameGeometry>;

    /// Grab the current frame.
    async fn grab_rgba(&mut self) -> LensResult<RgbaFrame>;

    /// Human readable device name, used in errors and logs.
    fn name(&self) -> &str;
}

/// On-screen placement of the preview and the crop guide.
pub trait Viewfinder {
    fn container(&self) -> ContainerGeometry;

    /// Guide rectangle relative to the container's top-left corner.
    fn guide(&self) -> GuideRect;
}

/// Viewfinder with a fixed container; the guide is either explicit or the
/// default centered overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedViewfinder {
    pub container: ContainerGeometry,
    pub guide: Option<GuideRect>,
    pub padding: f64,
    pub height_fraction: f64,
}

impl FixedViewfinder {
    pub fn new(container: ContainerGeometry, padding: f64, height_fraction: f64) -> Self {
        Self {
            container,
            guide: None,
            padding,
            height_fraction,
        }
    }

    pub fn with_guide(mut self, guide: GuideRect) -> Self {
        self.guide = Some(guide);
        self
    }
}

impl Viewfinder for FixedViewfinder {
    fn container(&self) -> ContainerGeometry {
        self.container
    }

    fn guide(&self) -> GuideRect {
        self.guide.unwrap_or_else(|| {
            GuideRect::centered_inset(self.container, self.padding, self.height_fraction)
        })
    }
}
