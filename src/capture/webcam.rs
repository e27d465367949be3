//! Live camera frames through nokhwa.

use std::sync::Arc;

use async_trait::async_trait;
use lens_crop::viewport::FrameGeometry;
use nokhwa::{
    Camera,
    pixel_format::RgbAFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
};
use tracing::info;

use super::{FrameSource, RgbaFrame};
use crate::error::{LensError, LensResult};

pub struct WebcamSource {
    cam: Camera,
    name: String,
    geometry: Option<FrameGeometry>,
}

impl WebcamSource {
    /// Open camera `index` at its highest resolution and start streaming.
    pub fn open(index: u32) -> LensResult<Self> {
        let name = format!("camera {}", index);
        let req = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| LensError::capture(&name, format!("create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| LensError::capture(&name, format!("open stream: {e}")))?;

        // The stream may settle on a different resolution than requested.
        let actual = cam.resolution();
        info!(device = %name, w = actual.width(), h = actual.height(), "camera streaming");

        Ok(Self {
            cam,
            name,
            geometry: Some(FrameGeometry {
                width: actual.width(),
                height: actual.height(),
            }),
        })
    }
}

#[async_trait(?Send)]
impl FrameSource for WebcamSource {
    fn frame_geometry(&self) -> Option<FrameGeometry> {
        self.geometry
    }

    async fn grab_rgba(&mut self) -> LensResult<RgbaFrame> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| LensError::capture(&self.name, format!("fetch frame: {e}")).retryable())?;
        let decoded = frame
            .decode_image::<RgbAFormat>()
            .map_err(|e| LensError::capture(&self.name, format!("decode frame: {e}")))?;

        let (width, height) = (decoded.width(), decoded.height());
        Ok(RgbaFrame {
            data: Arc::new(decoded.into_raw()),
            width,
            height,
            stride: width as usize * 4,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        let _ = self.cam.stop_stream();
    }
}
