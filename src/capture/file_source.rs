//! Still image on disk standing in for a camera frame.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use lens_crop::viewport::FrameGeometry;
use tracing::debug;

use super::{FrameSource, RgbaFrame};
use crate::error::{LensError, LensResult};

pub struct ImageFileSource {
    name: String,
    frame: RgbaFrame,
}

impl ImageFileSource {
    /// Decode `path` once; every grab returns the same frame.
    pub async fn open(path: &Path) -> LensResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LensError::io_at("read_frame", path, e))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| {
                LensError::capture(path.display().to_string(), format!("cannot decode image: {e}"))
            })?
            .to_rgba8();

        debug!(path = %path.display(), w = image.width(), h = image.height(), "loaded frame image");
        Ok(Self::from_image(display_name(path), image))
    }

    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            name: name.into(),
            frame: RgbaFrame {
                data: Arc::new(image.into_raw()),
                width,
                height,
                stride: width as usize * 4,
            },
        }
    }
}

#[async_trait(?Send)]
impl FrameSource for ImageFileSource {
    fn frame_geometry(&self) -> Option<FrameGeometry> {
        let geometry = self.frame.geometry();
        (geometry.width > 0 && geometry.height > 0).then_some(geometry)
    }

    async fn grab_rgba(&mut self) -> LensResult<RgbaFrame> {
        Ok(self.frame.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_reads_geometry_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbaImage::from_pixel(64, 48, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let mut source = ImageFileSource::open(&path).await.unwrap();
        assert_eq!(source.name(), "frame.png");
        assert_eq!(
            source.frame_geometry(),
            Some(FrameGeometry { width: 64, height: 48 })
        );
        let frame = source.grab_rgba().await.unwrap();
        assert_eq!(frame.data.len(), 64 * 48 * 4);
    }

    #[tokio::test]
    async fn garbage_is_a_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = ImageFileSource::open(&path).await.err().unwrap();
        assert_eq!(err.category(), "capture");
    }
}
