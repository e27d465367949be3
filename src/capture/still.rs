//! Shutter press → cropped, downsized JPEG.
//!
//! Frame, container and guide geometry are read back-to-back before anything
//! else happens. The grabbed frame must still match the snapshot; a resolution
//! change in between (device rotation, stream renegotiation) aborts the
//! capture instead of cropping the wrong region.

use std::io::Cursor;

use fast_image_resize::Resizer;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use lens_crop::cpu::{copy_region_rgba, crop_scale_rgba_cpu, Staging};
use lens_crop::presets::{ScalePlan, Size, StillPreset};
use lens_crop::viewport::{ContainerGeometry, CropMode, FrameGeometry, GuideRect, PixelRect, SourceRect};
use tracing::{debug, info, warn};

use super::{FrameSource, RgbaFrame, Viewfinder};
use crate::config::LensConfig;
use crate::documents::DocItem;
use crate::error::{LensError, LensResult};

/// Geometry read for a single capture event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometrySnapshot {
    pub frame: FrameGeometry,
    pub container: ContainerGeometry,
    pub guide: GuideRect,
}

/// Result of one capture, before it becomes a document.
#[derive(Clone, Debug)]
pub struct CapturedStill {
    pub snapshot: GeometrySnapshot,
    /// Mapped region, unclamped.
    pub source_rect: SourceRect,
    /// Region actually cut from the frame.
    pub pixel_rect: PixelRect,
    /// Encoded still dimensions.
    pub size: Size,
    pub jpeg: Vec<u8>,
}

pub struct StillCapture {
    mode: CropMode,
    preset: StillPreset,
    jpeg_quality: u8,
    resizer: Resizer,
    staging: Staging,
    taken: usize,
}

impl StillCapture {
    pub fn new(config: &LensConfig) -> Self {
        Self {
            mode: config.crop_mode,
            preset: config.still_preset,
            jpeg_quality: config.jpeg_quality,
            resizer: Resizer::new(),
            staging: Staging::with_capacity(0),
            taken: 0,
        }
    }

    /// Number of stills turned into documents so far.
    pub fn taken(&self) -> usize {
        self.taken
    }

    /// Capture and wrap the still as the next `Photo N` document.
    pub async fn capture<S, V>(&mut self, source: &mut S, viewfinder: &V) -> LensResult<DocItem>
    where
        S: FrameSource + ?Sized,
        V: Viewfinder + ?Sized,
    {
        let still = self.capture_still(source, viewfinder).await?;
        self.taken += 1;
        Ok(DocItem::captured_photo(self.taken, &still.jpeg))
    }

    pub async fn capture_still<S, V>(
        &mut self,
        source: &mut S,
        viewfinder: &V,
    ) -> LensResult<CapturedStill>
    where
        S: FrameSource + ?Sized,
        V: Viewfinder + ?Sized,
    {
        let snapshot = snapshot(source, viewfinder)?;

        let source_rect = self
            .mode
            .source_rect(snapshot.frame, snapshot.container, snapshot.guide)?;
        if !source_rect.within(snapshot.frame, 1e-6) {
            warn!(
                ?source_rect,
                frame = ?snapshot.frame,
                "guide maps outside the frame, clamping"
            );
        }
        let clamped = source_rect.clamp_to(snapshot.frame);
        let pixel_rect = clamped.to_pixel_rect(snapshot.frame)?;

        let frame = source.grab_rgba().await?;
        if frame.geometry() != snapshot.frame {
            return Err(LensError::capture(
                source.name().to_string(),
                format!(
                    "frame geometry changed from {}x{} to {}x{} during capture",
                    snapshot.frame.width, snapshot.frame.height, frame.width, frame.height
                ),
            )
            .retryable());
        }

        let plan = self.preset.plan(Size {
            w: pixel_rect.width,
            h: pixel_rect.height,
        });
        let rgba = self.extract(&frame, &clamped, pixel_rect, &plan)?;
        let jpeg = encode_jpeg(rgba, plan.out, self.jpeg_quality)?;

        info!(
            device = source.name(),
            x = pixel_rect.x,
            y = pixel_rect.y,
            w = pixel_rect.width,
            h = pixel_rect.height,
            out_w = plan.out.w,
            out_h = plan.out.h,
            bytes = jpeg.len(),
            "captured still"
        );

        Ok(CapturedStill {
            snapshot,
            source_rect,
            pixel_rect,
            size: plan.out,
            jpeg,
        })
    }

    fn extract(
        &mut self,
        frame: &RgbaFrame,
        clamped: &SourceRect,
        pixel_rect: PixelRect,
        plan: &ScalePlan,
    ) -> LensResult<Vec<u8>> {
        let src_size = Size {
            w: frame.width,
            h: frame.height,
        };

        if plan.is_identity() {
            return Ok(copy_region_rgba(
                &frame.data,
                src_size,
                Some(frame.stride),
                pixel_rect,
            )?);
        }

        let mut out = vec![0u8; plan.out.w as usize * plan.out.h as usize * 4];
        crop_scale_rgba_cpu(
            &mut self.resizer,
            &frame.data,
            src_size,
            Some(frame.stride),
            clamped,
            plan,
            &mut out,
            Some(&mut self.staging),
        )?;
        Ok(out)
    }
}

/// Read all three geometries, back-to-back, for one capture event.
fn snapshot<S, V>(source: &S, viewfinder: &V) -> LensResult<GeometrySnapshot>
where
    S: FrameSource + ?Sized,
    V: Viewfinder + ?Sized,
{
    let frame = source.frame_geometry();
    let container = viewfinder.container();
    let guide = viewfinder.guide();

    let frame = frame
        .filter(|f| f.width > 0 && f.height > 0)
        .ok_or_else(|| {
            LensError::capture(source.name().to_string(), "device is not delivering frames yet")
                .retryable()
                .with_recovery_suggestion("Wait for the preview to start, then press the shutter again")
        })?;

    debug!(?frame, ?container, ?guide, "geometry snapshot");
    Ok(GeometrySnapshot {
        frame,
        container,
        guide,
    })
}

fn encode_jpeg(rgba: Vec<u8>, size: Size, quality: u8) -> LensResult<Vec<u8>> {
    let image = RgbaImage::from_raw(size.w, size.h, rgba).ok_or_else(|| {
        LensError::processing("encode_jpeg", "pixel buffer does not match still size")
    })?;
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out.into_inner())
}
