// SPDX-License-Identifier: MIT
// CPU region extraction built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};
use crate::viewport::{PixelRect, SourceRect};

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall,
    RegionOutOfBounds,
    StrideMismatchAndNoStaging,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall => write!(f, "Buffer too small for the requested image"),
            ScaleError::RegionOutOfBounds => write!(f, "Crop region lies outside the source frame"),
            ScaleError::StrideMismatchAndNoStaging => write!(f, "Stride mismatch but no staging buffer provided"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Pre-allocated scratch to compact strided input to tightly packed rows (only if needed).
pub struct Staging {
    pub(crate) buf: Vec<u8>,
}
impl Staging {
    pub fn with_capacity(cap: usize) -> Self { Self { buf: Vec::with_capacity(cap) } }
    pub fn ensure_len(&mut self, len: usize) { if self.buf.len() < len { self.buf.resize(len, 0); } }
    pub fn as_slice(&self) -> &[u8] { &self.buf }
}

/// Crop `region` (sub-pixel, native coordinates) out of `src_rgba` and resample
/// it to `plan.out` into `dst`.
/// `src_stride_bytes`: bytes per row of source. If `Some(stride) != width*4`, rows are compacted into staging.
/// `dst` must hold at least `plan.out.w * plan.out.h * 4` bytes.
pub fn crop_scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    src: Size,
    src_stride_bytes: Option<usize>,
    region: &SourceRect,
    plan: &ScalePlan,
    dst: &mut [u8],
    mut staging: Option<&mut Staging>,
) -> Result<(), ScaleError> {
    let dst_len = (plan.out.w as usize) * (plan.out.h as usize) * 4;
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }
    if region.is_degenerate()
        || region.x < 0.0
        || region.y < 0.0
        || region.x + region.width > src.w as f64 + 1e-6
        || region.y + region.height > src.h as f64 + 1e-6
    {
        return Err(ScaleError::RegionOutOfBounds);
    }

    let tight_row_bytes = (src.w as usize) * 4;
    let src_view: TypedImageRef<U8x4> = match src_stride_bytes {
        Some(pitch) if pitch != tight_row_bytes => {
            check_source_len(src_rgba, src, pitch)?;
            let st = staging.as_deref_mut().ok_or(ScaleError::StrideMismatchAndNoStaging)?;
            st.ensure_len(tight_row_bytes * (src.h as usize));
            compact_rows(src_rgba, pitch, st.buf.as_mut_slice(), tight_row_bytes, src.h as usize);
            TypedImageRef::<U8x4>::from_buffer(src.w, src.h, st.as_slice())?
        }
        _ => TypedImageRef::<U8x4>::from_buffer(src.w, src.h, src_rgba)?,
    };

    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    let width = region.width.min(src.w as f64 - region.x);
    let height = region.height.min(src.h as f64 - region.y);
    let opts = ResizeOptions::new()
        .crop(region.x, region.y, width, height)
        .use_alpha(false);

    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

/// Copy an integer region without resampling; returns tightly packed RGBA rows.
pub fn copy_region_rgba(
    src_rgba: &[u8],
    src: Size,
    src_stride_bytes: Option<usize>,
    rect: PixelRect,
) -> Result<Vec<u8>, ScaleError> {
    let pitch = src_stride_bytes.unwrap_or(src.w as usize * 4);
    if rect.width == 0
        || rect.height == 0
        || rect.x as u64 + rect.width as u64 > src.w as u64
        || rect.y as u64 + rect.height as u64 > src.h as u64
    {
        return Err(ScaleError::RegionOutOfBounds);
    }
    check_source_len(src_rgba, src, pitch)?;

    let row_bytes = rect.width as usize * 4;
    let mut out = vec![0u8; row_bytes * rect.height as usize];
    for (r, d) in out.chunks_exact_mut(row_bytes).enumerate() {
        let start = (rect.y as usize + r) * pitch + rect.x as usize * 4;
        d.copy_from_slice(&src_rgba[start..start + row_bytes]);
    }
    Ok(out)
}

/// Every row must fit in `pitch`, and the last row needs only its pixels.
fn check_source_len(src_rgba: &[u8], src: Size, pitch: usize) -> Result<(), ScaleError> {
    let row_bytes = src.w as usize * 4;
    if pitch < row_bytes {
        return Err(ScaleError::BufferTooSmall);
    }
    let needed = match src.h as usize {
        0 => 0,
        h => pitch * (h - 1) + row_bytes,
    };
    if src_rgba.len() < needed {
        return Err(ScaleError::BufferTooSmall);
    }
    Ok(())
}

#[inline]
fn compact_rows(src: &[u8], src_pitch: usize, dst: &mut [u8], row_bytes: usize, rows: usize) {
    for r in 0..rows {
        let s = &src[r * src_pitch .. r * src_pitch + row_bytes];
        let d = &mut dst[r * row_bytes .. (r + 1) * row_bytes];
        d.copy_from_slice(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::build_plan;

    /// Frame where every pixel encodes its own coordinates.
    fn coord_frame(w: u32, h: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        data
    }

    #[test]
    fn copy_region_picks_exact_pixels() {
        let size = Size { w: 8, h: 6 };
        let data = coord_frame(size.w, size.h);
        let rect = PixelRect { x: 2, y: 1, width: 3, height: 2 };

        let out = copy_region_rgba(&data, size, None, rect).unwrap();
        assert_eq!(out.len(), 3 * 2 * 4);
        assert_eq!(&out[0..4], &[2, 1, 0, 255]);
        assert_eq!(&out[8..12], &[4, 1, 0, 255]);
        assert_eq!(&out[12..16], &[2, 2, 0, 255]);
    }

    #[test]
    fn copy_region_honours_stride() {
        let size = Size { w: 4, h: 3 };
        let pitch = 4 * 4 + 8; // padded rows
        let mut data = vec![0u8; pitch * 3];
        for y in 0..3usize {
            for x in 0..4usize {
                let i = y * pitch + x * 4;
                data[i..i + 4].copy_from_slice(&[x as u8, y as u8, 7, 255]);
            }
        }
        let out = copy_region_rgba(&data, size, Some(pitch), PixelRect { x: 1, y: 2, width: 2, height: 1 }).unwrap();
        assert_eq!(out, vec![1, 2, 7, 255, 2, 2, 7, 255]);
    }

    #[test]
    fn copy_region_rejects_overhang() {
        let size = Size { w: 8, h: 6 };
        let data = coord_frame(size.w, size.h);
        let rect = PixelRect { x: 6, y: 0, width: 3, height: 2 };
        assert!(matches!(
            copy_region_rgba(&data, size, None, rect),
            Err(ScaleError::RegionOutOfBounds)
        ));
    }

    #[test]
    fn copy_region_rejects_rect_past_u32_range() {
        let size = Size { w: 8, h: 6 };
        let data = coord_frame(size.w, size.h);
        for rect in [
            PixelRect { x: u32::MAX, y: 0, width: 2, height: 1 },
            PixelRect { x: 0, y: u32::MAX - 1, width: 1, height: 4 },
        ] {
            assert!(matches!(
                copy_region_rgba(&data, size, None, rect),
                Err(ScaleError::RegionOutOfBounds)
            ));
        }
    }

    #[test]
    fn copy_region_rejects_pitch_shorter_than_a_row() {
        let size = Size { w: 4, h: 4 };
        let data = vec![0u8; 32];
        let rect = PixelRect { x: 0, y: 0, width: 4, height: 4 };
        assert!(matches!(
            copy_region_rgba(&data, size, Some(8), rect),
            Err(ScaleError::BufferTooSmall)
        ));
    }

    #[test]
    fn crop_scale_rejects_pitch_shorter_than_a_row() {
        let size = Size { w: 4, h: 4 };
        let data = vec![0u8; 32];
        let region = SourceRect { x: 0.0, y: 0.0, width: 4.0, height: 4.0 };
        let plan = build_plan(Size { w: 4, h: 4 }, None);
        let mut dst = vec![0u8; 4 * 4 * 4];
        let mut staging = Staging::with_capacity(64);

        let err = crop_scale_rgba_cpu(
            &mut Resizer::new(),
            &data,
            size,
            Some(8),
            &region,
            &plan,
            &mut dst,
            Some(&mut staging),
        );
        assert!(matches!(err, Err(ScaleError::BufferTooSmall)));
    }

    #[test]
    fn crop_scale_accepts_short_last_row() {
        // padded pitch, but the final row carries only its pixels
        let size = Size { w: 4, h: 3 };
        let pitch = 4 * 4 + 8;
        let data: Vec<u8> = [9u8, 9, 9, 255].repeat(pitch / 4 * 2 + 4);
        assert_eq!(data.len(), pitch * 2 + 16);
        let region = SourceRect { x: 0.0, y: 0.0, width: 4.0, height: 3.0 };
        let plan = build_plan(Size { w: 4, h: 3 }, None);
        let mut dst = vec![0u8; 4 * 3 * 4];
        let mut staging = Staging::with_capacity(48);

        crop_scale_rgba_cpu(
            &mut Resizer::new(),
            &data,
            size,
            Some(pitch),
            &region,
            &plan,
            &mut dst,
            Some(&mut staging),
        )
        .unwrap();
        assert!(dst.chunks_exact(4).all(|px| px[0].abs_diff(9) <= 1));
    }

    #[test]
    fn crop_scale_keeps_flat_colour() {
        let size = Size { w: 16, h: 12 };
        let data: Vec<u8> = [40u8, 80, 120, 255].repeat((size.w * size.h) as usize);
        let region = SourceRect { x: 4.0, y: 2.0, width: 8.0, height: 8.0 };
        let plan = build_plan(Size { w: 8, h: 8 }, Some(crate::presets::ScaleTarget::MaxLongSide(4)));
        let mut dst = vec![0u8; (plan.out.w * plan.out.h * 4) as usize];

        let mut resizer = Resizer::new();
        crop_scale_rgba_cpu(&mut resizer, &data, size, None, &region, &plan, &mut dst, None).unwrap();

        for px in dst.chunks_exact(4) {
            assert!((px[0] as i16 - 40).abs() <= 1);
            assert!((px[1] as i16 - 80).abs() <= 1);
            assert!((px[2] as i16 - 120).abs() <= 1);
        }
    }

    #[test]
    fn crop_scale_rejects_region_outside_frame() {
        let size = Size { w: 16, h: 12 };
        let data = vec![0u8; (size.w * size.h * 4) as usize];
        let region = SourceRect { x: 10.0, y: 0.0, width: 8.0, height: 4.0 };
        let plan = build_plan(Size { w: 8, h: 4 }, None);
        let mut dst = vec![0u8; 8 * 4 * 4];

        let err = crop_scale_rgba_cpu(&mut Resizer::new(), &data, size, None, &region, &plan, &mut dst, None);
        assert!(matches!(err, Err(ScaleError::RegionOutOfBounds)));
    }

    #[test]
    fn crop_scale_needs_room_in_dst() {
        let size = Size { w: 16, h: 12 };
        let data = vec![0u8; (size.w * size.h * 4) as usize];
        let region = SourceRect { x: 0.0, y: 0.0, width: 8.0, height: 4.0 };
        let plan = build_plan(Size { w: 8, h: 4 }, None);
        let mut dst = vec![0u8; 10];

        let err = crop_scale_rgba_cpu(&mut Resizer::new(), &data, size, None, &region, &plan, &mut dst, None);
        assert!(matches!(err, Err(ScaleError::BufferTooSmall)));
    }
}
