// SPDX-License-Identifier: MIT
//! # lens-crop: Viewfinder-to-Sensor Crop Mapping
//!
//! This crate turns the crop guide a user sees on screen into the matching
//! region of the camera's native frame, then extracts and downsizes that
//! region so it can be shipped to a vision model as a document still.
//!
//! ## Key Components
//!
//! - [`viewport`]: cover-fit geometry (`object-fit: cover`, center anchored)
//!   and the guide → source rectangle mapping
//! - [`presets`]: long-side bounds for captured stills and plan computation
//! - [`cpu`]: region copy and crop+resize on RGBA8 buffers via fast_image_resize
//!
//! ## Usage Example
//!
//! ```rust
//! use lens_crop::viewport::{compute_source_rect, ContainerGeometry, FrameGeometry, GuideRect};
//!
//! let frame = FrameGeometry { width: 2000, height: 1000 };
//! let container = ContainerGeometry { width: 1000.0, height: 500.0 };
//! let guide = GuideRect { x: 100.0, y: 50.0, width: 800.0, height: 400.0 };
//!
//! let src = compute_source_rect(frame, container, guide).unwrap();
//! assert_eq!((src.x, src.y, src.width, src.height), (200.0, 100.0, 1600.0, 800.0));
//! ```
//!
//! Everything here is pure computation over caller-owned buffers. Reading the
//! geometry snapshots and grabbing the frame is the caller's job.

pub mod cpu;
pub mod presets;
pub mod viewport;
