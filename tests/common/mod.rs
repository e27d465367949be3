//! Shared fakes for the DiffLens integration tests.
//!
//! Nothing here touches a camera or the network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use difflens::analysis::{AnalysisEndpoint, AnalysisRequest};
use difflens::capture::{FrameSource, RgbaFrame};
use difflens::lens_crop::viewport::FrameGeometry;
use difflens::{LensError, LensResult};

/// Frame source whose pixels encode their own coordinates:
/// R = x mod 256, G = y mod 256, B = 0, A = 255.
pub struct PatternSource {
    pub geometry: Option<FrameGeometry>,
    pub grabs: usize,
}

impl PatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            geometry: Some(FrameGeometry { width, height }),
            grabs: 0,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            geometry: None,
            grabs: 0,
        }
    }
}

#[async_trait(?Send)]
impl FrameSource for PatternSource {
    fn frame_geometry(&self) -> Option<FrameGeometry> {
        self.geometry
    }

    async fn grab_rgba(&mut self) -> LensResult<RgbaFrame> {
        let geometry = self
            .geometry
            .ok_or_else(|| LensError::capture("pattern", "no frames"))?;
        self.grabs += 1;

        let (w, h) = (geometry.width, geometry.height);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0, 255]);
            }
        }
        Ok(RgbaFrame {
            data: Arc::new(data),
            width: w,
            height: h,
            stride: w as usize * 4,
        })
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

/// Endpoint that answers from a script and records what it was asked.
pub struct ScriptedEndpoint {
    reply: Result<String, fn() -> LensError>,
    pub seen: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedEndpoint {
    pub fn replying(markdown: &str) -> Self {
        Self {
            reply: Ok(markdown.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> LensError) -> Self {
        Self {
            reply: Err(error),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisEndpoint for ScriptedEndpoint {
    async fn analyze(&self, request: &AnalysisRequest) -> LensResult<String> {
        request.ensure_sendable()?;
        self.seen.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(markdown) => Ok(markdown.clone()),
            Err(make) => Err(make()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
