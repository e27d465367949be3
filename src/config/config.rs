//! # Configuration
//!
//! Settings for one comparison run. The CLI fills these from flags and
//! `DIFFLENS_*` environment variables; library users build them directly.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `model` | `String` | non-empty | Generative model id |
//! | `api_base` | `String` | http(s) URL | Endpoint root |
//! | `timeout_secs` | `u64` | 1-600 | Whole-request timeout |
//! | `jpeg_quality` | `u8` | 1-100 | Quality of captured stills |
//! | `still_preset` | `StillPreset` | - | Long-side bound for stills |
//! | `crop_mode` | `CropMode` | - | Guided crop or legacy full frame |
//! | `guide_padding` | `f64` | >= 0 | Overlay inset in container units |
//! | `guide_height_fraction` | `f64` | (0, 1] | Guide height within the inset |
//!
//! ## Examples
//!
//! ```rust
//! use difflens::config::LensConfig;
//!
//! let mut config = LensConfig::default();
//! config.jpeg_quality = 90;
//! assert!(config.validate().is_ok());
//! ```

use lens_crop::presets::StillPreset;
use lens_crop::viewport::CropMode;

use crate::error::{LensError, LensResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq)]
pub struct LensConfig {
    /// Model id used for `generateContent`.
    pub model: String,

    /// Scheme and host of the generative language API, without a trailing slash.
    pub api_base: String,

    /// Upper bound for the whole analysis request, in seconds.
    ///
    /// Image-heavy comparisons can take a while; the default leaves room for
    /// a dozen pages per set.
    pub timeout_secs: u64,

    /// JPEG quality of captured stills (80 matches a typical camera app export).
    pub jpeg_quality: u8,

    /// Long-side bound applied to captured stills before upload.
    pub still_preset: StillPreset,

    /// Guided crop, or the legacy full-frame capture.
    pub crop_mode: CropMode,

    /// Inset of the guide overlay from each container edge.
    pub guide_padding: f64,

    /// Fraction of the inset height the guide occupies.
    pub guide_height_fraction: f64,

    /// Thinking budget passed to the model; 0 disables thinking.
    pub thinking_budget: i32,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 120,
            jpeg_quality: 80,
            still_preset: StillPreset::default(),
            crop_mode: CropMode::default(),
            guide_padding: 40.0,
            guide_height_fraction: 0.75,
            thinking_budget: 0,
        }
    }
}

impl LensConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> LensResult<()> {
        if self.model.trim().is_empty() {
            return Err(LensError::config("model", &self.model, "must not be empty"));
        }
        if !(self.api_base.starts_with("https://") || self.api_base.starts_with("http://")) {
            return Err(LensError::config(
                "api_base",
                &self.api_base,
                "must start with http:// or https://",
            ));
        }
        if !(1..=600).contains(&self.timeout_secs) {
            return Err(LensError::config(
                "timeout_secs",
                self.timeout_secs.to_string(),
                "must be between 1 and 600",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LensError::config(
                "jpeg_quality",
                self.jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        if !self.guide_padding.is_finite() || self.guide_padding < 0.0 {
            return Err(LensError::config(
                "guide_padding",
                self.guide_padding.to_string(),
                "must be a non-negative number",
            ));
        }
        if !(self.guide_height_fraction > 0.0 && self.guide_height_fraction <= 1.0) {
            return Err(LensError::config(
                "guide_height_fraction",
                self.guide_height_fraction.to_string(),
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// `generateContent` URL for the configured model.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
