//! # DiffLens
//!
//! Compare two sets of documents (scanned pages, photos, text and office
//! files) with a generative model and get a structured Markdown report of
//! what changed.
//!
//! ## Architecture
//!
//! - `capture`: guided still capture; the viewfinder guide is mapped to the
//!   native frame with `lens_crop::viewport` before cropping
//! - `documents`: document items and the two comparison collections
//! - `analysis`: request assembly and the Gemini `generateContent` client
//! - `credentials`: API key storage
//! - `app`: navigation state of a comparison session
//! - `report`: line renderer for the returned Markdown
//! - `config`: run settings and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use difflens::analysis::{AnalysisRequest, GeminiClient};
//! use difflens::app::AppState;
//! use difflens::config::LensConfig;
//! use difflens::documents::{DocItem, DocSet};
//! use difflens::app::AppEvent;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new(&LensConfig::default(), "AIzaSyExample123")?;
//!
//! let state = AppState::initial(true)
//!     .apply(AppEvent::OpenUpload)?
//!     .apply(AppEvent::SelectSet(DocSet::First))?
//!     .apply(AppEvent::ItemsSaved(vec![DocItem::text("v1.txt", "total: 10")]))?
//!     .apply(AppEvent::OpenUpload)?
//!     .apply(AppEvent::SelectSet(DocSet::Second))?
//!     .apply(AppEvent::ItemsSaved(vec![DocItem::text("v2.txt", "total: 12")]))?;
//!
//! let state = difflens::run_analysis(&client, state).await?;
//! println!("{:?}", state.analysis);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod credentials;
pub mod documents;
pub mod error;
pub mod report;

use tracing::{info, warn};

use analysis::{AnalysisEndpoint, AnalysisRequest};
use app::{AppEvent, AppState, Screen};

/// Re-export error types for convenience
pub use error::{HasRecoverySuggestion, LensError, LensResult, Retryable};

/// Re-export the geometry crate
pub use lens_crop;

/// Start an analysis from the home screen and record its outcome.
///
/// Without a credential the state moves to key entry and no request is made.
/// Endpoint failures end up in [`app::AnalysisStatus::Failed`] with their
/// context and hint; only invalid transitions are returned as errors.
pub async fn run_analysis(
    endpoint: &dyn AnalysisEndpoint,
    state: AppState,
) -> LensResult<AppState> {
    let state = state.apply(AppEvent::AnalysisStarted)?;
    if state.screen != Screen::AnalysisResult {
        warn!(screen = %state.screen, "analysis not started");
        return Ok(state);
    }

    let request = AnalysisRequest::new(state.first.clone(), state.second.clone());
    let outcome = match endpoint.analyze(&request).await {
        Ok(report) => {
            info!(endpoint = endpoint.name(), chars = report.len(), "analysis finished");
            Ok(report)
        }
        Err(e) => {
            warn!(endpoint = endpoint.name(), error = %e, "analysis failed");
            Err(e.describe())
        }
    };
    state.apply(AppEvent::AnalysisFinished(outcome))
}
