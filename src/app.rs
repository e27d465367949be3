//! Navigation state of a comparison session.
//!
//! [`AppState::apply`] is a pure reducer: it consumes the state and an event
//! and returns the next state, or a [`LensError::State`] for a transition the
//! current screen does not allow. Front ends (the CLI, a GUI shell) only
//! render the state and feed events back in.

use std::fmt;

use crate::documents::{DocItem, DocSet, DocumentCollection};
use crate::error::{LensError, LensResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    ApiKeyInput,
    Home,
    CameraSelection,
    CameraCapture,
    UploadSelection,
    UploadFile,
    AnalysisResult,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::ApiKeyInput => "api_key_input",
            Screen::Home => "home",
            Screen::CameraSelection => "camera_selection",
            Screen::CameraCapture => "camera_capture",
            Screen::UploadSelection => "upload_selection",
            Screen::UploadFile => "upload_file",
            Screen::AnalysisResult => "analysis_result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Running,
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    CredentialSaved,
    CredentialReset,
    OpenCamera,
    OpenUpload,
    SelectSet(DocSet),
    Close,
    ItemsSaved(Vec<DocItem>),
    AnalysisStarted,
    AnalysisFinished(Result<String, String>),
    Dismiss,
}

impl AppEvent {
    fn name(&self) -> &'static str {
        match self {
            AppEvent::CredentialSaved => "credential_saved",
            AppEvent::CredentialReset => "credential_reset",
            AppEvent::OpenCamera => "open_camera",
            AppEvent::OpenUpload => "open_upload",
            AppEvent::SelectSet(_) => "select_set",
            AppEvent::Close => "close",
            AppEvent::ItemsSaved(_) => "items_saved",
            AppEvent::AnalysisStarted => "analysis_started",
            AppEvent::AnalysisFinished(_) => "analysis_finished",
            AppEvent::Dismiss => "dismiss",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub selected_set: Option<DocSet>,
    pub has_credential: bool,
    pub first: DocumentCollection,
    pub second: DocumentCollection,
    pub analysis: AnalysisStatus,
}

impl AppState {
    /// Home when a key is already stored, key entry otherwise.
    pub fn initial(has_credential: bool) -> Self {
        Self {
            screen: if has_credential {
                Screen::Home
            } else {
                Screen::ApiKeyInput
            },
            selected_set: None,
            has_credential,
            first: DocumentCollection::new(),
            second: DocumentCollection::new(),
            analysis: AnalysisStatus::Idle,
        }
    }

    pub fn set(&self, set: DocSet) -> &DocumentCollection {
        match set {
            DocSet::First => &self.first,
            DocSet::Second => &self.second,
        }
    }

    pub fn apply(self, event: AppEvent) -> LensResult<AppState> {
        use AppEvent as E;
        use Screen as S;

        match (self.screen, event) {
            (S::ApiKeyInput, E::CredentialSaved) => Ok(AppState {
                screen: S::Home,
                has_credential: true,
                ..self
            }),
            (S::Home, E::CredentialReset) => Ok(AppState {
                screen: S::ApiKeyInput,
                has_credential: false,
                ..self
            }),
            (S::Home, E::OpenCamera) => Ok(self.go(S::CameraSelection)),
            (S::Home, E::OpenUpload) => Ok(self.go(S::UploadSelection)),
            (S::CameraSelection, E::SelectSet(set)) => Ok(AppState {
                screen: S::CameraCapture,
                selected_set: Some(set),
                ..self
            }),
            (S::UploadSelection, E::SelectSet(set)) => Ok(AppState {
                screen: S::UploadFile,
                selected_set: Some(set),
                ..self
            }),
            (S::CameraSelection | S::UploadSelection | S::CameraCapture | S::UploadFile, E::Close) => {
                Ok(self.go(S::Home))
            }
            (S::CameraCapture | S::UploadFile, E::ItemsSaved(items)) => self.save_items(items),
            (S::Home, E::AnalysisStarted) if !self.has_credential => Ok(self.go(S::ApiKeyInput)),
            (S::Home, E::AnalysisStarted) => Ok(AppState {
                screen: S::AnalysisResult,
                analysis: AnalysisStatus::Running,
                ..self
            }),
            (S::AnalysisResult, E::AnalysisFinished(outcome))
                if self.analysis == AnalysisStatus::Running =>
            {
                let analysis = match outcome {
                    Ok(report) => AnalysisStatus::Done(report),
                    Err(message) => AnalysisStatus::Failed(message),
                };
                Ok(AppState { analysis, ..self })
            }
            (S::AnalysisResult, E::Dismiss) if self.analysis != AnalysisStatus::Running => {
                Ok(AppState {
                    screen: S::Home,
                    selected_set: None,
                    first: DocumentCollection::new(),
                    second: DocumentCollection::new(),
                    analysis: AnalysisStatus::Idle,
                    ..self
                })
            }
            (screen, event) => Err(LensError::state(
                screen.to_string(),
                event.name(),
                "event not accepted on this screen",
            )),
        }
    }

    fn go(self, screen: Screen) -> Self {
        AppState { screen, ..self }
    }

    fn save_items(self, items: Vec<DocItem>) -> LensResult<AppState> {
        let Some(set) = self.selected_set else {
            return Err(LensError::state(
                self.screen.to_string(),
                "items_saved",
                "no target set selected",
            ));
        };
        let (first, second) = match set {
            DocSet::First => (self.first.with_items(items), self.second.clone()),
            DocSet::Second => (self.first.clone(), self.second.with_items(items)),
        };
        Ok(AppState {
            screen: Screen::Home,
            first,
            second,
            ..self
        })
    }
}
