//! Session flow: collect both sets, analyse, show the report, dismiss.

mod common;

use common::{PatternSource, ScriptedEndpoint};
use difflens::analysis::gemini::build_request_body;
use difflens::analysis::AnalysisRequest;
use difflens::app::{AnalysisStatus, AppEvent, AppState, Screen};
use difflens::capture::{FixedViewfinder, StillCapture};
use difflens::config::LensConfig;
use difflens::credentials::{CredentialStore, MemoryCredentialStore};
use difflens::documents::{self, DocItem, DocSet};
use difflens::lens_crop::viewport::ContainerGeometry;
use difflens::report::{self, ReportLine};
use difflens::{run_analysis, LensError};

const REPORT: &str = "## Summary\nTotals differ.\n### Details\n- Page 2: amount 10 → 12\n**Conclusion**: deviation";

fn upload(state: AppState, set: DocSet, items: Vec<DocItem>) -> AppState {
    state
        .apply(AppEvent::OpenUpload)
        .unwrap()
        .apply(AppEvent::SelectSet(set))
        .unwrap()
        .apply(AppEvent::ItemsSaved(items))
        .unwrap()
}

#[tokio::test]
async fn full_session_produces_a_report_and_resets() {
    let store = MemoryCredentialStore::new();
    store.set("AIzaSyExample123").unwrap();
    let state = AppState::initial(store.get().unwrap().is_some());
    assert_eq!(state.screen, Screen::Home);

    // Set 1 from files, Set 2 from the camera
    let state = upload(
        state,
        DocSet::First,
        vec![
            documents::ingest_bytes("invoice.txt", b"amount: 10").unwrap(),
            documents::ingest_bytes("scan.png", &[0x89, b'P', b'N', b'G']).unwrap(),
        ],
    );

    let mut source = PatternSource::new(640, 480);
    let viewfinder = FixedViewfinder::new(ContainerGeometry { width: 320.0, height: 240.0 }, 20.0, 0.75);
    let photo = StillCapture::new(&LensConfig::default())
        .capture(&mut source, &viewfinder)
        .await
        .unwrap();

    let state = state
        .apply(AppEvent::OpenCamera)
        .unwrap()
        .apply(AppEvent::SelectSet(DocSet::Second))
        .unwrap();
    assert_eq!(state.screen, Screen::CameraCapture);
    let state = state.apply(AppEvent::ItemsSaved(vec![photo])).unwrap();

    assert_eq!(state.first.len(), 2);
    assert_eq!(state.second.len(), 1);

    let endpoint = ScriptedEndpoint::replying(REPORT);
    let state = run_analysis(&endpoint, state).await.unwrap();

    assert_eq!(state.screen, Screen::AnalysisResult);
    assert_eq!(state.analysis, AnalysisStatus::Done(REPORT.to_string()));
    assert_eq!(endpoint.calls(), 1);
    {
        let seen = endpoint.seen.lock().unwrap();
        assert_eq!(seen[0].first.items()[0].name, "invoice.txt");
        assert_eq!(seen[0].second.items()[0].name, "Photo 1");
    }

    let lines = report::parse(REPORT);
    assert_eq!(lines[0], ReportLine::Heading("Summary".into()));
    assert_eq!(lines[2], ReportLine::Subheading("Details".into()));
    assert_eq!(lines[3], ReportLine::Bullet("Page 2: amount 10 → 12".into()));
    assert_eq!(lines[4], ReportLine::Emphasis("Conclusion: deviation".into()));

    let state = state.apply(AppEvent::Dismiss).unwrap();
    assert_eq!(state.screen, Screen::Home);
    assert!(state.first.is_empty() && state.second.is_empty());
    assert_eq!(state.analysis, AnalysisStatus::Idle);
}

#[tokio::test]
async fn missing_credential_redirects_to_key_entry() {
    let state = AppState::initial(false)
        .apply(AppEvent::CredentialSaved)
        .unwrap()
        .apply(AppEvent::CredentialReset)
        .unwrap();
    assert_eq!(state.screen, Screen::ApiKeyInput);

    let state = state.apply(AppEvent::CredentialSaved).unwrap();
    let state = upload(state, DocSet::First, vec![DocItem::text("a.txt", "a")]);
    let state = AppState {
        has_credential: false,
        ..state
    };

    let endpoint = ScriptedEndpoint::replying("unused");
    let state = run_analysis(&endpoint, state).await.unwrap();
    assert_eq!(state.screen, Screen::ApiKeyInput);
    assert_eq!(endpoint.calls(), 0);
    // collected documents survive the detour
    assert_eq!(state.first.len(), 1);
}

#[tokio::test]
async fn endpoint_failure_is_shown_not_raised() {
    let state = upload(AppState::initial(true), DocSet::Second, vec![DocItem::text("b.txt", "b")]);
    let endpoint = ScriptedEndpoint::failing(|| {
        LensError::analysis("generate_content", "blocked (SAFETY)")
            .with_recovery_suggestion("Remove sensitive content from the documents and retry")
    });

    let state = run_analysis(&endpoint, state).await.unwrap();
    match &state.analysis {
        AnalysisStatus::Failed(message) => {
            assert!(message.contains("blocked"));
            assert!(message.contains("hint: Remove sensitive content"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // a failed analysis can still be dismissed
    let state = state.apply(AppEvent::Dismiss).unwrap();
    assert_eq!(state.screen, Screen::Home);
}

#[tokio::test]
async fn empty_sets_fail_without_a_request_body() {
    let endpoint = ScriptedEndpoint::replying("unused");
    let state = run_analysis(&endpoint, AppState::initial(true)).await.unwrap();
    assert!(matches!(state.analysis, AnalysisStatus::Failed(_)));
    assert_eq!(endpoint.calls(), 0);
}

#[test]
fn invalid_transitions_are_rejected() {
    let home = AppState::initial(true);
    assert!(home.clone().apply(AppEvent::SelectSet(DocSet::First)).is_err());
    assert!(home.clone().apply(AppEvent::ItemsSaved(vec![])).is_err());
    assert!(home.clone().apply(AppEvent::AnalysisFinished(Ok("x".into()))).is_err());

    let key_entry = AppState::initial(false);
    assert!(key_entry.apply(AppEvent::OpenCamera).is_err());

    let running = home.apply(AppEvent::AnalysisStarted).unwrap();
    assert_eq!(running.analysis, AnalysisStatus::Running);
    let err = running.apply(AppEvent::Dismiss).unwrap_err();
    assert_eq!(err.category(), "state");
}

#[test]
fn close_returns_home_without_saving() {
    let state = AppState::initial(true)
        .apply(AppEvent::OpenUpload)
        .unwrap()
        .apply(AppEvent::SelectSet(DocSet::First))
        .unwrap()
        .apply(AppEvent::Close)
        .unwrap();
    assert_eq!(state.screen, Screen::Home);
    assert!(state.first.is_empty());
}

#[test]
fn request_body_keeps_set_sections_in_order() {
    let request = AnalysisRequest::new(
        [DocItem::text("v1.txt", "one"), DocItem::text("v1b.txt", "one b")].into_iter().collect(),
        [DocItem::from_data_url("shot", "data:image/png;base64,iVBORw0KGgo=").unwrap()]
            .into_iter()
            .collect(),
    );
    let body = build_request_body(&request, 0);
    let texts: Vec<String> = body["contents"][0]["parts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["text"].as_str().map(str::to_string))
        .collect();

    let set1 = texts.iter().position(|t| t.contains("(SET 1)")).unwrap();
    let set2 = texts.iter().position(|t| t.contains("(SET 2)")).unwrap();
    let v1 = texts.iter().position(|t| t == "File name: v1.txt\n").unwrap();
    let v1b = texts.iter().position(|t| t == "File name: v1b.txt\n").unwrap();
    let shot = texts.iter().position(|t| t == "File name: shot\n").unwrap();
    assert!(set1 < v1 && v1 < v1b && v1b < set2 && set2 < shot);

    let inline = body["contents"][0]["parts"]
        .as_array()
        .unwrap()
        .iter()
        .find_map(|p| p.get("inline_data"))
        .unwrap();
    assert_eq!(inline["mime_type"], "image/png");
    assert_eq!(inline["data"], "iVBORw0KGgo=");
}

#[test]
fn office_uploads_travel_as_text_not_inline_data() {
    let request = AnalysisRequest::new(
        [documents::ingest_bytes("contract.docx", b"PK\x03\x04").unwrap()]
            .into_iter()
            .collect(),
        [documents::ingest_bytes("contract.pdf", b"%PDF-1.7").unwrap()]
            .into_iter()
            .collect(),
    );
    let body = build_request_body(&request, 0);
    let parts = body["contents"][0]["parts"].as_array().unwrap();

    let docx = parts
        .iter()
        .position(|p| p["text"] == "File name: contract.docx\n")
        .unwrap();
    let content = parts[docx + 1]["text"].as_str().unwrap();
    assert!(content.starts_with(
        "Content:\ndata:application/vnd.openxmlformats-officedocument.wordprocessingml.document;base64,"
    ));
    assert!(parts[docx + 1].get("inline_data").is_none());

    let inline: Vec<&str> = parts
        .iter()
        .filter_map(|p| p["inline_data"]["mime_type"].as_str())
        .collect();
    assert_eq!(inline, vec!["application/pdf"]);
}
