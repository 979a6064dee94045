//! End-to-end chat flows against a mock analysis backend

use std::time::Duration;

use estate_chat::app::App;
use estate_chat::chart::project_chart;
use estate_chat::table::project_table;
use estate_chat::{AnalysisClient, ChatSession, Config, Overrides, Role};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANALYZE_PATH: &str = "/api/analyze/";

async fn backend_answering(body: serde_json::Value, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ANALYZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> AnalysisClient {
    AnalysisClient::new(&format!("{}{}", server.uri(), ANALYZE_PATH))
}

fn app_for(server: &MockServer) -> App {
    let settings = Config::new().resolve(&Overrides::default());
    App::new(client_for(server), &settings)
}

/// Poll the app the way the event loop does until the request settles.
async fn settle(app: &mut App) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.is_pending() {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.poll_in_flight().await;
        }
    })
    .await
    .expect("request should settle");
}

#[tokio::test]
async fn wakad_scenario_renders_summary_and_chart() {
    let server = backend_answering(
        json!({
            "success": true,
            "summary": "Wakad avg price ₹65L",
            "chart_data": { "labels": ["2021", "2022", "2023"], "values": [50, 58, 65] }
        }),
        Duration::ZERO,
    )
    .await;

    let mut session = ChatSession::new();
    session.set_draft("Analyze Wakad");
    session.submit(&client_for(&server)).await;

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].text, "Wakad avg price ₹65L");
    assert!(!session.is_pending());

    let spec = project_chart(history[1].chart_data.as_ref().unwrap()).unwrap();
    assert_eq!(spec.labels.len(), 3);
    assert_eq!(spec.points.len(), 3);
}

#[tokio::test]
async fn no_data_scenario_reports_backend_error() {
    let server = backend_answering(
        json!({ "success": false, "error": "No data found" }),
        Duration::ZERO,
    )
    .await;

    let mut session = ChatSession::new();
    session.set_draft("XYZ");
    session.submit(&client_for(&server)).await;

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].text, "❌ Error: No data found");
}

#[tokio::test]
async fn connection_error_scenario() {
    let mut session = ChatSession::new();
    session.set_draft("Analyze Wakad");
    session
        .submit(&AnalysisClient::new("http://127.0.0.1:9/api/analyze/"))
        .await;

    assert_eq!(session.history().len(), 2);
    assert!(session.history()[1]
        .text
        .starts_with("❌ Error connecting to backend: "));
    assert!(!session.is_pending());
}

#[tokio::test]
async fn raw_query_text_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ANALYZE_PATH))
        .and(body_json(json!({ "query": "  Analyze Wakad  " })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "summary": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ChatSession::new();
    session.set_draft("  Analyze Wakad  ");
    session.submit(&client_for(&server)).await;

    assert_eq!(session.history()[0].text, "Analyze Wakad");
    assert_eq!(session.history()[1].text, "ok");
}

#[tokio::test]
async fn app_runs_request_in_background() {
    let server = backend_answering(
        json!({
            "success": true,
            "summary": "Baner is steady",
            "table_data": [
                { "Area": "Baner", "Price": 70 },
                { "Area": "Aundh", "Price": 68 }
            ]
        }),
        Duration::from_millis(200),
    )
    .await;

    let mut app = app_for(&server);
    app.session.set_draft("Compare Aundh and Baner");
    app.submit();

    // User message is in, request still outstanding
    assert_eq!(app.session.history().len(), 1);
    assert!(app.is_pending());

    // Resubmitting while pending is ignored, but the draft can still change
    app.session.set_draft("another one");
    app.submit();
    assert_eq!(app.session.history().len(), 1);

    settle(&mut app).await;

    assert_eq!(app.session.history().len(), 2);
    assert_eq!(app.session.draft(), "another one");

    let focused = app.focused_data_message().expect("table answer gets focus");
    let view = project_table(focused.table_data.as_ref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(view.headers, vec!["Area", "Price"]);
    assert_eq!(view.rows.len(), 2);
}

#[tokio::test]
async fn clearing_mid_request_keeps_history_empty() {
    let server = backend_answering(
        json!({ "success": true, "summary": "stale answer" }),
        Duration::from_secs(30),
    )
    .await;

    let mut app = app_for(&server);
    app.session.set_draft("Analyze Wakad");
    app.submit();
    assert!(app.is_pending());

    app.clear_chat();
    assert!(app.session.history().is_empty());
    assert!(app.is_pending());

    // Cancellation settles without waiting for the slow backend
    settle(&mut app).await;
    assert!(app.session.history().is_empty());
    assert!(!app.is_pending());
}

#[tokio::test]
async fn cancel_request_unblocks_submission() {
    let server = backend_answering(
        json!({ "success": true, "summary": "too slow" }),
        Duration::from_secs(30),
    )
    .await;

    let mut app = app_for(&server);
    app.session.set_draft("Analyze Wakad");
    app.submit();
    assert!(app.cancel_request());

    settle(&mut app).await;
    assert_eq!(app.session.history().len(), 1);

    app.session.set_draft("Analyze Baner");
    app.submit();
    assert_eq!(app.session.history().len(), 2);
    assert!(app.is_pending());
}
