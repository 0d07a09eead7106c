use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use docchat::AppState;
use docchat::extract::{DocumentExtractor, ExtractionError, TextExtractor};
use docchat::llm::{CompletionClient, LlmError};
use docchat::server::build_app;
use docchat::session::{SessionStore, Speaker};
use docchat::uploads::UploadStore;
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const POLICY: &str = "Policy: refunds within 30 days.";

/// What the stub completion client answers.
#[derive(Debug, Clone)]
enum Reply {
    Answer(&'static str),
    Upstream(u16, &'static str),
    Malformed,
    Slow(Duration),
}

#[derive(Debug)]
struct StubCompletions {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletions {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionClient for StubCompletions {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Answer(text) => Ok((*text).to_string()),
            Reply::Upstream(status, body) => Err(LlmError::Upstream {
                status: *status,
                body: (*body).to_string(),
            }),
            Reply::Malformed => Err(LlmError::MalformedResponse(
                "response has no candidates".to_string(),
            )),
            Reply::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("late".to_string())
            }
        }
    }
}

/// Extractor returning fixed text, so uploads need no real PDF.
#[derive(Debug)]
struct StubExtractor(&'static str);

#[async_trait::async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        Ok(self.0.to_string())
    }
}

/// Extractor that never finishes within a test's request deadline.
#[derive(Debug)]
struct SlowExtractor(Duration);

#[async_trait::async_trait]
impl TextExtractor for SlowExtractor {
    async fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        tokio::time::sleep(self.0).await;
        Ok(POLICY.to_string())
    }
}

struct Harness {
    server: TestServer,
    state: AppState,
    completions: Arc<StubCompletions>,
    upload_dir: TempDir,
}

fn state_for(
    completions: &Arc<StubCompletions>,
    extractor: Arc<dyn TextExtractor>,
    upload_dir: &TempDir,
) -> AppState {
    AppState {
        sessions: SessionStore::new(),
        extractor,
        completions: Arc::clone(completions) as Arc<dyn CompletionClient>,
        uploads: UploadStore::new(upload_dir.path()),
    }
}

fn harness_with(reply: Reply, extractor: Arc<dyn TextExtractor>) -> Harness {
    let upload_dir = tempfile::tempdir().unwrap();
    let completions = Arc::new(StubCompletions::new(reply));
    let state = state_for(&completions, extractor, &upload_dir);
    let app = build_app(state.clone(), Duration::from_secs(30), 10 * 1024 * 1024);

    Harness {
        server: TestServer::new(app).unwrap(),
        state,
        completions,
        upload_dir,
    }
}

fn harness(reply: Reply) -> Harness {
    harness_with(reply, Arc::new(StubExtractor(POLICY)))
}

fn file_form(filename: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(data).file_name(filename))
}

fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn upload_dir_entries(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Upload
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_pdf_creates_session() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("policy.pdf", b"%PDF-1.4".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "File uploaded successfully");
    let session_id = body["session_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(session_id).is_ok());

    assert!(h.state.sessions.contains(session_id));
    let context = h.state.sessions.get_full_context(session_id).unwrap();
    assert!(context.contains(POLICY));

    let stored = h.upload_dir.path().join(session_id).join("policy.pdf");
    assert_eq!(std::fs::read(stored).unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn test_upload_extension_is_case_insensitive() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("REPORT.DOCX", b"data".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(h.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_upload_txt_rejected_without_session() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("notes.txt", b"hello".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "Only PDF or DOCX allowed" })
    );
    assert!(h.state.sessions.is_empty());
    assert_eq!(upload_dir_entries(&h.upload_dir), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let h = harness(Reply::Answer("unused"));

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = h.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "File is required");
    assert!(h.state.sessions.is_empty());
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("", b"data".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "No file selected");
    assert!(h.state.sessions.is_empty());
}

#[tokio::test]
async fn test_upload_with_unsafe_filename() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("../../secret.pdf", b"data".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let session_id = response.json::<Value>()["session_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(
        h.upload_dir
            .path()
            .join(&session_id)
            .join("secret.pdf")
            .exists()
    );
}

#[tokio::test]
async fn test_upload_with_no_safe_filename_characters() {
    let h = harness(Reply::Answer("unused"));

    for name in ["文件", ".."] {
        let response = h
            .server
            .post("/upload")
            .multipart(file_form(name, b"data".to_vec()))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Invalid filename" })
        );
    }

    assert!(h.state.sessions.is_empty());
    assert_eq!(upload_dir_entries(&h.upload_dir), 0);
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let upload_dir = tempfile::tempdir().unwrap();
    let completions = Arc::new(StubCompletions::new(Reply::Answer("unused")));
    let state = state_for(&completions, Arc::new(StubExtractor(POLICY)), &upload_dir);
    let server = TestServer::new(build_app(state.clone(), Duration::from_secs(30), 1024)).unwrap();

    let response = server
        .post("/upload")
        .multipart(file_form("big.pdf", vec![b'x'; 4096]))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(
        response.json::<Value>()["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to read upload")
    );
    assert!(state.sessions.is_empty());
    assert_eq!(upload_dir_entries(&upload_dir), 0);
}

#[tokio::test]
async fn test_upload_timed_out_during_extraction_leaves_nothing() {
    let upload_dir = tempfile::tempdir().unwrap();
    let completions = Arc::new(StubCompletions::new(Reply::Answer("unused")));
    let state = state_for(
        &completions,
        Arc::new(SlowExtractor(Duration::from_secs(5))),
        &upload_dir,
    );
    let server = TestServer::new(build_app(
        state.clone(),
        Duration::from_millis(100),
        1024 * 1024,
    ))
    .unwrap();

    let response = server
        .post("/upload")
        .multipart(file_form("policy.pdf", b"data".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::REQUEST_TIMEOUT);
    assert!(state.sessions.is_empty());

    // The staged file is removed by a background task.
    let mut entries = upload_dir_entries(&upload_dir);
    for _ in 0..100 {
        if entries == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        entries = upload_dir_entries(&upload_dir);
    }
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_upload_docx_extracts_text() {
    let h = harness_with(Reply::Answer("unused"), Arc::new(DocumentExtractor::new()));

    let docx = build_docx(&["Refund policy", "Refunds within 30 days."]);
    let response = h
        .server
        .post("/upload")
        .multipart(file_form("policy.docx", docx))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let session_id = response.json::<Value>()["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let session = h.state.sessions.snapshot(&session_id).unwrap();
    assert_eq!(
        session.document_text.as_deref(),
        Some("Refund policy\nRefunds within 30 days.")
    );
}

#[tokio::test]
async fn test_upload_malformed_document_fails_cleanly() {
    let h = harness_with(Reply::Answer("unused"), Arc::new(DocumentExtractor::new()));

    let response = h
        .server
        .post("/upload")
        .multipart(file_form("broken.docx", b"not a zip".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Failed to extract text"));
    assert!(h.state.sessions.is_empty());
    assert_eq!(upload_dir_entries(&h.upload_dir), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

fn seed_session(state: &AppState, id: &str) {
    state.sessions.create_session(id);
    state.sessions.store_document(id, POLICY).unwrap();
}

#[tokio::test]
async fn test_chat_answers_and_records_exchange() {
    let h = harness(Reply::Answer("30 days"));
    seed_session(&h.state, "S1");

    let response = h
        .server
        .post("/chat")
        .json(&json!({ "session_id": "S1", "question": "What is the refund policy?" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "answer": "30 days" }));

    let prompts = h.completions.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(POLICY));
    assert!(prompts[0].contains("What is the refund policy?"));

    let context = h.state.sessions.get_full_context("S1").unwrap();
    assert!(context.contains("User: What is the refund policy?"));
    assert!(context.contains("Assistant: 30 days"));
}

#[tokio::test]
async fn test_chat_prompt_includes_prior_turns() {
    let h = harness(Reply::Answer("30 days"));
    seed_session(&h.state, "S1");

    for question in ["First question?", "Second question?"] {
        h.server
            .post("/chat")
            .json(&json!({ "session_id": "S1", "question": question }))
            .await
            .assert_status_ok();
    }

    let prompts = h.completions.prompts();
    assert!(!prompts[0].contains("User: First question?"));
    assert!(prompts[1].contains("User: First question?\nAssistant: 30 days"));
}

#[tokio::test]
async fn test_sequential_chats_accumulate_two_turns_each() {
    let h = harness(Reply::Answer("answer"));
    seed_session(&h.state, "S1");

    h.server
        .post("/chat")
        .json(&json!({ "session_id": "S1", "question": "q1" }))
        .await
        .assert_status_ok();
    assert_eq!(h.state.sessions.history("S1").unwrap().len(), 2);

    h.server
        .post("/chat")
        .json(&json!({ "session_id": "S1", "question": "q2" }))
        .await
        .assert_status_ok();

    let history = h.state.sessions.history("S1").unwrap();
    let rendered: Vec<(Speaker, &str)> = history
        .iter()
        .map(|turn| (turn.speaker, turn.message.as_str()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            (Speaker::User, "q1"),
            (Speaker::Assistant, "answer"),
            (Speaker::User, "q2"),
            (Speaker::Assistant, "answer"),
        ]
    );
}

#[tokio::test]
async fn test_chat_missing_fields() {
    let h = harness(Reply::Answer("unused"));
    seed_session(&h.state, "S1");

    for body in [
        json!({ "session_id": "S1" }),
        json!({ "question": "Anything?" }),
        json!({ "session_id": "", "question": "Anything?" }),
        json!({}),
    ] {
        let response = h.server.post("/chat").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "session_id and question required" })
        );
    }
    assert!(h.completions.prompts().is_empty());
}

#[tokio::test]
async fn test_chat_non_json_body() {
    let h = harness(Reply::Answer("unused"));

    let response = h.server.post("/chat").text("session_id=S1").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "session_id and question required"
    );
}

#[tokio::test]
async fn test_chat_unknown_session_is_not_found() {
    let h = harness(Reply::Answer("unused"));

    let response = h
        .server
        .post("/chat")
        .json(&json!({ "session_id": "never-created", "question": "Hello?" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "Session not found: never-created" })
    );
    assert!(h.completions.prompts().is_empty());
    assert!(!h.state.sessions.contains("never-created"));
}

#[tokio::test]
async fn test_chat_upstream_error_passes_body_through() {
    let upstream_body = r#"{"error":{"code":429,"message":"Quota exceeded"}}"#;
    let h = harness(Reply::Upstream(429, upstream_body));
    seed_session(&h.state, "S1");

    let response = h
        .server
        .post("/chat")
        .json(&json!({ "session_id": "S1", "question": "Hello?" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "error": upstream_body }));
    assert!(h.state.sessions.history("S1").unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_malformed_upstream_response() {
    let h = harness(Reply::Malformed);
    seed_session(&h.state, "S1");

    let response = h
        .server
        .post("/chat")
        .json(&json!({ "session_id": "S1", "question": "Hello?" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Malformed upstream response"));
    assert!(h.state.sessions.history("S1").unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_then_chat() {
    let h = harness(Reply::Answer("30 days"));

    let upload = h
        .server
        .post("/upload")
        .multipart(file_form("policy.pdf", b"%PDF-1.4".to_vec()))
        .await;
    let session_id = upload.json::<Value>()["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = h
        .server
        .post("/chat")
        .json(&json!({ "session_id": session_id, "question": "What is the refund policy?" }))
        .await;

    assert_eq!(response.json::<Value>()["answer"], "30 days");
    assert!(h.completions.prompts()[0].contains(POLICY));
}

// ─────────────────────────────────────────────────────────────────────────────
// Inspection
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_history_endpoint() {
    let h = harness(Reply::Answer("unused"));
    seed_session(&h.state, "S1");
    h.state.sessions.record_exchange("S1", "q", "a").unwrap();

    let response = h.server.get("/sessions/S1/history").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!([
            { "speaker": "User", "message": "q" },
            { "speaker": "Assistant", "message": "a" },
        ])
    );

    let missing = h.server.get("/sessions/unknown/history").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_session_count() {
    let h = harness(Reply::Answer("unused"));
    seed_session(&h.state, "S1");

    let response = h.server.get("/health").await;
    assert_eq!(
        response.json::<Value>(),
        json!({ "status": "ok", "sessions": 1 })
    );
}

#[tokio::test]
async fn test_slow_request_times_out() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let upload_dir = tempfile::tempdir().unwrap();
    let completions = Arc::new(StubCompletions::new(Reply::Slow(Duration::from_secs(5))));
    let state = state_for(&completions, Arc::new(StubExtractor(POLICY)), &upload_dir);
    seed_session(&state, "S1");

    let app = build_app(state.clone(), Duration::from_millis(50), 1024 * 1024);
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"session_id":"S1","question":"Hello?"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(state.sessions.history("S1").unwrap().is_empty());
}
