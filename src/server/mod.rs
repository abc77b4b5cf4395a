//! HTTP surface: one multipart POST endpoint per document operation.

mod handlers;
mod upload;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::Result;
use crate::spelling::SpellChecker;
use crate::workspace::RequestWorkspace;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    speller: Option<Arc<SpellChecker>>,
}

impl AppState {
    pub fn new(config: Config, speller: Option<SpellChecker>) -> Self {
        AppState {
            config: Arc::new(config),
            speller: speller.map(Arc::new),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn speller(&self) -> Option<Arc<SpellChecker>> {
        self.speller.clone()
    }

    /// Fresh scratch directory for one request
    pub fn workspace(&self) -> Result<RequestWorkspace> {
        Ok(RequestWorkspace::new(&self.config.work_dir)?)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/merge", post(handlers::merge))
        .route("/api/split", post(handlers::split))
        .route("/api/compress", post(handlers::compress))
        .route("/api/encrypt", post(handlers::encrypt))
        .route("/api/pdf-to-text", post(handlers::pdf_to_text))
        .route("/api/ocr", post(handlers::ocr))
        .route("/api/img-to-pdf", post(handlers::images_to_pdf))
        .route("/api/rotate", post(handlers::rotate))
        .route("/api/watermark", post(handlers::watermark))
        .route("/api/analyze-text", post(handlers::analyze_text))
        .route("/api/search-keyword", post(handlers::search))
        .route("/api/edit-text-style", post(handlers::edit_text_style))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "pdftools",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/merge",
            "/api/split",
            "/api/compress",
            "/api/encrypt",
            "/api/pdf-to-text",
            "/api/ocr",
            "/api/img-to-pdf",
            "/api/rotate",
            "/api/watermark",
            "/api/analyze-text",
            "/api/search-keyword",
            "/api/edit-text-style",
        ],
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "PDF tools service is running",
    }))
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(
        work_dir = %config.work_dir.display(),
        max_upload_bytes = config.server.max_upload_bytes,
        "Starting pdftools v{}",
        env!("CARGO_PKG_VERSION")
    );

    let speller = SpellChecker::load_or_disable(&config.spell_dictionary);
    let app = router(AppState::new(config, speller));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::inherited_attribute;
    use crate::pdf::fixtures::sample_pdf;
    use crate::pdf::PdfDocument;
    use crate::spelling::fixtures::small_checker;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use lopdf::Object;
    use std::path::PathBuf;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdftools-test-boundary";

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File(name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    struct TestApp {
        router: Router,
        work_dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_speller(None)
        }

        fn with_speller(speller: Option<SpellChecker>) -> Self {
            let work_dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.work_dir = work_dir.path().to_path_buf();
            config.ocr.tesseract = PathBuf::from("/nonexistent/tesseract");
            config.ocr.pdftoppm = PathBuf::from("/nonexistent/pdftoppm");
            TestApp {
                router: router(AppState::new(config, speller)),
                work_dir,
            }
        }

        async fn post(&self, uri: &str, parts: &[Part<'_>]) -> Response {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap();
            self.router.clone().oneshot(request).await.unwrap()
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn error_code(response: Response) -> String {
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    async fn response_pdf(response: Response) -> PdfDocument {
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename="));
        PdfDocument::from_bytes(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_split_selects_pages() {
        let app = TestApp::new();
        let pdf = sample_pdf(6);
        let response = app
            .post(
                "/api/split",
                &[Part::File("doc.pdf", &pdf), Part::Text("pages", "5-9,1,1")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_pdf(response).await.page_count(), 3);
    }

    #[tokio::test]
    async fn test_split_rejects_bad_expression() {
        let app = TestApp::new();
        let pdf = sample_pdf(3);
        let response = app
            .post(
                "/api/split",
                &[Part::File("doc.pdf", &pdf), Part::Text("pages", "1,x-2")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_range_expression");
    }

    #[tokio::test]
    async fn test_split_rejects_empty_selection() {
        let app = TestApp::new();
        let pdf = sample_pdf(2);
        let response = app
            .post(
                "/api/split",
                &[Part::File("doc.pdf", &pdf), Part::Text("pages", "9")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "bad_request");
    }

    #[tokio::test]
    async fn test_merge() {
        let app = TestApp::new();
        let (a, b) = (sample_pdf(2), sample_pdf(3));

        let response = app.post("/api/merge", &[Part::File("a.pdf", &a)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .post(
                "/api/merge",
                &[Part::File("a.pdf", &a), Part::File("b.pdf", &b)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_pdf(response).await.page_count(), 5);
    }

    #[tokio::test]
    async fn test_rotate_only_selected_pages() {
        let app = TestApp::new();
        let pdf = sample_pdf(3);
        let response = app
            .post(
                "/api/rotate",
                &[
                    Part::File("doc.pdf", &pdf),
                    Part::Text("rotation", "-90"),
                    Part::Text("pages", "2"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let rotated = response_pdf(response).await;
        let ids = rotated.page_ids();
        let rotation = |idx: usize| match inherited_attribute(&rotated.doc, ids[idx], b"Rotate") {
            Some(Object::Integer(r)) => r,
            _ => 0,
        };
        assert_eq!(rotation(0), 0);
        assert_eq!(rotation(1), 270);
        assert_eq!(rotation(2), 0);
    }

    #[tokio::test]
    async fn test_rotate_rejects_odd_angle() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);
        let response = app
            .post(
                "/api/rotate",
                &[Part::File("doc.pdf", &pdf), Part::Text("rotation", "45")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_encrypt_password_rules() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);

        let response = app
            .post(
                "/api/encrypt",
                &[Part::File("doc.pdf", &pdf), Part::Text("password", "abc")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .post(
                "/api/encrypt",
                &[
                    Part::File("doc.pdf", &pdf),
                    Part::Text("password", "secret1"),
                    Part::Text("confirm_password", "secret2"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_encrypt() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);
        let response = app
            .post(
                "/api/encrypt",
                &[Part::File("doc.pdf", &pdf), Part::Text("password", "secret1")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body_bytes(response).await;
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.windows(8).any(|w| w == b"/Encrypt"));

        let mut reopened = lopdf::Document::load_mem(&bytes).unwrap();
        reopened.decrypt("secret1").unwrap();
        assert_eq!(reopened.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_pdf_to_text() {
        let app = TestApp::new();
        let pdf = sample_pdf(2);
        let response = app.post("/api/pdf-to-text", &[Part::File("doc.pdf", &pdf)]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"extracted_text.txt\""
        );

        let text = String::from_utf8(body_bytes(response).await).unwrap();
        let first = text.find("Page 1").unwrap();
        let second = text.find("Page 2").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_analyze_text() {
        let app = TestApp::with_speller(Some(small_checker()));
        let pdf = sample_pdf(3);
        let response = app.post("/api/analyze-text", &[Part::File("doc.pdf", &pdf)]).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["total_words"], 6);
        assert_eq!(json["unique_words"], 4);
        assert_eq!(json["pages"], 3);
        assert_eq!(json["top_keywords"][0]["word"], "page");
        assert_eq!(json["top_keywords"][0]["count"], 3);
        assert_eq!(json["spell_checker_available"], true);
        assert!(json["typos"].is_array());
    }

    #[tokio::test]
    async fn test_analyze_text_without_dictionary() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);
        let response = app.post("/api/analyze-text", &[Part::File("doc.pdf", &pdf)]).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["spell_checker_available"], false);
        assert_eq!(json["typos"], json!([]));
    }

    #[tokio::test]
    async fn test_search_keyword() {
        let app = TestApp::new();
        let pdf = sample_pdf(3);
        let response = app
            .post(
                "/api/search-keyword",
                &[Part::File("doc.pdf", &pdf), Part::Text("keyword", "PAGE")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["keyword"], "PAGE");
        assert_eq!(json["total_matches"], 3);
        let pages: Vec<u64> = json["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["page"].as_u64().unwrap())
            .collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_search_keyword_required() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);
        let response = app
            .post(
                "/api/search-keyword",
                &[Part::File("doc.pdf", &pdf), Part::Text("keyword", " ")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 120, 220]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_images_to_pdf() {
        let app = TestApp::new();
        let (wide, tall) = (png(60, 20), png(20, 60));
        let response = app
            .post(
                "/api/img-to-pdf",
                &[
                    Part::File("wide.png", &wide),
                    Part::File("tall.png", &tall),
                    Part::Text("page_size", "Letter"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_pdf(response).await.page_count(), 2);

        let response = app
            .post(
                "/api/img-to-pdf",
                &[Part::File("wide.png", &wide), Part::File("doc.pdf", &wide)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "unsupported_file");
    }

    #[tokio::test]
    async fn test_compress_rejects_non_pdf() {
        let app = TestApp::new();
        let response = app
            .post("/api/compress", &[Part::File("notes.txt", b"hello")])
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "unsupported_file");
    }

    #[tokio::test]
    async fn test_compress_unknown_quality() {
        let app = TestApp::new();
        let pdf = sample_pdf(1);
        let response = app
            .post(
                "/api/compress",
                &[Part::File("doc.pdf", &pdf), Part::Text("quality", "ultra")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_unprocessable() {
        let app = TestApp::new();
        let response = app
            .post("/api/compress", &[Part::File("broken.pdf", b"not a pdf")])
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(response).await, "processing_failed");
    }

    #[tokio::test]
    async fn test_watermark_keeps_pages() {
        let app = TestApp::new();
        let pdf = sample_pdf(2);
        let response = app
            .post(
                "/api/watermark",
                &[
                    Part::File("doc.pdf", &pdf),
                    Part::Text("watermark_text", "DRAFT"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_pdf(response).await.page_count(), 2);
    }

    #[tokio::test]
    async fn test_edit_text_style_from_text() {
        let app = TestApp::new();
        let response = app
            .post(
                "/api/edit-text-style",
                &[
                    Part::Text("text_content", "Hello\nWorld"),
                    Part::Text("font_family", "Courier"),
                    Part::Text("font_color", "#336699"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_pdf(response).await.page_count(), 1);

        let response = app.post("/api/edit-text-style", &[]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ocr_without_tesseract() {
        let app = TestApp::new();
        let response = app.post("/api/ocr", &[Part::File("scan.png", b"png")]).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_code(response).await, "ocr_unavailable");
    }

    #[tokio::test]
    async fn test_workspaces_removed_after_requests() {
        let app = TestApp::new();
        let pdf = sample_pdf(2);

        let ok = app
            .post("/api/split", &[Part::File("doc.pdf", &pdf), Part::Text("pages", "1")])
            .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let failed = app
            .post("/api/split", &[Part::File("doc.pdf", &pdf), Part::Text("pages", "0-1")])
            .await;
        assert_eq!(failed.status(), StatusCode::BAD_REQUEST);

        let leftovers = std::fs::read_dir(app.work_dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
