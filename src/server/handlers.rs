//! One handler per operation: save uploads into a request workspace, run the
//! document work on the blocking pool, return the result.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lopdf::Document;
use std::path::{Path, PathBuf};

use super::upload::{require_pdf, UploadForm};
use super::AppState;
use crate::analysis::{analyze, TextAnalysis};
use crate::error::{AppError, Result};
use crate::ocr::{validate_language, OcrEngine};
use crate::page_range::select_pages;
use crate::pdf::compose::{compose_images, compose_text, FontFamily, PageSize, Rgb, TextStyle};
use crate::pdf::merge::merge_documents;
use crate::pdf::text::{extract_text_pages, join_pages, search_keyword, KeywordSearch};
use crate::pdf::watermark::Watermark;
use crate::pdf::{CompressionLevel, PdfDocument};

const PDF: &str = "application/pdf";
const TEXT: &str = "text/plain; charset=utf-8";
const MIN_PASSWORD_LEN: usize = 6;

/// Run document work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Worker task failed: {}", e)))?
}

fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Serialize the document, keeping a copy at `path` in the workspace
fn write_pdf(doc: &mut Document, path: &Path) -> Result<Vec<u8>> {
    let bytes = PdfDocument::to_bytes(doc)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

pub async fn merge(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let uploads = form.pdfs(2)?;

    let mut workspace = state.workspace()?;
    let inputs = uploads
        .iter()
        .map(|u| workspace.save_upload(&u.file_name, &u.data))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;
    let output = workspace.output_path("merged", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let documents = inputs
            .iter()
            .map(|path| PdfDocument::open(path).map(|pdf| pdf.doc))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut merged = merge_documents(documents)?;
        write_pdf(&mut merged, &output)
    })
    .await?;

    tracing::info!(files = uploads.len(), bytes = bytes.len(), "Merged PDFs");
    Ok(attachment(bytes, PDF, &name))
}

pub async fn split(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let expression = form.field_or("pages", "").to_string();

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let output = workspace.output_path("split", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let pdf = PdfDocument::open(&input)?;
        let selection = select_pages(&expression, pdf.page_count())?;
        if selection.is_empty() {
            return Err(AppError::bad_request(format!(
                "No pages of the {}-page document match '{}'",
                pdf.page_count(),
                expression
            )));
        }
        tracing::debug!(pages = ?selection, "Selected pages");
        let mut extracted = pdf.extract_pages(&selection)?;
        write_pdf(&mut extracted, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}

pub async fn rotate(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let rotation = form.required("rotation")?;
    let angle: i64 = rotation
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid rotation: {}", rotation)))?;
    if angle % 90 != 0 {
        return Err(AppError::bad_request(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            angle
        )));
    }
    let expression = form.field_or("pages", "").to_string();

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let output = workspace.output_path("rotated", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let mut pdf = PdfDocument::open(&input)?;
        let selection = select_pages(&expression, pdf.page_count())?;
        pdf.rotate_pages(&selection, angle)?;
        write_pdf(&mut pdf.doc, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}

pub async fn compress(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let level = CompressionLevel::parse(form.field_or("quality", "medium"))
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let output = workspace.output_path("compressed", "pdf");
    let name = file_name(&output);

    let original_size = upload.data.len();
    let bytes = blocking(move || {
        let mut pdf = PdfDocument::open(&input)?;
        pdf.compress(level);
        write_pdf(&mut pdf.doc, &output)
    })
    .await?;

    tracing::info!(?level, original_size, compressed_size = bytes.len(), "Compressed PDF");
    Ok(attachment(bytes, PDF, &name))
}

pub async fn encrypt(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let password = form.required("password")?.to_string();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if let Some(confirm) = form.field("confirm_password") {
        if confirm != password {
            return Err(AppError::bad_request("Passwords do not match"));
        }
    }

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let output = workspace.output_path("encrypted", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let mut pdf = PdfDocument::open(&input)?;
        pdf.encrypt(&password)?;
        write_pdf(&mut pdf.doc, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}

pub async fn pdf_to_text(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;

    let text = blocking(move || Ok(join_pages(&extract_text_pages(&input)?))).await?;

    Ok(attachment(text.into_bytes(), TEXT, "extracted_text.txt"))
}

pub async fn ocr(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_file()?;
    let language = validate_language(form.field_or("language", ""))?;

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let engine = OcrEngine::new(&state.config().ocr);

    let text = if upload.is_pdf() {
        engine.recognize_pdf(&input, workspace.path(), language).await?
    } else if upload.is_image() {
        engine.recognize_image(&input, language).await?
    } else {
        return Err(AppError::UnsupportedFile(format!(
            "OCR needs a PDF or an image: {}",
            upload.file_name
        )));
    };

    tracing::info!(language, chars = text.len(), "OCR complete");
    Ok(attachment(text.into_bytes(), TEXT, "ocr_text.txt"))
}

pub async fn images_to_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::bad_request("At least one file required"));
    }
    if let Some(bad) = form.files.iter().find(|f| !f.is_image()) {
        return Err(AppError::UnsupportedFile(format!(
            "Only image files allowed: {}",
            bad.file_name
        )));
    }
    let page_size = PageSize::from_name(form.field_or("page_size", "A4"));

    let mut workspace = state.workspace()?;
    let inputs = form
        .files
        .iter()
        .map(|u| workspace.save_upload(&u.file_name, &u.data))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;
    let output = workspace.output_path("converted", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let images = inputs
            .iter()
            .map(std::fs::read)
            .collect::<std::io::Result<Vec<_>>>()?;
        let mut doc = compose_images(&images, page_size)?;
        write_pdf(&mut doc, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}

pub async fn watermark(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let text = form.required("watermark_text")?;
    let opacity_raw = form.field_or("opacity", "0.4");
    let opacity: f32 = opacity_raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid opacity: {}", opacity_raw)))?;
    let mark = Watermark::new(text, opacity).map_err(|e| AppError::bad_request(e.to_string()))?;

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;
    let output = workspace.output_path("watermarked", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let mut pdf = PdfDocument::open(&input)?;
        mark.apply(&mut pdf.doc)?;
        write_pdf(&mut pdf.doc, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}

pub async fn analyze_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TextAnalysis>> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;

    let speller = state.speller();
    let analysis = blocking(move || {
        let pages = extract_text_pages(&input)?;
        Ok(analyze(&pages, speller.as_deref()))
    })
    .await?;
    Ok(Json(analysis))
}

pub async fn search(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<KeywordSearch>> {
    let form = UploadForm::from_multipart(multipart).await?;
    let upload = form.single_pdf()?;
    let keyword = form.required("keyword")?.to_string();

    let mut workspace = state.workspace()?;
    let input = workspace.save_upload(&upload.file_name, &upload.data)?;

    let found = blocking(move || Ok(search_keyword(&extract_text_pages(&input)?, &keyword)?)).await?;
    tracing::debug!(keyword = %found.keyword, matches = found.total_matches, "Keyword search");
    Ok(Json(found))
}

pub async fn edit_text_style(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;

    let font_size_raw = form.field_or("font_size", "12");
    let font_size: f32 = font_size_raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid font size: {}", font_size_raw)))?;
    let style = TextStyle {
        font: FontFamily::from_name(form.field_or("font_family", "Helvetica")),
        font_size,
        color: Rgb::parse_hex(form.field_or("font_color", "#000000")).unwrap_or(Rgb::BLACK),
        highlight: Rgb::parse_hex(form.field_or("highlight_color", "")),
        page_size: PageSize::from_name(form.field_or("page_size", "A4")),
    };

    let mut workspace = state.workspace()?;
    // An uploaded PDF replaces the typed text with its own
    let source = match form.files.first() {
        Some(upload) => {
            require_pdf(upload)?;
            Some(workspace.save_upload(&upload.file_name, &upload.data)?)
        }
        None => None,
    };
    let typed = form.field("text_content").map(str::to_string);
    if source.is_none() && typed.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(AppError::bad_request("Provide text_content or a PDF file"));
    }
    let output = workspace.output_path("styled", "pdf");
    let name = file_name(&output);

    let bytes = blocking(move || {
        let text = match source {
            Some(path) => join_pages(&extract_text_pages(&path)?),
            None => typed.unwrap_or_default(),
        };
        let mut doc = compose_text(&text, &style).map_err(|e| AppError::bad_request(e.to_string()))?;
        write_pdf(&mut doc, &output)
    })
    .await?;

    Ok(attachment(bytes, PDF, &name))
}
