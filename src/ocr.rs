//! OCR through the `tesseract` CLI, with `pdftoppm` rasterising PDF pages.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

use crate::config::OcrConfig;
use crate::error::{AppError, Result};

pub const DEFAULT_LANGUAGE: &str = "eng";

/// Tesseract language codes look like `eng`, `chi_sim` or `eng+deu`.
pub fn validate_language(language: &str) -> Result<&str> {
    let language = language.trim();
    if language.is_empty() {
        return Ok(DEFAULT_LANGUAGE);
    }
    if language
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '+')
    {
        Ok(language)
    } else {
        Err(AppError::bad_request(format!("Invalid OCR language: {}", language)))
    }
}

pub struct OcrEngine<'a> {
    config: &'a OcrConfig,
}

impl<'a> OcrEngine<'a> {
    pub fn new(config: &'a OcrConfig) -> Self {
        OcrEngine { config }
    }

    /// Recognize text in a single image file
    pub async fn recognize_image(&self, image: &Path, language: &str) -> Result<String> {
        let output = run(
            Command::new(&self.config.tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(language),
            &self.config.tesseract,
        )
        .await?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Rasterise every page into `scratch`, then recognize them in page order
    pub async fn recognize_pdf(&self, pdf: &Path, scratch: &Path, language: &str) -> Result<String> {
        let prefix = scratch.join("ocr-page");
        run(
            Command::new(&self.config.pdftoppm)
                .arg("-r")
                .arg(self.config.dpi.to_string())
                .arg("-png")
                .arg(pdf)
                .arg(&prefix),
            &self.config.pdftoppm,
        )
        .await?;

        let pages = rendered_pages(scratch).await?;
        tracing::debug!(pages = pages.len(), "Rasterised PDF for OCR");

        let mut texts = Vec::with_capacity(pages.len());
        for page in pages {
            let text = self.recognize_image(&page, language).await?;
            if !text.is_empty() {
                texts.push(text);
            }
        }

        Ok(texts.join("\n\n"))
    }
}

async fn run(command: &mut Command, program: &Path) -> Result<Output> {
    let output = match command.output().await {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::OcrUnavailable(format!(
                "{} is not installed",
                program.display()
            )));
        }
        Err(e) => return Err(AppError::Io(e)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Processing(anyhow::anyhow!(
            "{} failed: {}",
            program.display(),
            stderr.trim()
        )));
    }

    Ok(output)
}

/// `pdftoppm` names pages `ocr-page-1.png`, `ocr-page-01.png`, ... depending on page count.
async fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }

    if pages.is_empty() {
        return Err(AppError::Processing(anyhow::anyhow!("PDF rendered no pages")));
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension()? != "png" {
        return None;
    }
    stem.strip_prefix("ocr-page-")?.parse().ok()
}
