//! Multipart form parsing shared by every endpoint.
//!
//! Files arrive as repeated `files` parts; every part without a file name is
//! treated as a text option.

use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{AppError, Result};

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is_pdf(&self) -> bool {
        self.extension() == "pdf"
    }

    pub fn is_image(&self) -> bool {
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"));
        by_type || IMAGE_EXTENSIONS.contains(&self.extension().as_str())
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    tracing::debug!(field = %name, file_name = %file_name, bytes = data.len(), "Received file");
                    form.files.push(Upload {
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The option's value, or `default` when it is missing or blank
    pub fn field_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.field(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => default,
        }
    }

    pub fn required(&self, name: &str) -> Result<&str> {
        match self.field(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AppError::bad_request(format!("Missing required field '{}'", name))),
        }
    }

    pub fn single_file(&self) -> Result<&Upload> {
        match self.files.as_slice() {
            [file] => Ok(file),
            [] => Err(AppError::bad_request("A file is required")),
            _ => Err(AppError::bad_request("Only one file allowed")),
        }
    }

    pub fn single_pdf(&self) -> Result<&Upload> {
        let file = self.single_file()?;
        require_pdf(file)?;
        Ok(file)
    }

    /// At least `min` uploads, all PDFs
    pub fn pdfs(&self, min: usize) -> Result<&[Upload]> {
        if self.files.len() < min {
            return Err(AppError::bad_request(format!("At least {} files required", min)));
        }
        for file in &self.files {
            require_pdf(file)?;
        }
        Ok(&self.files)
    }
}

pub fn require_pdf(file: &Upload) -> Result<()> {
    if file.is_pdf() {
        Ok(())
    } else {
        Err(AppError::UnsupportedFile(format!(
            "Only PDF files allowed: {}",
            file.file_name
        )))
    }
}
