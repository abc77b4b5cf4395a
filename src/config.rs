//! Server configuration, read from `PDFTOOLS_*` environment variables.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    /// Parent directory for per-request workspaces
    pub work_dir: PathBuf,
    /// Hunspell dictionary path without extension (`.aff`/`.dic` are appended)
    pub spell_dictionary: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract: PathBuf,
    pub pdftoppm: PathBuf,
    pub dpi: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 50 * 1024 * 1024,
            },
            ocr: OcrConfig {
                tesseract: PathBuf::from("tesseract"),
                pdftoppm: PathBuf::from("pdftoppm"),
                dpi: 300,
            },
            work_dir: env::temp_dir(),
            spell_dictionary: PathBuf::from("/usr/share/hunspell/en_US"),
        }
    }
}

impl Config {
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("PDFTOOLS_HOST").unwrap_or(defaults.server.host),
                port: parse_var("PDFTOOLS_PORT").unwrap_or(defaults.server.port),
                max_upload_bytes: parse_var::<usize>("PDFTOOLS_MAX_UPLOAD_MB")
                    .and_then(megabytes)
                    .unwrap_or(defaults.server.max_upload_bytes),
            },
            ocr: OcrConfig {
                tesseract: env::var_os("PDFTOOLS_TESSERACT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.ocr.tesseract),
                pdftoppm: env::var_os("PDFTOOLS_PDFTOPPM")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.ocr.pdftoppm),
                dpi: parse_var("PDFTOOLS_OCR_DPI").unwrap_or(defaults.ocr.dpi),
            },
            work_dir: env::var_os("PDFTOOLS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            spell_dictionary: env::var_os("PDFTOOLS_SPELL_DICTIONARY")
                .map(PathBuf::from)
                .unwrap_or(defaults.spell_dictionary),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

fn megabytes(mb: usize) -> Option<usize> {
    let bytes = mb.checked_mul(1024 * 1024);
    if bytes.is_none() {
        tracing::warn!(megabytes = mb, "Upload limit too large, keeping the default");
    }
    bytes
}
