pub mod compose;
pub mod document;
pub mod merge;
pub mod text;
pub mod watermark;

pub use document::{CompressionLevel, PdfDocument};
