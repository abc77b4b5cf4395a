use crate::pdf::{CompressionLevel, PdfDocument};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, quality: &str, output: Q) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let level = CompressionLevel::parse(quality)?;

    let original_size = file_size(input)?;
    let mut doc = PdfDocument::open(input)?;
    doc.compress(level);
    PdfDocument::save(&mut doc.doc, output)?;
    let compressed_size = file_size(output)?;

    println!(
        "Compressed {} -> {} ({} -> {} bytes)",
        input.display(),
        output.display(),
        original_size,
        compressed_size
    );

    Ok(())
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len())
}
