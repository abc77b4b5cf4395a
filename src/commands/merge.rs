use crate::pdf::merge::merge_documents;
use crate::pdf::PdfDocument;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], output: Q) -> Result<()> {
    let output = output.as_ref();

    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    if inputs.len() == 1 {
        std::fs::copy(&inputs[0], output).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                inputs[0].as_ref().display(),
                output.display()
            )
        })?;
        println!("Copied 1 file to {}", output.display());
        return Ok(());
    }

    let documents = inputs
        .iter()
        .map(|input| PdfDocument::open(input).map(|pdf| pdf.doc))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = merge_documents(documents)?;
    let total_pages = merged.get_pages().len();
    PdfDocument::save(&mut merged, output)?;

    println!(
        "Merged {} files ({} pages) into {}",
        inputs.len(),
        total_pages,
        output.display()
    );

    Ok(())
}
