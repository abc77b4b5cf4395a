use crate::page_range::select_pages;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    angle: i64,
    pages: &str,
    output: Q,
) -> Result<()> {
    let mut doc = PdfDocument::open(&input)?;
    let page_list = select_pages(pages, doc.page_count())?;

    doc.rotate_pages(&page_list, angle)?;
    PdfDocument::save(&mut doc.doc, &output)?;

    println!(
        "Rotated {} page(s) by {} degrees into {}",
        page_list.len(),
        angle,
        output.as_ref().display()
    );

    Ok(())
}
