use crate::page_range::select_pages;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, pages: &str, output: Q) -> Result<()> {
    let doc = PdfDocument::open(&input)?;
    let total_pages = doc.page_count();

    let page_list = select_pages(pages, total_pages)?;

    if page_list.is_empty() {
        anyhow::bail!("No pages of the {}-page document match '{}'", total_pages, pages);
    }

    let mut new_doc = doc.extract_pages(&page_list)?;
    PdfDocument::save(&mut new_doc, &output)?;

    println!(
        "Extracted {} page(s) to {}",
        page_list.len(),
        output.as_ref().display()
    );

    Ok(())
}
