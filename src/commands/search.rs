use crate::pdf::text::{extract_text_pages, search_keyword};
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P, keyword: &str) -> Result<()> {
    let pages = extract_text_pages(&path)?;
    let found = search_keyword(&pages, keyword)?;

    if found.results.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    for m in &found.results {
        println!("p{}:L{}: {}", m.page, m.line, m.context);
    }

    if found.total_matches > found.results.len() {
        println!(
            "\n{} match(es) found, first {} shown.",
            found.total_matches,
            found.results.len()
        );
    } else {
        println!("\n{} match(es) found.", found.total_matches);
    }

    Ok(())
}
