use crate::page_range::select_pages;
use anyhow::Result;

/// Print the 1-based pages an expression selects
pub fn run(expression: &str, total_pages: usize) -> Result<()> {
    let selected = select_pages(expression, total_pages)?;

    if selected.is_empty() {
        println!("No pages selected.");
        return Ok(());
    }

    let pages: Vec<String> = selected.iter().map(|idx| (idx + 1).to_string()).collect();
    println!("{}", pages.join(","));
    println!("\n{} of {} page(s) selected.", selected.len(), total_pages);

    Ok(())
}
