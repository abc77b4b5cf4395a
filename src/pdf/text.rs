use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::Serialize;
use std::path::Path;

/// Results returned to the caller are capped; `total_matches` still counts all of them.
pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number
    pub page: u32,
    pub text: String,
}

/// Extract text from every page of a PDF
pub fn extract_text_pages<P: AsRef<Path>>(path: P) -> Result<Vec<PageText>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read PDF: {}", path.display()))?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(idx, text)| PageText {
            page: (idx + 1) as u32,
            text,
        })
        .collect())
}

/// Join the non-blank pages with a blank line between them
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordMatch {
    pub page: u32,
    pub line: u32,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordSearch {
    pub keyword: String,
    pub total_matches: usize,
    pub results: Vec<KeywordMatch>,
}

/// Case-insensitive literal search, one hit per matching line
pub fn search_keyword(pages: &[PageText], keyword: &str) -> Result<KeywordSearch> {
    let pattern = RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()?;

    let mut results = Vec::new();
    let mut total_matches = 0;

    for page in pages {
        for (line_num, line) in page.text.lines().enumerate() {
            if !pattern.is_match(line) {
                continue;
            }
            total_matches += 1;
            if results.len() < MAX_SEARCH_RESULTS {
                results.push(KeywordMatch {
                    page: page.page,
                    line: (line_num + 1) as u32,
                    context: line.trim().to_string(),
                });
            }
        }
    }

    Ok(KeywordSearch {
        keyword: keyword.to_string(),
        total_matches,
        results,
    })
}
