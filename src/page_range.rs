use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    #[error("Invalid page range '{token}': {reason}")]
    InvalidRangeExpression { token: String, reason: &'static str },
}

/// One comma-separated piece of a range expression, still 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Single(u32),
    Range { start: u32, end: u32 },
}

impl PageToken {
    /// Parse a single token like "5" or "7-10"
    pub fn parse(s: &str) -> Result<Self, PageRangeError> {
        let token = s.trim();
        let invalid = |reason| PageRangeError::InvalidRangeExpression {
            token: token.to_string(),
            reason,
        };

        if token.is_empty() {
            return Err(invalid("empty page token"));
        }

        match token.split_once('-') {
            Some((start_str, end_str)) => {
                if end_str.contains('-') {
                    return Err(invalid("more than one '-' in range"));
                }
                let start = parse_page_number(start_str).ok_or_else(|| invalid("range start is not a page number"))?;
                let end = parse_page_number(end_str).ok_or_else(|| invalid("range end is not a page number"))?;
                if start == 0 || end == 0 {
                    return Err(invalid("page numbers start at 1"));
                }
                if start > end {
                    return Err(invalid("range start is after range end"));
                }
                Ok(PageToken::Range { start, end })
            }
            None => parse_page_number(token)
                .map(PageToken::Single)
                .ok_or_else(|| invalid("not a page number")),
        }
    }

    /// Zero-based indices this token selects in a document of `total_pages`.
    ///
    /// Single pages past the end select nothing; range ends are clamped.
    pub fn indices(&self, total_pages: usize) -> std::ops::Range<usize> {
        match *self {
            PageToken::Single(p) => {
                let idx = (p as usize).wrapping_sub(1);
                if p >= 1 && idx < total_pages {
                    idx..idx + 1
                } else {
                    0..0
                }
            }
            PageToken::Range { start, end } => {
                let first = start as usize - 1;
                let last = (end as usize).min(total_pages);
                if first < last {
                    first..last
                } else {
                    0..0
                }
            }
        }
    }
}

fn parse_page_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok()
}

/// Parse a comma-separated expression like "1-3,5,7-10" into tokens
pub fn parse_range_expression(s: &str) -> Result<Vec<PageToken>, PageRangeError> {
    s.split(',').map(PageToken::parse).collect()
}

/// Select zero-based page indices from a range expression.
///
/// An empty expression selects every page. The result is ascending and
/// free of duplicates, and every index is below `total_pages`.
pub fn select_pages(expression: &str, total_pages: usize) -> Result<Vec<usize>, PageRangeError> {
    if expression.trim().is_empty() {
        return Ok((0..total_pages).collect());
    }

    let tokens = parse_range_expression(expression)?;
    let selected: BTreeSet<usize> = tokens
        .iter()
        .flat_map(|token| token.indices(total_pages))
        .collect();

    Ok(selected.into_iter().collect())
}
