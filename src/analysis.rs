use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::pdf::text::PageText;
use crate::spelling::{SpellChecker, Typo};

pub const TOP_KEYWORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextAnalysis {
    pub total_words: usize,
    pub unique_words: usize,
    pub top_keywords: Vec<KeywordCount>,
    pub typos: Vec<Typo>,
    /// Pages that yielded any text
    pub pages: usize,
    pub spell_checker_available: bool,
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"))
}

/// Lowercased words in order of appearance
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// The `limit` most frequent words; ties keep first-seen order.
pub fn most_common(words: &[String], limit: usize) -> Vec<KeywordCount> {
    // word -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, word) in words.iter().enumerate() {
        counts.entry(word.as_str()).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, (count, _))| KeywordCount {
            word: word.to_string(),
            count,
        })
        .collect()
}

/// Without a spell checker `typos` is empty and `spell_checker_available` false.
pub fn analyze(pages: &[PageText], speller: Option<&SpellChecker>) -> TextAnalysis {
    let with_text: Vec<&str> = pages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect();
    let combined = with_text.join(" ");

    let words = words(&combined);
    let unique_words = words
        .iter()
        .map(String::as_str)
        .collect::<std::collections::HashSet<_>>()
        .len();

    TextAnalysis {
        total_words: words.len(),
        unique_words,
        top_keywords: most_common(&words, TOP_KEYWORDS),
        typos: speller
            .map(|s| s.typos(words.iter().map(String::as_str)))
            .unwrap_or_default(),
        pages: with_text.len(),
        spell_checker_available: speller.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spelling::fixtures::small_checker;

    fn page(n: u32, text: &str) -> PageText {
        PageText {
            page: n,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_words_lowercased() {
        assert_eq!(words("Hello, WORLD! it's 2024"), vec!["hello", "world", "it", "s", "2024"]);
    }

    #[test]
    fn test_most_common_tie_order() {
        let w = words("b a b c a d");
        let top = most_common(&w, 3);
        let as_pairs: Vec<_> = top.iter().map(|k| (k.word.as_str(), k.count)).collect();
        assert_eq!(as_pairs, vec![("b", 2), ("a", 2), ("c", 1)]);
    }

    #[test]
    fn test_analyze_counts() {
        let pages = vec![page(1, "The cat and the hat"), page(2, "  "), page(3, "the end")];
        let result = analyze(&pages, None);
        assert_eq!(result.total_words, 7);
        assert_eq!(result.unique_words, 5);
        assert_eq!(result.pages, 2);
        assert_eq!(
            result.top_keywords[0],
            KeywordCount {
                word: "the".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn test_analyze_caps_keywords() {
        let text = (0..50).map(|n| format!("w{}", n)).collect::<Vec<_>>().join(" ");
        let result = analyze(&[page(1, &text)], None);
        assert_eq!(result.top_keywords.len(), TOP_KEYWORDS);
    }

    #[test]
    fn test_analyze_reports_typos() {
        let speller = small_checker();
        let pages = vec![page(1, "The cat sat"), page(2, "Helo world, the cat")];
        let result = analyze(&pages, Some(&speller));
        assert!(result.spell_checker_available);
        assert_eq!(result.typos.len(), 1);
        assert_eq!(result.typos[0].incorrect, "helo");

        let without = analyze(&pages, None);
        assert!(!without.spell_checker_available);
        assert!(without.typos.is_empty());
    }

    #[test]
    fn test_analyze_json_shape() {
        let json = serde_json::to_value(analyze(&[page(1, "the cat")], None)).unwrap();
        for key in ["total_words", "unique_words", "top_keywords", "typos", "pages", "spell_checker_available"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_analyze_empty() {
        let result = analyze(&[], None);
        assert_eq!(result.total_words, 0);
        assert!(result.top_keywords.is_empty());
    }
}
