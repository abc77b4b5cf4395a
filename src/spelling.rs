//! Spell checking against a Hunspell dictionary.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::Path;

/// Misspelled words looked at per analysis
pub const MAX_TYPOS: usize = 50;
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Typo {
    pub incorrect: String,
    pub suggestions: Vec<String>,
}

pub struct SpellChecker {
    dictionary: spellbook::Dictionary,
}

impl SpellChecker {
    /// Load `<base>.aff` and `<base>.dic`, e.g. `/usr/share/hunspell/en_US`
    pub fn load(base: &Path) -> Result<Self> {
        let read = |extension: &str| {
            let path = base.with_extension(extension);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read dictionary file: {}", path.display()))
        };
        Self::from_sources(&read("aff")?, &read("dic")?)
    }

    /// Spell checking is optional; a missing or broken dictionary only disables it.
    pub fn load_or_disable(base: &Path) -> Option<Self> {
        match Self::load(base) {
            Ok(speller) => {
                tracing::info!(dictionary = %base.display(), "Spell checking enabled");
                Some(speller)
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Spell checking disabled");
                None
            }
        }
    }

    pub fn from_sources(aff: &str, dic: &str) -> Result<Self> {
        let dictionary = spellbook::Dictionary::new(aff, dic)
            .map_err(|e| anyhow!("Failed to parse dictionary: {}", e))?;
        Ok(SpellChecker { dictionary })
    }

    /// Words arrive lowercased, so a capitalized form also counts ("john" for "John").
    pub fn is_correct(&self, word: &str) -> bool {
        self.dictionary.check(word) || self.dictionary.check(&capitalize(word))
    }

    /// Unknown words in first-seen order, capped at [`MAX_TYPOS`]; only those
    /// with at least one suggestion are reported.
    pub fn typos<'a, I>(&self, words: I) -> Vec<Typo>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut suggestions = Vec::new();

        words
            .into_iter()
            .filter(|w| checkable(w) && seen.insert(*w))
            .filter(|w| !self.is_correct(w))
            .take(MAX_TYPOS)
            .filter_map(|word| {
                suggestions.clear();
                self.dictionary.suggest(word, &mut suggestions);
                if suggestions.is_empty() {
                    return None;
                }
                Some(Typo {
                    incorrect: word.to_string(),
                    suggestions: suggestions.iter().take(MAX_SUGGESTIONS).cloned().collect(),
                })
            })
            .collect()
    }
}

/// Numbers, identifiers and single letters are not spelling mistakes
fn checkable(word: &str) -> bool {
    word.chars().count() > 1 && word.chars().all(char::is_alphabetic)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
