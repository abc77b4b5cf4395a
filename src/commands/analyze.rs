use crate::analysis::analyze;
use crate::config::Config;
use crate::pdf::text::extract_text_pages;
use crate::spelling::SpellChecker;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let pages = extract_text_pages(&path)?;
    let speller = SpellChecker::load_or_disable(&Config::from_env().spell_dictionary);
    let analysis = analyze(&pages, speller.as_ref());
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
