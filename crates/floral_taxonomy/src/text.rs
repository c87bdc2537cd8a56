//! Keyword tokenisation shared by the store and the matcher.
//!
//! Both sides of a comparison go through [`tokenize`], so plural folding
//! only has to be consistent, not linguistically correct.

use unicode_normalization::UnicodeNormalization;

/// NFKC-fold, lowercase, strip punctuation and split into folded tokens.
///
/// Apostrophes are removed rather than split on, so `baby's` becomes `baby`.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().map(fold_plural).collect()
}

/// Fold a trailing plural on tokens longer than three characters.
pub fn fold_plural(token: &str) -> String {
    if token.chars().count() <= 3 {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if token.ends_with("ss") {
        return token.to_string();
    }
    token.strip_suffix('s').unwrap_or(token).to_string()
}

/// Canonical key for a token sequence.
pub fn phrase_key(tokens: &[String]) -> String {
    tokens.join(" ")
}

/// True when `phrase` occurs contiguously inside `haystack`.
pub fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty()
        && phrase.len() <= haystack.len()
        && haystack.windows(phrase.len()).any(|window| window == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_case() {
        assert_eq!(toks("Romantic, SPRING wedding!"), vec!["romantic", "spring", "wedding"]);
        assert_eq!(toks("  "), Vec::<String>::new());
        assert_eq!(toks("s-curve"), vec!["s", "curve"]);
    }

    #[test]
    fn test_tokenize_folds_plurals() {
        assert_eq!(toks("roses peonies lilies"), vec!["rose", "peony", "lily"]);
        assert_eq!(toks("glass moss"), vec!["glass", "moss"]);
        assert_eq!(toks("its"), vec!["its"]);
    }

    #[test]
    fn test_tokenize_apostrophes() {
        assert_eq!(toks("Baby's Breath"), vec!["baby", "breath"]);
        assert_eq!(toks("baby\u{2019}s breath"), vec!["baby", "breath"]);
    }

    #[test]
    fn test_tokenize_nfkc() {
        // Fullwidth letters fold to ASCII.
        assert_eq!(toks("\u{FF29}\u{FF4B}\u{FF45}\u{FF42}\u{FF41}\u{FF4E}\u{FF41}"), vec!["ikebana"]);
    }

    #[test]
    fn test_contains_phrase() {
        let hay = toks("a tall s curve arrangement");
        assert!(contains_phrase(&hay, &toks("s curve")));
        assert!(contains_phrase(&hay, &toks("tall")));
        assert!(!contains_phrase(&hay, &toks("curve s")));
        assert!(!contains_phrase(&hay, &[]));
        assert!(!contains_phrase(&toks("s"), &toks("s curve")));
    }
}
