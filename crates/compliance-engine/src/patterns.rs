//! Text normalization and phrase matching shared by classifier, matchers and detectors

use lazy_static::lazy_static;
use regex::Regex;

/// Words ignored when measuring token coverage
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "such", "that", "the", "this", "to", "was", "which",
    "will", "with",
];

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}

/// Lowercase, replace punctuation with spaces, collapse whitespace
pub fn normalize(text: &str) -> String {
    NON_WORD
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Whole-word phrase test on text already passed through [`normalize`]
pub fn contains_phrase(normalized_text: &str, phrase: &str) -> bool {
    let phrase = normalize(phrase);
    if phrase.is_empty() || normalized_text.is_empty() {
        return false;
    }
    format!(" {} ", normalized_text).contains(&format!(" {} ", phrase))
}

/// Content tokens of `text`, in order, without stopwords
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Token equality tolerant of simple inflection ("director" / "directors")
pub fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 4 && long.len() - short.len() <= 3 && long.starts_with(short)
}

/// Fraction of `wanted` tokens found among `available`
pub fn token_coverage(wanted: &[String], available: &[String]) -> f32 {
    if wanted.is_empty() {
        return 0.0;
    }
    let found = wanted
        .iter()
        .filter(|w| available.iter().any(|a| tokens_match(w, a)))
        .count();
    found as f32 / wanted.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  The Company's  REGISTERED-office:\n"), "the company s registered office");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        let text = normalize("Disputes are referred to the Dubai Courts.");
        assert!(contains_phrase(&text, "dubai courts"));
        assert!(contains_phrase(&text, "Dubai  Courts"));
        assert!(!contains_phrase(&text, "dubai court"));
        assert!(!contains_phrase(&normalize("unnamed"), "name"));
        assert!(!contains_phrase(&text, ""));
    }

    #[test]
    fn test_tokenize_drops_stopwords() {
        assert_eq!(tokenize("The name of the Company"), vec!["name", "company"]);
    }

    #[test]
    fn test_token_coverage() {
        let wanted = tokenize("appointment of directors");
        assert_eq!(token_coverage(&wanted, &tokenize("The directors approve the appointment")), 1.0);
        assert_eq!(token_coverage(&wanted, &tokenize("The director resigned")), 0.5);
        assert_eq!(token_coverage(&[], &tokenize("anything")), 0.0);
    }

    #[test]
    fn test_tokens_match_inflection() {
        assert!(tokens_match("director", "directors"));
        assert!(tokens_match("share", "shares"));
        assert!(!tokens_match("ubo", "ubos"));
        assert!(!tokens_match("declare", "declaration"));
    }
}
