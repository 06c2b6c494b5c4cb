//! Text normalization shared by path derivation and fuzzy matching.
//!
//! Any change to `normalize_term` changes ranking output. Run tests after changes.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Characters that cannot appear in a filename on common filesystems.
static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Separator and variant tokens ignored when comparing names.
const NOISE_TOKENS: &[&str] = &["feat", "ft", "mix", "remix", "edit", "version", "original"];

/// Words shorter than this carry too little signal to count as a match.
pub const CONTENT_WORD_MIN_LEN: usize = 4;

// ============================================================================
// ASCII FOLDING
// ============================================================================

pub fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' |
             '\u{1DC0}'..='\u{1DFF}' | '\u{20D0}'..='\u{20FF}' |
             '\u{FE20}'..='\u{FE2F}')
}

/// Fold to lowercase ASCII: strip diacritics, then transliterate the rest.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

// ============================================================================
// PATH NORMALIZATION
// ============================================================================

/// Remove characters that are not allowed in filenames.
pub fn legalize_filename(name: &str) -> String {
    let legal = ILLEGAL_FILENAME_CHARS.replace_all(name, "");
    legal.trim().trim_end_matches('.').to_string()
}

/// URL-safe, lowercase, dash-separated slug. Used for content-addressed cache names.
pub fn slugify(s: &str) -> String {
    let folded = fold_to_ascii(s);
    NON_SLUG_CHARS
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

// ============================================================================
// MATCH NORMALIZATION
// ============================================================================

/// Normalize an artist, title or filename for containment checks.
/// Lowercases, spells out "&", drops dots, brackets and separators, removes
/// variant tokens and collapses whitespace.
pub fn normalize_term(input: &str) -> String {
    let lowered = input
        .to_lowercase()
        .replace('&', " and ")
        .replace('.', "")
        .replace(['-', '_', '(', ')', '[', ']', '{', '}'], " ");

    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|token| !NOISE_TOKENS.contains(token))
        .collect();

    MULTI_SPACE.replace_all(&kept.join(" "), " ").trim().to_string()
}

/// Words of a normalized term long enough to count on their own.
pub fn content_words(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|word| word.chars().count() >= CONTENT_WORD_MIN_LEN)
        .collect()
}

/// Unique whitespace-separated words, lowercased, in first-seen order.
pub fn unique_fields(s: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    for word in s.split_whitespace() {
        let word = word.to_lowercase();
        if !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen.join(" ")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legalize_filename() {
        assert_eq!(legalize_filename("AC/DC - T.N.T..mp3"), "ACDC - T.N.T..mp3");
        assert_eq!(legalize_filename("a<b>c:d\"e|f?g*h"), "abcdefgh");
        assert_eq!(legalize_filename(" Name. "), "Name");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("4uLU6hMCjMI75M1A2tKUQC"), "4ulu6hmcjmi75m1a2tkuqc");
        assert_eq!(slugify("Beyoncé & Jay-Z"), "beyonce-jay-z");
        assert_eq!(slugify("--weird__id--"), "weird-id");
    }

    #[test]
    fn test_normalize_term_basic() {
        assert_eq!(normalize_term("A.B."), "ab");
        assert_eq!(normalize_term("Song - Remix"), "song");
        assert_eq!(normalize_term("Simon & Garfunkel"), "simon and garfunkel");
        assert_eq!(normalize_term("Track (feat. Someone) [Radio Edit]"), "track someone radio");
    }

    #[test]
    fn test_normalize_term_keeps_words_containing_noise() {
        // whole-token removal only
        assert_eq!(normalize_term("After Mixtape"), "after mixtape");
        assert_eq!(normalize_term("ab_song_remix"), "ab song");
    }

    #[test]
    fn test_content_words() {
        assert_eq!(content_words("the long road home"), vec!["long", "road", "home"]);
        assert!(content_words("ab cd").is_empty());
    }

    #[test]
    fn test_unique_fields() {
        assert_eq!(unique_fields("Song Artist song ARTIST extra"), "song artist extra");
    }
}
