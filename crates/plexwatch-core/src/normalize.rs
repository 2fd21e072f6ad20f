//! Title and year comparison shared by every match tier.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Shortest normalized title allowed to match as a word prefix of another.
/// Below this, common short titles ("Up", "It") would match far too much.
const MIN_PREFIX_MATCH_LEN: usize = 8;

/// Lowercase, strip diacritics, turn punctuation and separators into single
/// spaces and trim. Apostrophes are dropped so "Schindler's" and "Schindlers"
/// compare equal.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.nfd().filter(|c| !is_combining_mark(*c)) {
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// True when both titles normalize to the same string, or the shorter one
/// (at least eight characters) is a whole-word prefix of the longer one.
pub fn titles_equivalent(a: &str, b: &str) -> bool {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if shorter.chars().count() < MIN_PREFIX_MATCH_LEN {
        return false;
    }
    longer
        .strip_prefix(shorter.as_str())
        .map(|rest| rest.starts_with(' '))
        .unwrap_or(false)
}

/// Years within one of each other, or either unknown
pub fn years_compatible(a: Option<u32>, b: Option<u32>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.abs_diff(b) <= 1,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Close-Up "), "close up");
        assert_eq!(normalize_title("Amélie"), "amelie");
        assert_eq!(normalize_title("Schindler's List"), "schindlers list");
        assert_eq!(normalize_title("Mission: Impossible -- Fallout"), "mission impossible fallout");
        assert_eq!(normalize_title("WALL·E"), "wall e");
        assert_eq!(normalize_title("?!"), "");
    }

    #[test]
    fn test_titles_equivalent() {
        assert!(titles_equivalent("Close-Up", "Close up"));
        assert!(titles_equivalent("Léon", "Leon"));
        assert!(!titles_equivalent("Up", "Up in the Air"));
        assert!(titles_equivalent("Star Wars", "Star Wars: Episode IV - A New Hope"));
        // Prefix must end on a word boundary
        assert!(!titles_equivalent("The Thing Called", "The Thing Calledmore"));
        assert!(!titles_equivalent("", ""));
    }

    #[test]
    fn test_years_compatible() {
        assert!(years_compatible(Some(2024), Some(2025)));
        assert!(years_compatible(Some(2025), Some(2024)));
        assert!(!years_compatible(Some(2024), Some(2026)));
        assert!(years_compatible(None, Some(2026)));
        assert!(years_compatible(Some(2024), None));
    }
}
