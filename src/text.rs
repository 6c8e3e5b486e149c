//! Phrase matching helpers shared by the router, the team lookup and the validator.
//!
//! All matching is case-insensitive on the caller's side: pass lowercased text.
//! A phrase matches only on word boundaries, so "ever" does not match
//! "everton" and "rams" does not match "programs".

/// True when `phrase` occurs in `text` delimited by non-alphanumeric characters
/// (or the ends of the string).
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find(phrase) {
        let begin = start + offset;
        let end = begin + phrase.len();
        let boundary_before = begin == 0 || !is_word_byte(bytes[begin - 1]);
        let boundary_after = end == bytes.len() || !is_word_byte(bytes[end]);
        if boundary_before && boundary_after {
            return true;
        }
        // Advance past the first char of this occurrence.
        start = begin + text[begin..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    false
}

pub fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(text, p))
}

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_boundaries() {
        assert!(contains_phrase("most goals ever?", "ever"));
        assert!(!contains_phrase("everton scored", "ever"));
        assert!(contains_phrase("all-time leaders", "all-time"));
        assert!(contains_phrase("clean sheets", "clean sheets"));
        assert!(!contains_phrase("clean sheets", "clean sheet"));
    }

    #[test]
    fn test_repeated_occurrences() {
        // First "win" is inside "winning", second stands alone.
        assert!(contains_phrase("winning is a win", "win"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Which   TEAM\tWon "), "which team won");
    }
}
