//! Name canonicalization applied to every fragment before it is compared,
//! classified or stored.

use std::sync::LazyLock;

use regex::Regex;

/// Anything that is not a word character, whitespace, apostrophe or Latin-1/Latin
/// Extended-A letter.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s'\u{00C0}-\u{017F}]").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Canonical form of a raw name. Total and idempotent.
///
/// - strips punctuation and symbols
/// - drops apostrophes with no word character on either side (`O'Connor` keeps its own)
/// - collapses whitespace runs and trims
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let kept = DISALLOWED.replace_all(raw, "");
    let without_orphans = drop_orphan_apostrophes(&kept);
    WHITESPACE
        .replace_all(&without_orphans, " ")
        .trim()
        .to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Neighbours are judged on the input as given, so a run like `''` loses both marks.
fn drop_orphan_apostrophes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            if c != '\'' {
                return true;
            }
            let before = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
            let after = chars.get(i + 1).copied();
            before.is_some_and(is_word_char) || after.is_some_and(is_word_char)
        })
        .map(|(_, &c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_embedded_apostrophe() {
        assert_eq!(normalize("O'Connor"), "O'Connor");
    }

    #[test]
    fn apostrophes_touching_a_word_survive() {
        assert_eq!(normalize(" 'Bob'  Smith "), "'Bob' Smith");
    }

    #[test]
    fn orphan_apostrophe_is_removed() {
        assert_eq!(normalize("Tom ' Jones"), "Tom Jones");
        assert_eq!(normalize("''"), "");
    }

    #[test]
    fn strips_punctuation_and_symbols() {
        assert_eq!(normalize("Beyoncé!!! (live)"), "Beyoncé live");
        assert_eq!(normalize("#1 Fan — 2024"), "1 Fan 2024");
    }

    #[test]
    fn keeps_extended_latin() {
        assert_eq!(normalize("Zoë  Saldaña"), "Zoë Saldaña");
        assert_eq!(normalize("Łukasz Żak"), "Łukasz Żak");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(normalize("\t John \n\n Smith  "), "John Smith");
    }

    #[test]
    fn empty_and_blank_inputs_become_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("?!."), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "O'Connor",
            " 'Bob'  Smith ",
            "a'''b",
            "''a",
            "x ' ' y",
            "J. K. Rowling",
            "Stranger Things: Season 5",
            "  ñandú ' _ 'ok'  ",
            "",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }
}
