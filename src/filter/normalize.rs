//! Text normalization applied to every caller-supplied title and author.

/// Canonical apostrophe form (U+2019 RIGHT SINGLE QUOTATION MARK).
pub const CANONICAL_APOSTROPHE: char = '\u{2019}';

/// Characters folded into [`CANONICAL_APOSTROPHE`].
const APOSTROPHE_LIKE: [char; 5] = ['\'', '\u{2018}', '\u{02BC}', '\u{FF07}', '\u{2032}'];

/// Percent-decode `raw` and fold apostrophe-like characters to U+2019.
///
/// Decoding runs first so an encoded `%27` is folded as well. Input whose
/// decoded bytes are not UTF-8 is folded undecoded.
pub fn normalize_text(raw: &str) -> String {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, "percent-decoding produced invalid UTF-8, using raw value");
            raw.to_string()
        }
    };
    decoded
        .chars()
        .map(|c| {
            if APOSTROPHE_LIKE.contains(&c) {
                CANONICAL_APOSTROPHE
            } else {
                c
            }
        })
        .collect()
}

/// Normalize an optional parameter; absent values become the empty string.
pub fn normalize_param(raw: Option<&str>) -> String {
    raw.map(normalize_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_apostrophes_are_folded() {
        assert_eq!(normalize_text("John O'Hara"), "John O\u{2019}Hara");
        assert_eq!(
            normalize_text("''\u{2019}\u{2019}\u{2019}''"),
            "\u{2019}\u{2019}\u{2019}\u{2019}\u{2019}\u{2019}\u{2019}"
        );
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        assert_eq!(normalize_text("War%20and%20Peace"), "War and Peace");
        assert_eq!(normalize_text("O%27Brien"), "O\u{2019}Brien");
    }

    #[test]
    fn plus_is_not_a_space() {
        assert_eq!(normalize_text("C++"), "C++");
    }

    #[test]
    fn invalid_utf8_falls_back_to_raw() {
        assert_eq!(normalize_text("bad%FFbyte's"), "bad%FFbyte\u{2019}s");
    }

    #[test]
    fn missing_param_is_empty() {
        assert_eq!(normalize_param(None), "");
        assert_eq!(normalize_param(Some("Emma")), "Emma");
    }
}
