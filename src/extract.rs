use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::fmt;
use std::str;
use unicode_general_category::{GeneralCategory, get_general_category};

static PARAGRAPH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("valid paragraph selector"));

#[derive(Debug)]
pub enum ExtractError {
    Encoding(str::Utf8Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Encoding(err) => write!(f, "failed to parse HTML: {err}"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Encoding(err) => Some(err),
        }
    }
}

impl From<str::Utf8Error> for ExtractError {
    fn from(value: str::Utf8Error) -> Self {
        ExtractError::Encoding(value)
    }
}

/// Decodes a fetched body and extracts its paragraph words.
pub fn extract_words_from_bytes(body: &[u8]) -> Result<Vec<String>, ExtractError> {
    extract_words(str::from_utf8(body)?)
}

/// Returns the words of every `<p>` element in document order.
///
/// Headings, tables, navigation and anything else outside a paragraph are
/// ignored. Each paragraph's text nodes are concatenated as-is, normalized
/// with [`normalize_text`] and split on whitespace.
pub fn extract_words(html: &str) -> Result<Vec<String>, ExtractError> {
    let document = Html::parse_document(html);
    let mut words = Vec::new();
    for paragraph in document.select(&PARAGRAPH) {
        let text: String = paragraph.text().collect();
        words.extend(
            normalize_text(&text)
                .split_whitespace()
                .map(str::to_string),
        );
    }
    Ok(words)
}

/// Lowercases letters and keeps only letters, whitespace and apostrophes.
///
/// Dropped characters are removed outright rather than replaced with a space,
/// so `"end.Start"` collapses into `"endstart"`. A letter is anything in the
/// Unicode `L*` categories; letter numbers such as `Ⅻ` and combining marks are
/// dropped, including marks produced by lowercasing (`İ` becomes `i`).
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if is_letter(ch) {
            out.extend(ch.to_lowercase().filter(|&lower| is_letter(lower)));
        } else if ch.is_whitespace() || ch == '\'' {
            out.push(ch);
        }
    }
    out
}

fn is_letter(ch: char) -> bool {
    matches!(
        get_general_category(ch),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_words_only() {
        let html = "<!DOCTYPE html><html><body>\
            <p>Hello, World's Best!</p>\
            <table><tr><td>Ignored</td></tr></table>\
            </body></html>";
        let words = extract_words(html).unwrap();
        assert_eq!(words, vec!["hello", "world's", "best"]);
    }

    #[test]
    fn skips_headings_scripts_and_navigation() {
        let html = "<!DOCTYPE html><html><head><title>Title</title>\
            <script>var x = 1;</script></head><body>\
            <nav>Menu</nav><h1>Heading</h1>\
            <p>First paragraph.</p>\
            <div><h2>Section</h2><p>Second <b>bold</b> <a href=\"#\">link</a></p></div>\
            <ul><li>Item</li></ul>\
            </body></html>";
        let words = extract_words(html).unwrap();
        assert_eq!(
            words,
            vec!["first", "paragraph", "second", "bold", "link"]
        );
    }

    #[test]
    fn nested_markup_is_concatenated_without_spacing() {
        let html = "<!DOCTYPE html><p>foot<sup>[1]</sup>note and more</p>";
        let words = extract_words(html).unwrap();
        assert_eq!(words, vec!["footnote", "and", "more"]);
    }

    #[test]
    fn digits_and_entities_are_dropped() {
        let html = "<!DOCTYPE html><p>In 1990 &amp; 2000, caf&eacute;s grew</p>";
        let words = extract_words(html).unwrap();
        assert_eq!(words, vec!["in", "cafés", "grew"]);
    }

    #[test]
    fn empty_document_yields_no_words() {
        assert!(extract_words("").unwrap().is_empty());
        assert!(extract_words("<p>  123 !! </p>").unwrap().is_empty());
    }

    #[test]
    fn normalize_keeps_apostrophes_and_unicode_letters() {
        assert_eq!(normalize_text("Don't STOP"), "don't stop");
        assert_eq!(normalize_text("Größe, Ärger."), "größe ärger");
        assert_eq!(normalize_text("a-b_c"), "abc");
    }

    #[test]
    fn only_letter_categories_survive() {
        assert_eq!(normalize_text("Chapter Ⅻ ends"), "chapter  ends");
        assert_eq!(normalize_text("cafe\u{301} İstanbul"), "cafe istanbul");
        assert_eq!(normalize_text("ʻOkina 東京"), "ʻokina 東京");
        let words = extract_words("<!DOCTYPE html><p>İZMİR Ⅻ</p>").unwrap();
        assert_eq!(words, vec!["izmir"]);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = extract_words_from_bytes(&[b'<', b'p', b'>', 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
        assert!(err.to_string().starts_with("failed to parse HTML"));
    }

    #[test]
    fn bytes_entry_point_matches_str() {
        let html = "<p>Alpha beta</p>";
        assert_eq!(
            extract_words_from_bytes(html.as_bytes()).unwrap(),
            extract_words(html).unwrap()
        );
    }
}
