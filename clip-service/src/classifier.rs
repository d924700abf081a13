//! Content-type classification and title derivation for captured text
//!
//! Both functions are pure; every capture path (keyboard command, page agent,
//! clipboard poller, CLI) goes through them exactly once at creation time.

use crate::item::ContentType;
use lazy_static::lazy_static;
use regex::Regex;

/// Longest title kept for links and code
const MAX_TITLE_CHARS: usize = 50;
/// Prefix kept for plain text titles that overflow `MAX_TITLE_CHARS`
const TRUNCATED_TITLE_CHARS: usize = 47;
const CODE_PLACEHOLDER_TITLE: &str = "Code snippet";

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(r"(?i)^https?://").expect("valid link regex");
    static ref IMAGE_RE: Regex =
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg)$").expect("valid image regex");
}

/// Substrings that mark text as source code; first match wins
const CODE_MARKERS: &[&str] = &[
    "function ",
    "const ",
    "import ",
    "export ",
    "SELECT ",
    "FROM ",
    "<script",
    "<?php",
];

/// Leading characters that mark structured data or code
const CODE_OPENERS: &[char] = &['{', '[', '('];

/// Line prefixes skipped when picking a title for code
const COMMENT_PREFIXES: &[&str] = &["//", "#", "/*", "*", "--", "<!--"];

/// Classify raw text into a content type.
///
/// Callers must reject empty or whitespace-only text before calling.
pub fn classify(text: &str) -> ContentType {
    let trimmed = text.trim();

    if LINK_RE.is_match(trimmed) {
        return ContentType::Link;
    }

    if IMAGE_RE.is_match(trimmed) {
        return ContentType::Image;
    }

    if CODE_MARKERS.iter().any(|marker| text.contains(marker))
        || trimmed.starts_with(CODE_OPENERS)
    {
        return ContentType::Code;
    }

    ContentType::Text
}

/// Derive a short display title for `text` of the given type.
pub fn derive_title(text: &str, content_type: ContentType) -> String {
    match content_type {
        ContentType::Link => link_title(text),
        ContentType::Code => code_title(text),
        ContentType::Image => image_title(text).unwrap_or_else(|| text_title(text)),
        ContentType::Text => text_title(text),
    }
}

fn link_title(text: &str) -> String {
    let trimmed = text.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => take_chars(host.strip_prefix("www.").unwrap_or(host), MAX_TITLE_CHARS),
            None => take_chars(trimmed, MAX_TITLE_CHARS),
        },
        Err(_) => take_chars(trimmed, MAX_TITLE_CHARS),
    }
}

fn code_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty() && !COMMENT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
        })
        .map(|line| take_chars(line, MAX_TITLE_CHARS))
        .unwrap_or_else(|| CODE_PLACEHOLDER_TITLE.to_string())
}

/// File name of an image reference, when it has a path we can split
fn image_title(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let name = trimmed
        .rsplit(&['/', '\\'][..])
        .next()
        .filter(|name| !name.is_empty() && name.len() < trimmed.len())?;
    Some(take_chars(name, MAX_TITLE_CHARS))
}

fn text_title(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default().trim();
    if first_line.chars().count() > MAX_TITLE_CHARS {
        format!("{}...", take_chars(first_line, TRUNCATED_TITLE_CHARS))
    } else {
        first_line.to_string()
    }
}

fn take_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_link() {
        assert_eq!(classify("https://openai.com/blog/x"), ContentType::Link);
        assert_eq!(classify("  HTTP://EXAMPLE.COM  "), ContentType::Link);
        // Malformed but still matches the prefix
        assert_eq!(classify("http://"), ContentType::Link);
    }

    #[test]
    fn test_link_wins_over_image() {
        assert_eq!(
            classify("https://cdn.example.com/cat.png"),
            ContentType::Link
        );
    }

    #[test]
    fn test_classify_image() {
        assert_eq!(classify("/home/me/Pictures/cat.PNG"), ContentType::Image);
        assert_eq!(classify("logo.svg"), ContentType::Image);
        assert_eq!(classify("photo.jpeg.txt"), ContentType::Text);
    }

    #[test]
    fn test_classify_code() {
        assert_eq!(classify("SELECT * FROM users"), ContentType::Code);
        assert_eq!(classify("const x = 1;"), ContentType::Code);
        assert_eq!(classify("{\"a\": 1}"), ContentType::Code);
        assert_eq!(classify("  (lambda x: x)"), ContentType::Code);
        assert_eq!(classify("<?php echo 1; ?>"), ContentType::Code);
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(classify("Remember to buy milk"), ContentType::Text);
        // Keywords are case-sensitive
        assert_eq!(classify("select the best option"), ContentType::Text);
    }

    #[test]
    fn test_link_title_strips_www() {
        assert_eq!(
            derive_title("https://www.example.com/path", ContentType::Link),
            "example.com"
        );
        assert_eq!(
            derive_title("https://openai.com/blog/x", ContentType::Link),
            "openai.com"
        );
    }

    #[test]
    fn test_link_title_falls_back_on_parse_failure() {
        let text = format!("http://[bad{}", "x".repeat(80));
        let title = derive_title(&text, ContentType::Link);
        assert_eq!(title.chars().count(), 50);
        assert!(text.starts_with(&title));
    }

    #[test]
    fn test_code_title_skips_comments() {
        let code = "// helper\n\n# note\nfn main() {}\n";
        assert_eq!(derive_title(code, ContentType::Code), "fn main() {}");
        assert_eq!(
            derive_title("SELECT * FROM users", ContentType::Code),
            "SELECT * FROM users"
        );
    }

    #[test]
    fn test_code_title_placeholder() {
        assert_eq!(
            derive_title("// only\n// comments", ContentType::Code),
            "Code snippet"
        );
    }

    #[test]
    fn test_code_title_truncated() {
        let code = format!("const value = \"{}\";", "a".repeat(100));
        assert_eq!(derive_title(&code, ContentType::Code).chars().count(), 50);
    }

    #[test]
    fn test_text_title_truncation() {
        let short = "A short note\nsecond line";
        assert_eq!(derive_title(short, ContentType::Text), "A short note");

        let exactly_fifty = "b".repeat(50);
        assert_eq!(derive_title(&exactly_fifty, ContentType::Text), exactly_fifty);

        let long = "c".repeat(51);
        let title = derive_title(&long, ContentType::Text);
        assert_eq!(title, format!("{}...", "c".repeat(47)));
    }

    #[test]
    fn test_text_title_counts_chars_not_bytes() {
        let long = "é".repeat(60);
        let title = derive_title(&long, ContentType::Text);
        assert_eq!(title.chars().count(), 50);
    }

    #[test]
    fn test_image_title() {
        assert_eq!(
            derive_title("/tmp/shots/screen.png", ContentType::Image),
            "screen.png"
        );
        assert_eq!(derive_title("screen.png", ContentType::Image), "screen.png");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_http_prefix_is_link(scheme in "https?", rest in "[a-zA-Z0-9./ _-]{0,40}") {
            let text = format!("{}://{}", scheme, rest);
            prop_assert_eq!(classify(&text), ContentType::Link);
        }

        #[test]
        fn prop_image_suffix_is_image(
            stem in "[a-z0-9_/]{1,20}",
            ext in prop::sample::select(vec!["jpg", "JPEG", "png", "Gif", "webp", "SVG"]),
        ) {
            let text = format!("{}.{}", stem, ext);
            prop_assert_eq!(classify(&text), ContentType::Image);
        }

        #[test]
        fn prop_function_keyword_is_code(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let text = format!("{}function {}", prefix, suffix);
            prop_assert_eq!(classify(&text), ContentType::Code);
        }

        #[test]
        fn prop_titles_are_bounded(text in "\\PC{1,200}") {
            let content_type = classify(&text);
            prop_assert!(derive_title(&text, content_type).chars().count() <= 50);
        }
    }
}
