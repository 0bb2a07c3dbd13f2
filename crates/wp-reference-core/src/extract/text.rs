use once_cell::sync::Lazy;
use regex::Regex;

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").expect("valid regex"));
static ANY_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DROPPED_H2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h2(?:\s[^>]*)?>.*?</h2>").expect("valid regex"));
static DROPPED_I: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<i(?:\s[^>]*)?>.*?</i>").expect("valid regex"));
static UNWRAPPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:code|a|section)(?:\s[^>]*)?/?>").expect("valid regex")
});
static PARAGRAPH_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").expect("valid regex"));
static ITEM_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</li\s*>").expect("valid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SPACE_AROUND_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("valid regex"));
static EXTRA_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Collapses runs of two or more whitespace characters into one space.
pub fn collapse_whitespace(value: &str) -> String {
    MULTI_SPACE.replace_all(value, " ").into_owned()
}

pub fn strip_parentheses(value: &str) -> String {
    value.replace(['(', ')'], "").trim().to_string()
}

/// Case-insensitive removal of every `needle` occurrence.
pub fn remove_ignore_case(value: &str, needle: &str) -> String {
    if needle.is_empty() {
        return value.to_string();
    }
    let pattern = format!("(?i){}", regex::escape(needle));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(value, "").into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Turns the serialized description section into plain text.
///
/// Headings and italics go with their content, `code`/`a`/`section` tags are
/// unwrapped, paragraphs end in a blank line and list items in a newline;
/// every other tag is stripped and entities decoded.
pub fn sanitize_description(markup: &str) -> String {
    let text = DROPPED_H2.replace_all(markup, "");
    let text = DROPPED_I.replace_all(&text, "");
    let text = UNWRAPPED.replace_all(&text, "");
    let text = ANY_SPACE.replace_all(&text, " ");
    let text = PARAGRAPH_END.replace_all(&text, "\n\n");
    let text = ITEM_END.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = text.replace('\u{a0}', " ");
    let text = SPACE_AROUND_BREAK.replace_all(&text, "\n");
    let text = EXTRA_BREAKS.replace_all(&text, "\n\n");
    let text = MULTI_SPACE.replace_all(&text, |caps: &regex::Captures<'_>| {
        if caps[0].contains('\n') {
            caps[0].to_string()
        } else {
            " ".to_string()
        }
    });
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_only() {
        assert_eq!(collapse_whitespace("a  b\n\n c d"), "a b c d");
    }

    #[test]
    fn strips_parentheses() {
        assert_eq!(strip_parentheses("(int|string)"), "int|string");
        assert_eq!(strip_parentheses(" (Optional) "), "Optional");
    }

    #[test]
    fn removes_prefix_case_insensitively() {
        assert_eq!(
            remove_ignore_case("File: wp-includes/functions.php", "file: "),
            "wp-includes/functions.php"
        );
    }

    #[test]
    fn sanitizes_description_markup() {
        let markup = r#"<section class="description">
            <h2>Description</h2>
            <p>Convert a value to
               non-negative integer. See <a href="/x"><code>intval()</code></a>.</p>
            <p><i>Deprecated</i>Second &amp; last.</p>
            <ul><li>one</li><li>two</li></ul>
        </section>"#;

        assert_eq!(
            sanitize_description(markup),
            "Convert a value to non-negative integer. See intval().\n\nSecond & last.\n\none\ntwo"
        );
    }
}
