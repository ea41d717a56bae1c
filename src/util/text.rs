use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Truncate `s` to at most `max_width` terminal columns, appending "..."
/// when something was cut. Widths too narrow for an ellipsis get a plain
/// cut instead.
///
/// ```
/// use readr::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("你好世界", 7), "你好...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    let (budget, suffix) = if max_width > ELLIPSIS.len() {
        (max_width - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (max_width, "")
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }
    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Remove terminal control characters and ANSI escape sequences from
/// server-provided text. Tab and newline are kept.
///
/// ```
/// use readr::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain"), "plain");
/// assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: parameters up to a final byte in @..~
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: up to BEL or ST
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' || (c == '\x1b' && chars.next_if_eq(&'\\').is_some()) {
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_stripped(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn is_stripped(c: char) -> bool {
    c.is_control() && c != '\t' && c != '\n'
}

/// Render entry HTML as wrapped plain-text lines for a `width`-column
/// viewport. Falls back to the raw markup, stripped of control
/// characters, when the document cannot be parsed.
pub fn html_to_lines(html: &str, width: usize) -> Vec<String> {
    let width = width.max(10);
    let text = match html2text::config::plain().string_from_read(html.as_bytes(), width) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render entry HTML");
            html.to_string()
        }
    };
    strip_control_chars(&text)
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_borrows_when_it_fits() {
        assert!(matches!(truncate_to_width("fits", 4), Cow::Borrowed(_)));
        assert_eq!(truncate_to_width("", 0), "");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Testing", 3), "Tes");
        assert_eq!(truncate_to_width("Testing", 4), "T...");
    }

    #[test]
    fn test_truncate_wide_char_not_split() {
        // Budget of 3 columns after the ellipsis fits one CJK char only.
        assert_eq!(truncate_to_width("日本語テキスト", 6), "日...");
    }

    #[test]
    fn test_strip_osc_and_controls() {
        assert_eq!(strip_control_chars("a\x1b]0;title\x07b"), "ab");
        assert_eq!(strip_control_chars("a\x1b]8;;x\x1b\\b"), "ab");
        assert_eq!(strip_control_chars("tab\there\r\n"), "tab\there\n");
        assert_eq!(strip_control_chars("del\x7f"), "del");
    }

    #[test]
    fn test_html_to_lines_renders_text() {
        let lines = html_to_lines("<p>Hello <b>world</b></p><p>Second</p>", 40);
        let joined = lines.join("\n");
        assert!(joined.contains("Hello"));
        assert!(joined.contains("world"));
        assert!(joined.contains("Second"));
        assert!(!joined.contains("<p>"));
    }

    #[test]
    fn test_html_to_lines_wraps() {
        let body = "word ".repeat(40);
        let lines = html_to_lines(&format!("<p>{}</p>", body), 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| UnicodeWidthStr::width(l.as_str()) <= 20));
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds_width(s in "[a-zA-Z0-9 日本語éü]{0,40}", width in 0usize..30) {
            let out = truncate_to_width(&s, width);
            prop_assert!(UnicodeWidthStr::width(out.as_ref()) <= width);
        }

        #[test]
        fn prop_stripped_has_no_escapes(s in any::<String>()) {
            let out = strip_control_chars(&s);
            prop_assert!(!out.contains('\x1b'));
        }
    }
}
