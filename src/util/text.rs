use std::borrow::Cow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

fn is_stripped_control(c: char) -> bool {
    c == '\u{7f}' || (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}

/// Removes terminal control characters and ANSI escape sequences.
///
/// Tab, newline and carriage return survive. CSI sequences (`ESC [`) run to
/// their final byte, OSC sequences (`ESC ]`) to BEL or `ESC \`. Clean input
/// is returned borrowed.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            if !is_stripped_control(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{07}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Display width in terminal columns (CJK and emoji count double).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Shortens `s` to at most `max_width` columns, ending in `...` when cut.
///
/// Widths too narrow for a character plus the ellipsis get a plain cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let ellipsis = if max_width > ELLIPSIS.len() { ELLIPSIS } else { "" };
    let budget = max_width - ellipsis.len();

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{ellipsis}", &s[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clean_text_is_borrowed() {
        let input = "line\ttab\r\nnext 日本語";
        assert!(matches!(sanitize(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_drops_c0_and_del() {
        assert_eq!(sanitize("a\x00b\x07c\x7fd"), "abcd");
    }

    #[test]
    fn test_sanitize_drops_escape_sequences() {
        assert_eq!(sanitize("\x1b[1;31mred\x1b[0m"), "red");
        assert_eq!(sanitize("\x1b]0;title\x07text"), "text");
        assert_eq!(sanitize("\x1b]0;title\x1b\\text"), "text");
        assert_eq!(sanitize("a\x1bb"), "ab");
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Testing", 3), "Tes");
        assert_eq!(truncate_to_width("你好", 1), "");
    }
}
