use scraper::ElementRef;

/// Renders an entry-content element as plain text.
///
/// `p` and `div` become their own lines, `span` flows inline, `br` breaks
/// the line, text nodes contribute their trimmed text and every other
/// element is dropped along with its children.
pub fn render_preview(element: ElementRef<'_>) -> String {
    match element.value().name() {
        "p" | "div" => format!("\n{}\n", render_children(element).trim()),
        "span" => render_children(element).trim().to_string(),
        "br" => "\n".to_string(),
        _ => String::new(),
    }
}

fn render_children(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text.trim());
        } else if let Some(child_element) = ElementRef::wrap(child) {
            out.push_str(&render_preview(child_element));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn preview_of(html: &str) -> String {
        let document = Html::parse_fragment(html);
        let selector = Selector::parse("div").unwrap();
        let root = document.select(&selector).next().unwrap();
        render_preview(root)
    }

    #[test]
    fn test_paragraphs_become_lines() {
        assert_eq!(
            preview_of("<div><p>one</p><p>two</p></div>"),
            "\none\n\ntwo\n"
        );
    }

    #[test]
    fn test_spans_inline_and_breaks() {
        assert_eq!(
            preview_of("<div><span>a</span><span> b </span><br>c</div>"),
            "\nab\nc\n"
        );
    }

    #[test]
    fn test_other_elements_dropped() {
        assert_eq!(
            preview_of("<div>keep<a href=\"x\">link</a><img src=\"y\"><script>bad()</script></div>"),
            "\nkeep\n"
        );
    }

    #[test]
    fn test_whitespace_text_nodes_vanish() {
        assert_eq!(preview_of("<div>\n   <p> x </p>\n</div>"), "\nx\n");
    }
}
