use scraper::{ElementRef, Html, Selector};

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Text of an element as a browser would render it, one text node per line.
/// Script and style contents are skipped.
pub(crate) fn inner_text(el: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    parts.join("\n")
}

/// Collapse whitespace runs into single spaces and trim.
pub(crate) fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn select_doc<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn select_in<'a>(el: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => el.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn first_in<'a>(el: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    el.select(&sel).next()
}

/// Visible text of `<body>`, or of the whole document when there is none.
pub(crate) fn body_text(doc: &Html) -> String {
    match select_doc(doc, "body").into_iter().next() {
        Some(body) => inner_text(body),
        None => inner_text(doc.root_element()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_text_skips_scripts() {
        let doc = Html::parse_document(
            "<body><p>Hello <b>world</b></p><script>var x = 1;</script></body>",
        );
        let text = body_text(&doc);
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn collapse_ws_normalizes() {
        assert_eq!(collapse_ws("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_ws("   "), "");
    }
}
