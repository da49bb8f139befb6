//! Readable-text extraction: turns an HTML document into the plain text of
//! its main article, stripping navigation, ads, scripts, and style blocks.
//!
//! Two strategies, tried in order: a readability-style main-content
//! heuristic (look for `<article>`/`<main>`/`role="main"` containers), and a
//! tag-stripping fallback over the whole document. Fails only if both yield
//! zero non-whitespace characters.

mod error;

use scraper::{ElementRef, Html, Node, Selector};

pub use error::ExtractError;

/// The plain-text result of extracting one HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub text: String,
    pub title: Option<String>,
}

/// Extracts the main article text (and, incidentally, the page title) from
/// `html`.
pub fn extract(html: &str) -> Result<ExtractedPage, ExtractError> {
    let document = Html::parse_document(html);

    let main = main_content_heuristic(&document);
    let text = if !main.trim().is_empty() {
        main
    } else {
        tag_stripped_fallback(&document)
    };

    if text.trim().is_empty() {
        return Err(ExtractError::NoTextContent);
    }

    Ok(ExtractedPage {
        text,
        title: extract_title(&document),
    })
}

fn main_content_heuristic(document: &Html) -> String {
    let selector = Selector::parse("article, main, [role='main']").expect("static selector");
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&collect_visible_text(el)))
        .max_by_key(String::len)
        .unwrap_or_default()
}

fn tag_stripped_fallback(document: &Html) -> String {
    collapse_whitespace(&collect_visible_text(document.root_element()))
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&collect_visible_text(el)))
        .filter(|t| !t.is_empty())
}

/// Walks `element`'s subtree collecting text-node content, skipping
/// `<script>`/`<style>` subtrees entirely so their raw-text children never
/// leak into the result.
fn collect_visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_visible_text_into(*element, &mut out);
    out
}

fn collect_visible_text_into(node: ego_tree::NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Element(el) => {
            let name = el.name();
            if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
                return;
            }
            for child in node.children() {
                collect_visible_text_into(child, out);
            }
        }
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_the_article_tag_over_surrounding_chrome() {
        let html = r#"
            <html><head><title>My Page</title></head>
            <body>
              <nav>Home About Contact</nav>
              <article><p>This is the real content of the page.</p></article>
              <footer>Copyright 2026</footer>
            </body></html>
        "#;
        let extracted = extract(html).unwrap();
        assert!(extracted.text.contains("real content"));
        assert_eq!(extracted.title.as_deref(), Some("My Page"));
    }

    #[test]
    fn strips_script_and_style_blocks() {
        let html = r#"
            <html><body>
              <script>var x = "should not appear";</script>
              <style>.a { color: red; }</style>
              <p>Visible paragraph text.</p>
            </body></html>
        "#;
        let extracted = extract(html).unwrap();
        assert!(extracted.text.contains("Visible paragraph text."));
        assert!(!extracted.text.contains("should not appear"));
        assert!(!extracted.text.contains("color: red"));
    }

    #[test]
    fn falls_back_to_tag_stripping_when_no_main_content_container_exists() {
        let html = "<html><body><div>Just a plain div with <b>some</b> text.</div></body></html>";
        let extracted = extract(html).unwrap();
        assert!(extracted.text.contains("Just a plain div with some text."));
    }

    #[test]
    fn empty_document_fails_with_no_text_content() {
        let html = "<html><head><style>.a{}</style></head><body><script>1</script></body></html>";
        assert!(matches!(extract(html), Err(ExtractError::NoTextContent)));
    }

    #[test]
    fn whitespace_is_collapsed_to_single_spaces() {
        let html = "<html><body><article><p>hello\n\n   world</p></article></body></html>";
        let extracted = extract(html).unwrap();
        assert_eq!(extracted.text, "hello world");
    }
}
