//! Small helpers over `scraper` shared by the page parsers.

use scraper::{ElementRef, Html, Selector};

use crate::error::{CrawlError, ErrorCode};

pub(crate) fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| {
        CrawlError::from_code(ErrorCode::Internal, format!("invalid selector {css:?}: {e}"))
    })
}

/// All text under `element`, concatenated.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of the first descendant matching `sel`, stripped.
pub(crate) fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(|e| text(e).trim().to_string())
}

/// Detach every element under the first `scope` match that matches `target`
/// and satisfies `doomed`.
///
/// Detached nodes stay in the arena, so later lookups must walk from
/// `root_element()` rather than `Html::select`.
pub(crate) fn detach_where(
    document: &mut Html,
    scope: &Selector,
    target: &Selector,
    doomed: impl Fn(ElementRef<'_>) -> bool,
) {
    let ids: Vec<_> = match document.root_element().select(scope).next() {
        Some(root) => root
            .select(target)
            .filter(|e| doomed(*e))
            .map(|e| e.id())
            .collect(),
        None => return,
    };
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detach_where_removes_only_matching() {
        let mut doc = Html::parse_document(
            r#"<div id="root"><p class="x">keep</p><p class="x">drop</p></div><p class="x">outside</p>"#,
        );
        let root = selector("#root").unwrap();
        let p = selector("p.x").unwrap();
        detach_where(&mut doc, &root, &p, |e| text(e) == "drop");

        let remaining: Vec<String> = doc.root_element().select(&p).map(text).collect();
        assert_eq!(remaining, vec!["keep", "outside"]);
    }

    #[test]
    fn invalid_selector_is_internal_error() {
        let err = selector("div[").unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }
}
