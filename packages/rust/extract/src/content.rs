//! Main-content extraction from rendered markup.
//!
//! The cleaning policy is data-driven: an ordered denylist of non-content
//! selectors, then a priority-ordered list of primary-content containers.
//! Denylisted regions are excluded before container selection, so a
//! container nested inside page chrome is never chosen. `clean` never
//! fails; the worst case is the whole document's text.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Non-content regions removed before text extraction: navigation, page
/// chrome, scripts, cookie/marketing banners, ads, search widgets, menus,
/// and social-link blocks.
const DENYLIST: &str = "nav, header, footer, aside, script, style, noscript, \
     [role=\"navigation\"], [role=\"banner\"], [role=\"contentinfo\"], [role=\"search\"], \
     .sidebar, .nav, .navbar, .menu, .breadcrumb, \
     .cookie-banner, .cookie-consent, .cookie-notice, .banner, \
     .ad, .ads, .advertisement, .promo, \
     .search, .search-box, .social, .social-links, .share";

/// Primary-content containers, tried in priority order.
const PRIMARY_CONTAINERS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    ".main-content",
    ".content",
];

static DENY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(DENYLIST).expect("static selector"));

static PRIMARY_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    PRIMARY_CONTAINERS
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector"));

/// Extract the textual main content of a rendered document.
///
/// Selects the first matching primary container (`main`, `article`,
/// `[role="main"]`, then conventional main-content classes) that is not
/// itself inside a denylisted region, with denylisted subtrees excluded
/// from its text; falls back to the body, then the whole document.
pub fn clean(markup: &str) -> String {
    let doc = Html::parse_document(markup);

    for sel in PRIMARY_SELS.iter() {
        if let Some(el) = doc.select(sel).find(|el| !inside_denylisted(*el)) {
            return text_without_chrome(el);
        }
    }

    if let Some(body) = doc.select(&BODY_SEL).next() {
        return text_without_chrome(body);
    }

    text_without_chrome(doc.root_element())
}

/// Whether any ancestor of `el` matches the denylist.
fn inside_denylisted(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| DENY_SEL.matches(&ancestor))
}

/// Text content of an element with denylisted subtrees excluded.
///
/// Walks the parsed tree directly, so removal survives parser
/// restructuring (tables, foster-parented content) that would defeat any
/// string-level surgery on the serialized markup.
fn text_without_chrome(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !DENY_SEL.matches(&child_el) {
                collect_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

/// Collapse all runs of whitespace to single spaces.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::new();
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
