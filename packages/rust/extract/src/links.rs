//! Anchor discovery and URL resolution for rendered markup.
//!
//! `extract_links` is a pure function: malformed markup yields fewer or no
//! links, never an error. Deduplication happens later, in the orchestrator,
//! so callers see every anchor in order of first appearance.

use scraper::{Html, Selector};
use tracing::trace;
use url::Url;

use pagebrief_shared::ExtractedLink;

/// Scan rendered markup for anchors and resolve each href to an absolute URL
/// against `base`. Fragment-only anchors (`#section`), `javascript:` and
/// `mailto:` hrefs are skipped. Output order is order of first appearance.
pub fn extract_links(markup: &str, base: &Url) -> Vec<ExtractedLink> {
    let doc = Html::parse_document(markup);
    let anchor_sel = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();

    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        let Some(url) = resolve_href(href, base) else {
            trace!(href, "unresolvable href, skipping");
            continue;
        };

        let text = el.text().collect::<String>().trim().to_string();
        links.push(ExtractedLink { url, text });
    }

    links
}

/// Resolve an href to an absolute URL:
/// - absolute `http(s)` hrefs pass through unchanged;
/// - protocol-relative hrefs (`//host/path`) adopt the base scheme;
/// - hrefs starting with `/` resolve against the base origin;
/// - all other relative hrefs resolve as `origin + "/" + href`.
fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href).ok();
    }

    if let Some(rest) = href.strip_prefix("//") {
        return Url::parse(&format!("{}://{rest}", base.scheme())).ok();
    }

    let origin = origin_of(base)?;

    let absolute = if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    };

    Url::parse(&absolute).ok()
}

/// The scheme + host (+ port) of a URL, without any path.
fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn markup_without_anchors_yields_nothing() {
        let links = extract_links(
            "<html><body><p>No links here.</p></body></html>",
            &base("https://docs.example.com/"),
        );
        assert!(links.is_empty());
    }

    #[test]
    fn malformed_markup_never_fails() {
        let links = extract_links(
            "<html><body><a href=/docs>Docs<p></body>",
            &base("https://docs.example.com/"),
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url.as_str(), "https://docs.example.com/docs");
    }

    #[test]
    fn fragment_only_anchor_is_excluded() {
        let html = r##"<a href="#section">Jump</a><a href="/real">Real</a>"##;
        let links = extract_links(html, &base("https://docs.example.com/"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Real");
    }

    #[test]
    fn javascript_and_mailto_are_excluded() {
        let html = r#"<a href="javascript:void(0)">JS</a><a href="mailto:a@b.c">Mail</a>"#;
        let links = extract_links(html, &base("https://docs.example.com/"));
        assert!(links.is_empty());
    }

    #[test]
    fn root_relative_href_resolves_against_origin() {
        let html = r#"<a href="/docs">Docs</a>"#;
        let links = extract_links(html, &base("https://example.com/a/b"));
        assert_eq!(links[0].url.as_str(), "https://example.com/docs");
    }

    #[test]
    fn bare_relative_href_resolves_against_origin_root() {
        // Deliberately not RFC 3986 join: "guide" on /a/b resolves to /guide.
        let html = r#"<a href="guide">Guide</a>"#;
        let links = extract_links(html, &base("https://example.com/a/b"));
        assert_eq!(links[0].url.as_str(), "https://example.com/guide");
    }

    #[test]
    fn absolute_href_passes_through() {
        let html = r#"<a href="https://other.example.com/page">Other</a>"#;
        let links = extract_links(html, &base("https://docs.example.com/"));
        assert_eq!(links[0].url.as_str(), "https://other.example.com/page");
    }

    #[test]
    fn protocol_relative_href_adopts_base_scheme() {
        let html = r#"<a href="//cdn.example.com/asset">Asset</a>"#;
        let links = extract_links(html, &base("https://docs.example.com/"));
        assert_eq!(links[0].url.as_str(), "https://cdn.example.com/asset");
    }

    #[test]
    fn origin_keeps_explicit_port() {
        let html = r#"<a href="/docs">Docs</a>"#;
        let links = extract_links(html, &base("http://localhost:8080/index"));
        assert_eq!(links[0].url.as_str(), "http://localhost:8080/docs");
    }

    #[test]
    fn anchor_text_is_trimmed_and_may_be_empty() {
        let html = r#"<a href="/a">  Spaced  </a><a href="/b"><img src="x.png"></a>"#;
        let links = extract_links(html, &base("https://docs.example.com/"));
        assert_eq!(links[0].text, "Spaced");
        assert_eq!(links[1].text, "");
    }

    #[test]
    fn output_preserves_document_order_without_dedup() {
        let html = r#"
            <a href="/second">Second</a>
            <a href="/first">First seen later in name only</a>
            <a href="/second">Second again</a>
        "#;
        let links = extract_links(html, &base("https://docs.example.com/"));
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://docs.example.com/second",
                "https://docs.example.com/first",
                "https://docs.example.com/second",
            ]
        );
    }
}
