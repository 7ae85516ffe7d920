//! URL normalizer & extractor (C6): pulls outbound links and page text out
//! of a fetched body, whether it's HTML or an XML feed.
//!
//! Normalization itself lives in [`crate::url::normalize_url`]; this module
//! is the "extractor" half — link/text discovery over a raw response body.

use scraper::{Html, Selector};
use url::Url;

/// Page body read window: pages over this size are only scanned up to
/// [`TRUNCATED_READ_BYTES`].
const LARGE_PAGE_BYTES: usize = 1024 * 1024;
const TRUNCATED_READ_BYTES: usize = 512 * 1024;

/// Per-page cap on extracted links.
const MAX_LINKS_PER_PAGE: usize = 1000;

/// Everything pulled out of a fetched page body.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
    pub links: Vec<String>,
}

/// Extracts links and text from a page body, dispatching to the HTML or
/// XML/feed extractor by a quick content sniff, truncating oversized
/// bodies and capping the link count per the page-size/link budgets.
pub fn extract(body: &str, base_url: &Url, content_type: Option<&str>) -> ExtractedPage {
    let window = truncate_window(body);

    let mut page = if looks_like_xml(window, content_type) {
        extract_xml(window, base_url)
    } else {
        extract_html(window, base_url)
    };

    page.links.retain(|link| !is_sitemap_url(link));
    page.links.truncate(MAX_LINKS_PER_PAGE);
    page
}

/// Returns the prefix of `body` to actually scan: the whole thing unless
/// it's over 1 MiB, in which case only the first 500 KiB.
fn truncate_window(body: &str) -> &str {
    if body.len() <= LARGE_PAGE_BYTES {
        return body;
    }
    let mut end = TRUNCATED_READ_BYTES.min(body.len());
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn looks_like_xml(body: &str, content_type: Option<&str>) -> bool {
    if let Some(ct) = content_type {
        let ct = ct.to_lowercase();
        if ct.contains("xml") || ct.contains("rss") || ct.contains("atom") {
            return true;
        }
        if ct.contains("html") {
            return false;
        }
    }
    body.trim_start().starts_with("<?xml") || body.trim_start().starts_with("<rss")
}

fn extract_html(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = extract_text(&document);
    let links = extract_html_links(&document, base_url);

    ExtractedPage { title, text, links }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects visible body text for the scorer's text score, skipping
/// `<script>`/`<style>` content, which `scraper`'s text iterator would
/// otherwise include verbatim.
fn extract_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut text = String::new();
    collect_text(body, &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

fn collect_text(element: scraper::ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = scraper::ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            collect_text(child_el, out);
        } else if let Some(text_node) = child.value().as_text() {
            out.push_str(text_node);
            out.push(' ');
        }
    }
}

fn extract_html_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    links.push(url);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    links.push(url);
                }
            }
        }
    }

    links
}

/// Extracts links and concatenated text content from an RSS/Atom/generic
/// XML document: `<link href>` attributes, bare `<link>` text content, and
/// `<enclosure url>` attributes, per the feed dialects' differing
/// conventions for where a link actually lives.
fn extract_xml(xml: &str, base_url: &Url) -> ExtractedPage {
    let mut links = Vec::new();
    let mut text_parts = Vec::new();

    for (tag, attr) in [("link", "href"), ("enclosure", "url")] {
        for href in find_attr_values(xml, tag, attr) {
            if let Some(url) = resolve_link(&href, base_url) {
                links.push(url);
            }
        }
    }

    for bare in find_element_text(xml, "link") {
        let bare = bare.trim();
        if !bare.is_empty() {
            if let Some(url) = resolve_link(bare, base_url) {
                links.push(url);
            }
        }
    }

    for tag in ["title", "description", "summary", "content"] {
        text_parts.extend(find_element_text(xml, tag));
    }

    let title = text_parts.first().cloned();
    let text = text_parts.join(" ");
    let text = html_escape::decode(&text);

    ExtractedPage { title, text, links }
}

/// Finds `attr="..."` values on `<tag ...>` elements via a tolerant scan
/// rather than a full XML parse — feeds in the wild are frequently not
/// well-formed enough for a strict parser to survive.
fn find_attr_values(xml: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut out = Vec::new();
    let open = format!("<{}", tag);
    let mut search_from = 0;

    while let Some(start) = xml[search_from..].find(&open) {
        let abs_start = search_from + start;
        let Some(tag_end) = xml[abs_start..].find('>') else {
            break;
        };
        let tag_text = &xml[abs_start..abs_start + tag_end];
        if let Some(value) = extract_attr(tag_text, attr) {
            out.push(value);
        }
        search_from = abs_start + tag_end + 1;
    }

    out
}

fn extract_attr(tag_text: &str, attr: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let needle = format!("{}={}", attr, quote);
        if let Some(pos) = tag_text.find(&needle) {
            let rest = &tag_text[pos + needle.len()..];
            if let Some(end) = rest.find(quote) {
                return Some(html_escape::decode(&rest[..end]));
            }
        }
    }
    None
}

/// Collects the text content of every `<tag>...</tag>` element, including
/// CDATA-wrapped content.
fn find_element_text(xml: &str, tag: &str) -> Vec<String> {
    let mut out = Vec::new();
    let open_start = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut search_from = 0;

    while let Some(open_pos) = xml[search_from..].find(&open_start) {
        let abs_open = search_from + open_pos;
        let Some(open_tag_end) = xml[abs_open..].find('>') else {
            break;
        };
        let content_start = abs_open + open_tag_end + 1;
        let Some(close_rel) = xml[content_start..].find(&close) else {
            break;
        };
        let raw = &xml[content_start..content_start + close_rel];
        out.push(strip_cdata(raw).trim().to_string());
        search_from = content_start + close_rel + close.len();
    }

    out
}

fn strip_cdata(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
    {
        inner.to_string()
    } else {
        html_escape::decode(trimmed)
    }
}

/// Resolves an href/link target to an absolute http(s) URL, filtering the
/// same non-document schemes the original HTML-only parser excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Drops sitemap references: `sitemap*.xml`, `/sitemap`, `sitemap_index*.xml`.
fn is_sitemap_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    let last_segment = lower.rsplit('/').next().unwrap_or(&lower);

    last_segment.starts_with("sitemap_index") && last_segment.ends_with(".xml")
        || last_segment.starts_with("sitemap") && last_segment.ends_with(".xml")
        || last_segment == "sitemap"
        || lower.ends_with("/sitemap")
}

/// Minimal HTML entity decoding, covering the handful of entities that
/// actually show up in link hrefs and feed text (`&amp;`, `&lt;`, `&gt;`,
/// `&quot;`, `&#39;`, and numeric references).
mod html_escape {
    pub fn decode(input: &str) -> String {
        if !input.contains('&') {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(amp_pos) = rest.find('&') {
            out.push_str(&rest[..amp_pos]);
            let after_amp = &rest[amp_pos + 1..];

            if let Some(semi_rel) = after_amp.find(';').filter(|&p| p <= 10) {
                let entity = &after_amp[..semi_rel];
                if let Some(decoded) = decode_entity(entity) {
                    out.push(decoded);
                    rest = &after_amp[semi_rel + 1..];
                    continue;
                }
            }

            out.push('&');
            rest = after_amp;
        }
        out.push_str(rest);
        out
    }

    fn decode_entity(entity: &str) -> Option<char> {
        match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            other => {
                if let Some(code) = other.strip_prefix("#x").or_else(|| other.strip_prefix("#X")) {
                    u32::from_str_radix(code, 16)
                        .ok()
                        .and_then(char::from_u32)
                } else if let Some(code) = other.strip_prefix('#') {
                    code.parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn extracts_title_and_text() {
        let html = r#"<html><head><title>Tübingen</title></head>
            <body><p>A town on the Neckar.</p><script>ignored();</script></body></html>"#;
        let page = extract(html, &base_url(), Some("text/html"));
        assert_eq!(page.title, Some("Tübingen".to_string()));
        assert!(page.text.contains("A town on the Neckar."));
        assert!(!page.text.contains("ignored"));
    }

    #[test]
    fn extracts_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://other.com/a">A</a>
            <a href="/b">B</a>
        </body></html>"#;
        let page = extract(html, &base_url(), Some("text/html"));
        assert!(page.links.contains(&"https://other.com/a".to_string()));
        assert!(page.links.contains(&"https://example.com/b".to_string()));
    }

    #[test]
    fn skips_javascript_and_mailto_links() {
        let html = r#"<html><body>
            <a href="javascript:void(0)">x</a>
            <a href="mailto:a@b.com">y</a>
        </body></html>"#;
        let page = extract(html, &base_url(), Some("text/html"));
        assert!(page.links.is_empty());
    }

    #[test]
    fn drops_sitemap_links() {
        let html = r#"<html><body>
            <a href="/sitemap.xml">sitemap</a>
            <a href="/sitemap_index.xml">index</a>
            <a href="/page">page</a>
        </body></html>"#;
        let page = extract(html, &base_url(), Some("text/html"));
        assert_eq!(page.links, vec!["https://example.com/page".to_string()]);
    }

    #[test]
    fn caps_links_per_page() {
        let mut html = String::from("<html><body>");
        for i in 0..1500 {
            html.push_str(&format!("<a href=\"/p{}\">p</a>", i));
        }
        html.push_str("</body></html>");
        let page = extract(&html, &base_url(), Some("text/html"));
        assert_eq!(page.links.len(), MAX_LINKS_PER_PAGE);
    }

    #[test]
    fn extracts_rss_links_and_text() {
        let xml = r#"<?xml version="1.0"?>
        <rss><channel>
            <title>Tübingen News</title>
            <item>
                <title>Campus event</title>
                <link>https://example.com/event</link>
                <description><![CDATA[An event on campus.]]></description>
            </item>
        </channel></rss>"#;
        let page = extract(xml, &base_url(), Some("application/rss+xml"));
        assert!(page
            .links
            .contains(&"https://example.com/event".to_string()));
        assert!(page.text.contains("An event on campus."));
    }

    #[test]
    fn extracts_atom_link_href() {
        let xml = r#"<?xml version="1.0"?>
        <feed>
            <entry>
                <title>Entry</title>
                <link href="https://example.com/entry" rel="alternate"/>
            </entry>
        </feed>"#;
        let page = extract(xml, &base_url(), Some("application/atom+xml"));
        assert!(page
            .links
            .contains(&"https://example.com/entry".to_string()));
    }

    #[test]
    fn truncates_oversized_pages() {
        let filler = "x".repeat(LARGE_PAGE_BYTES + 10);
        let html = format!(
            "<html><body><a href=\"/before\">b</a>{}<a href=\"/after\">a</a></body></html>",
            filler
        );
        let page = extract(&html, &base_url(), Some("text/html"));
        assert!(page.links.contains(&"https://example.com/before".to_string()));
        assert!(!page.links.contains(&"https://example.com/after".to_string()));
    }
}
