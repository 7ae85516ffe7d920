use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used to dedupe the frontier
/// and the page store.
///
/// # Normalization steps
///
/// 1. Parse the URL; reject if malformed.
/// 2. Reject any scheme other than `http`/`https`.
/// 3. Lowercase the host.
/// 4. Strip a single trailing `/` from the path, unless the path is just
///    `/` (the root).
/// 5. Drop the fragment.
///
/// Scheme, path segments, and query string are otherwise left exactly as
/// given — this crawler does not rewrite `http` to `https`, strip a `www.`
/// prefix, or touch query parameters, since two URLs that differ in any of
/// those ways are not guaranteed to serve the same content.
///
/// # Examples
///
/// ```
/// use tue_ripple::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/page/").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "only http and https schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) => {
            let lowercased = host.to_lowercase();
            if lowercased != host {
                url.set_host(Some(&lowercased))
                    .map_err(|e| UrlError::Malformed(format!("failed to set host: {}", e)))?;
            }
        }
        None => return Err(UrlError::MissingDomain),
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_scheme() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn does_not_strip_www() {
        let result = normalize_url("https://www.example.com/").unwrap();
        assert_eq!(result.as_str(), "https://www.example.com/");
    }

    #[test]
    fn removes_single_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn keeps_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn removes_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn preserves_query_string_verbatim() {
        let result = normalize_url("https://example.com/page?b=2&a=1&utm_source=x").unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?b=2&a=1&utm_source=x"
        );
    }

    #[test]
    fn lowercases_host_only() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn rejects_malformed_url() {
        let result = normalize_url("not a url");
        assert!(result.is_err());
    }

    #[test]
    fn empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn combined_host_case_and_trailing_slash_and_fragment() {
        let result = normalize_url("https://WWW.Example.com/a/b/#frag").unwrap();
        assert_eq!(result.as_str(), "https://www.example.com/a/b");
    }
}
