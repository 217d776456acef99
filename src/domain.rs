//! Domain keys.
//!
//! Policies are keyed by a URL's hostname. The engine takes the host as-is
//! (lowercased by URL parsing) unless `strip_www` is set, in which case a
//! single leading `www.` label is removed.

use url::Url;

/// Derives the policy key for `url`. Unparseable URLs and URLs without a
/// host (e.g. `about:blank`) yield an empty key.
pub fn domain_key(url: &str, strip_www: bool) -> String {
    let host = match Url::parse(url) {
        Ok(u) => u.host_str().unwrap_or_default().to_ascii_lowercase(),
        Err(_) => return String::new(),
    };

    if strip_www {
        strip_www_prefix(&host).to_string()
    } else {
        host
    }
}

/// Removes one leading `www.` label, keeping bare `www` hosts intact.
pub fn strip_www_prefix(host: &str) -> &str {
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => host,
    }
}

/// True when `url` parses and uses the `http` or `https` scheme.
pub fn is_http_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// The URL used to address a domain's cookies when no page URL is known.
pub fn url_for_domain(domain: &str) -> Option<Url> {
    if domain.is_empty() {
        return None;
    }
    Url::parse(&format!("https://{domain}/")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_taken_as_is_by_default() {
        assert_eq!(domain_key("https://www.Shop.Example/cart?x=1", false), "www.shop.example");
        assert_eq!(domain_key("http://shop.example:8080/", false), "shop.example");
        assert_eq!(domain_key("about:blank", false), "");
        assert_eq!(domain_key("not a url", false), "");
    }

    #[test]
    fn www_is_stripped_when_asked() {
        assert_eq!(domain_key("https://www.shop.example/", true), "shop.example");
        assert_eq!(domain_key("https://wwwshop.example/", true), "wwwshop.example");
        assert_eq!(strip_www_prefix("www."), "www.");
    }

    #[test]
    fn http_detection() {
        assert!(is_http_url("https://a.test/"));
        assert!(is_http_url("HTTP://a.test/"));
        assert!(!is_http_url("chrome://extensions"));
        assert!(!is_http_url("file:///tmp/x.html"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn fallback_url() {
        assert_eq!(url_for_domain("shop.example").unwrap().as_str(), "https://shop.example/");
        assert!(url_for_domain("").is_none());
    }
}
