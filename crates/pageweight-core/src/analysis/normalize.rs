use url::Url;

/// Canonical form of a URL for deduplication.
///
/// Query string and fragment are dropped so cache-busting parameters do not
/// split one logical resource into several. Never fails: unparseable input is
/// cut at the first `?` or `#` instead.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => {
                let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
                format!("{}://{}{}{}", url.scheme(), host, port, url.path()).to_lowercase()
            }
            // data:, blob:, about: and friends carry no host
            None => {
                let mut stripped = url;
                stripped.set_query(None);
                stripped.set_fragment(None);
                stripped.as_str().to_lowercase()
            }
        },
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_fragment_dropped() {
        assert_eq!(normalize_url("https://a.com/x.js?v=2"), "https://a.com/x.js");
        assert_eq!(
            normalize_url("https://a.com/x.js?v=2"),
            normalize_url("https://a.com/x.js?v=9")
        );
        assert_eq!(normalize_url("https://a.com/x.css#top"), "https://a.com/x.css");
    }

    #[test]
    fn test_lowercased() {
        assert_eq!(
            normalize_url("HTTPS://CDN.Example.com/Static/App.JS?x=1"),
            "https://cdn.example.com/static/app.js"
        );
    }

    #[test]
    fn test_port_kept_when_explicit() {
        assert_eq!(normalize_url("http://a.com:8080/x"), "http://a.com:8080/x");
        assert_eq!(normalize_url("https://a.com:443/x"), "https://a.com/x");
    }

    #[test]
    fn test_unparseable_falls_back() {
        assert_eq!(normalize_url("/static/App.js?v=3"), "/static/app.js");
        assert_eq!(normalize_url("not a url#frag"), "not a url");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_hostless_url() {
        assert_eq!(
            normalize_url("data:image/png;base64,AAAA"),
            "data:image/png;base64,aaaa"
        );
    }
}
