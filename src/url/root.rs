use crate::config::PlatformEntry;
use crate::UrlError;
use url::{Host, Url};

/// Two-level public suffixes the base-domain derivation recognizes
///
/// Best-effort subset; hosts whose suffix is not covered here fall back to
/// the two rightmost labels.
const TWO_LEVEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.jp", "or.jp", "ne.jp",
    "co.nz", "com.br", "com.mx", "co.in", "co.za", "com.cn", "com.sg", "com.tr",
];

/// Returns the origin of a URL in `scheme://host[:port]` form
pub fn origin_of(url: &Url) -> String {
    match url.port() {
        Some(port) => format!(
            "{}://{}:{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            port
        ),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
    }
}

/// Checks whether a target URL belongs to an allowlisted platform origin
///
/// Platform origins are matched case-insensitively on `scheme://host`. The
/// user flag forces platform-mode classification regardless of the
/// allowlist.
///
/// # Arguments
///
/// * `target` - The normalized target URL
/// * `user_flag` - The per-request `isPlatformURL` override
/// * `platforms` - Configured platform origins
pub fn is_platform_url(target: &Url, user_flag: bool, platforms: &[PlatformEntry]) -> bool {
    if user_flag {
        return true;
    }

    let origin = origin_of(target).to_lowercase();
    platforms
        .iter()
        .any(|entry| entry.origin.trim_end_matches('/').to_lowercase() == origin)
}

/// Computes the registrable base domain (eTLD+1) of a host, best effort
///
/// Strips leftmost labels until one label remains before the registered
/// suffix. Returns `None` when the host is an IP address, has fewer than
/// two labels, or is exactly a recognized two-level suffix - callers fall
/// back to the origin in those cases.
///
/// # Examples
///
/// ```
/// use linkarbor::url::base_domain;
///
/// assert_eq!(base_domain("blog.example.com"), Some("example.com".to_string()));
/// assert_eq!(base_domain("a.b.example.co.uk"), Some("example.co.uk".to_string()));
/// assert_eq!(base_domain("localhost"), None);
/// ```
pub fn base_domain(host: &str) -> Option<String> {
    // IP addresses have no registrable domain
    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if TWO_LEVEL_SUFFIXES.contains(&last_two.as_str()) {
        if labels.len() < 3 {
            // The host IS the suffix; nothing registrable in front of it
            return None;
        }
        return Some(labels[labels.len() - 3..].join("."));
    }

    Some(last_two)
}

/// Derives the crawl root URL for a target
///
/// Selection rules, in priority order:
///
/// 1. Platform mode (target's origin is allowlisted, or forced by the
///    caller AND the target origin matches the allowlist): the root is the
///    target itself, narrowing the crawl to the target's subtree.
/// 2. `subdomain_as_root`: the root is the target's origin, keeping the
///    subdomain.
/// 3. Otherwise the root is `scheme://<base domain>`. When the base domain
///    cannot be determined (IP hosts, single-label hosts, unknown
///    suffixes beyond the built-in list), the root falls back to the
///    origin.
///
/// # Arguments
///
/// * `target` - The normalized target URL
/// * `subdomain_as_root` - Treat the subdomain host as the root
/// * `platforms` - Configured platform origins
///
/// # Returns
///
/// * `Ok(Url)` - The derived root URL
/// * `Err(UrlError)` - The derived root failed to parse (malformed host)
pub fn derive_root_url(
    target: &Url,
    subdomain_as_root: bool,
    platforms: &[PlatformEntry],
) -> Result<Url, UrlError> {
    // Platform targets root at themselves
    if is_platform_url(target, false, platforms) {
        return Ok(target.clone());
    }

    let host = target.host_str().ok_or(UrlError::MissingHost)?;

    let root_str = if subdomain_as_root {
        format!("{}/", origin_of(target))
    } else {
        match (target.host(), base_domain(host)) {
            (Some(Host::Domain(_)), Some(base)) => format!("{}://{}/", target.scheme(), base),
            // IP hosts and unknown suffixes fall back to the origin
            _ => format!("{}/", origin_of(target)),
        }
    };

    Url::parse(&root_str).map_err(|e| UrlError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn platforms() -> Vec<PlatformEntry> {
        vec![
            PlatformEntry {
                origin: "https://github.com".to_string(),
            },
            PlatformEntry {
                origin: "https://linkedin.com".to_string(),
            },
        ]
    }

    #[test]
    fn test_origin_of() {
        let url = normalize_url("https://example.com/a/b").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");

        let url = normalize_url("http://example.com:8080/a").unwrap();
        assert_eq!(origin_of(&url), "http://example.com:8080");
    }

    #[test]
    fn test_is_platform_url_allowlisted() {
        let url = normalize_url("https://github.com/alice").unwrap();
        assert!(is_platform_url(&url, false, &platforms()));
    }

    #[test]
    fn test_is_platform_url_case_insensitive() {
        let url = normalize_url("https://GITHUB.com/alice").unwrap();
        assert!(is_platform_url(&url, false, &platforms()));
    }

    #[test]
    fn test_is_platform_url_user_flag() {
        let url = normalize_url("https://example.com/alice").unwrap();
        assert!(!is_platform_url(&url, false, &platforms()));
        assert!(is_platform_url(&url, true, &platforms()));
    }

    #[test]
    fn test_base_domain_simple() {
        assert_eq!(base_domain("example.com"), Some("example.com".to_string()));
        assert_eq!(
            base_domain("blog.example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            base_domain("a.b.c.example.com"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_base_domain_two_level_suffix() {
        assert_eq!(
            base_domain("www.example.co.uk"),
            Some("example.co.uk".to_string())
        );
        assert_eq!(base_domain("example.co.uk"), Some("example.co.uk".to_string()));
    }

    #[test]
    fn test_base_domain_unknown() {
        assert_eq!(base_domain("localhost"), None);
        assert_eq!(base_domain("127.0.0.1"), None);
        assert_eq!(base_domain("co.uk"), None);
    }

    #[test]
    fn test_derive_root_platform_is_target() {
        let target = normalize_url("https://github.com/alice").unwrap();
        let root = derive_root_url(&target, false, &platforms()).unwrap();
        assert_eq!(root, target);
    }

    #[test]
    fn test_derive_root_subdomain_as_root() {
        let target = normalize_url("https://blog.example.com/post/1").unwrap();
        let root = derive_root_url(&target, true, &platforms()).unwrap();
        assert_eq!(root.as_str(), "https://blog.example.com/");
    }

    #[test]
    fn test_derive_root_base_domain() {
        let target = normalize_url("https://blog.example.com/post/1").unwrap();
        let root = derive_root_url(&target, false, &platforms()).unwrap();
        assert_eq!(root.as_str(), "https://example.com/");
    }

    #[test]
    fn test_derive_root_ip_falls_back_to_origin() {
        let target = normalize_url("http://127.0.0.1:8080/a/b").unwrap();
        let root = derive_root_url(&target, false, &platforms()).unwrap();
        assert_eq!(root.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_derive_root_single_label_falls_back_to_origin() {
        let target = normalize_url("http://localhost/a").unwrap();
        let root = derive_root_url(&target, false, &platforms()).unwrap();
        assert_eq!(root.as_str(), "http://localhost/");
    }
}
