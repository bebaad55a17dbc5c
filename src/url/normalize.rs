use crate::UrlError;
use url::Url;

/// Normalizes a URL according to linkarbor's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Lowercase the scheme and host (handled by the parser)
/// 4. Strip the default port for the scheme
/// 5. Normalize path:
///    - Collapse duplicate slashes
///    - Lowercase percent-encoded triplets
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove fragment (everything after #)
///
/// The result is idempotent: normalizing an already-normalized URL yields
/// the same URL. Query strings are preserved as-is.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use linkarbor::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/page/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    // Step 1: Parse the URL
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    // Step 4: Strip default ports (80 for http, 443 for https)
    let default_port = match url.scheme() {
        "http" => 80,
        _ => 443,
    };
    if url.port() == Some(default_port) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to clear default port".to_string()))?;
    }

    // Step 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    Ok(url)
}

/// Normalizes a URL path: collapses duplicate slashes, lowercases
/// percent-encoded triplets, and strips the trailing slash on non-root paths
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    // Collapse duplicate slashes by dropping empty segments
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let joined = format!("/{}", segments.join("/"));
    lowercase_percent_triplets(&joined)
}

/// Lowercases the hex digits of every percent-encoded triplet in a path
///
/// Paths produced by the `url` crate are ASCII (non-ASCII bytes are
/// percent-encoded), so byte-wise scanning is sound here.
fn lowercase_percent_triplets(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push('%');
            out.push(bytes[i + 1].to_ascii_lowercase() as char);
            out.push(bytes[i + 2].to_ascii_lowercase() as char);
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    out
}
