use std::cmp::Ordering;
use url::Url;

/// Returns the non-empty path segments of a URL
pub fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the path depth of a URL (number of non-empty segments)
pub fn path_depth(url: &Url) -> usize {
    path_segments(url).len()
}

/// Computes the ancestor paths of a target URL, shallow to deep
///
/// For `https://h/a/b/c` the ancestors are `https://h/`, `https://h/a`,
/// and `https://h/a/b`. The target itself is excluded. A bare origin has
/// no ancestors.
///
/// Ancestors carry no query or fragment and follow the normalized form
/// (trailing slash only on the root path).
///
/// # Examples
///
/// ```
/// use linkarbor::url::{ancestor_paths, normalize_url};
///
/// let target = normalize_url("https://example.com/a/b/c").unwrap();
/// let ancestors = ancestor_paths(&target);
/// let strings: Vec<&str> = ancestors.iter().map(|u| u.as_str()).collect();
/// assert_eq!(strings, ["https://example.com/", "https://example.com/a", "https://example.com/a/b"]);
/// ```
pub fn ancestor_paths(target: &Url) -> Vec<Url> {
    let segments = path_segments(target);
    if segments.is_empty() {
        return Vec::new();
    }

    let mut base = target.clone();
    base.set_query(None);
    base.set_fragment(None);

    let mut ancestors = Vec::with_capacity(segments.len());
    for depth in 0..segments.len() {
        let mut ancestor = base.clone();
        if depth == 0 {
            ancestor.set_path("/");
        } else {
            ancestor.set_path(&format!("/{}", segments[..depth].join("/")));
        }
        ancestors.push(ancestor);
    }

    ancestors
}

/// Returns true when `candidate`'s path strictly extends `base`'s path on
/// the same host
///
/// The check is segment-wise: `/ab` does not extend `/a`.
pub fn is_path_descendant(candidate: &Url, base: &Url) -> bool {
    if candidate.host_str() != base.host_str() || candidate.scheme() != base.scheme() {
        return false;
    }

    let base_segments = path_segments(base);
    let candidate_segments = path_segments(candidate);

    candidate_segments.len() > base_segments.len()
        && candidate_segments[..base_segments.len()] == base_segments[..]
}

/// Orders two URLs shallow-first, then lexicographically
///
/// This is the ordering used both for descendant enumeration and for
/// choosing which kin get scraped under the kin limit.
pub fn compare_kin(a: &Url, b: &Url) -> Ordering {
    path_depth(a)
        .cmp(&path_depth(b))
        .then_with(|| a.as_str().cmp(b.as_str()))
}

/// Selects the URLs in `candidates` whose paths strictly extend the
/// target's path on the same host
///
/// The result is ordered by path depth ascending, then lexicographically,
/// and is deduplicated.
///
/// # Arguments
///
/// * `target` - The URL whose descendants are wanted
/// * `candidates` - Candidate URLs, typically the accumulated internal
///   link set of a request
pub fn descendant_paths(target: &Url, candidates: &[Url]) -> Vec<Url> {
    let mut descendants: Vec<Url> = candidates
        .iter()
        .filter(|candidate| is_path_descendant(candidate, target))
        .cloned()
        .collect();

    descendants.sort_by(compare_kin);
    descendants.dedup();

    descendants
}
