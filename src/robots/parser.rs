//! Robots.txt parser implementation
//!
//! This module provides functionality for parsing robots.txt content using the robotstxt crate.
//! Parsed data is captured for responses; it is never used to gate the crawl.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's types, providing a simplified
/// interface for inspecting a fetched robots.txt file.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used as the default when robots.txt cannot be fetched or parsed.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> String {
        self.content.clone()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// Informational only: the crawl never gates on this.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL path to check (e.g., "/page.html")
    /// * `user_agent` - The user agent string
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            // Empty content or explicit allow-all means allow all
            return true;
        }

        // Parse and check on-demand
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Returns the sitemap URLs declared in the robots.txt file
    ///
    /// `Sitemap:` directives are global (not scoped to a user-agent
    /// group), so every declaration is returned, in file order.
    pub fn sitemaps(&self) -> Vec<String> {
        let mut sitemaps = Vec::new();

        for line in self.content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                if key.trim().eq_ignore_ascii_case("sitemap") {
                    let value = value.trim();
                    if !value.is_empty() {
                        sitemaps.push(value.to_string());
                    }
                }
            }
        }

        sitemaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("/anything", "TestBot"));
        assert!(robots.sitemaps().is_empty());
    }

    #[test]
    fn test_disallow() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert!(!robots.is_allowed("/admin", "TestBot"));
        assert!(robots.is_allowed("/public", "TestBot"));
    }

    #[test]
    fn test_empty_content_allows_all() {
        let robots = ParsedRobots::from_content("");
        assert!(robots.is_allowed("/anything", "TestBot"));
    }

    #[test]
    fn test_sitemaps_extracted() {
        let content = "User-agent: *\nDisallow: /admin\nSitemap: https://example.com/sitemap.xml\nSitemap: https://example.com/news-sitemap.xml";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(
            robots.sitemaps(),
            [
                "https://example.com/sitemap.xml",
                "https://example.com/news-sitemap.xml"
            ]
        );
    }

    #[test]
    fn test_sitemap_case_insensitive() {
        let robots = ParsedRobots::from_content("SITEMAP: https://example.com/s.xml");
        assert_eq!(robots.sitemaps(), ["https://example.com/s.xml"]);
    }

    #[test]
    fn test_comments_ignored() {
        let robots = ParsedRobots::from_content("# Sitemap: https://example.com/fake.xml");
        assert!(robots.sitemaps().is_empty());
    }

    #[test]
    fn test_content_round_trip() {
        let content = "User-agent: *\nDisallow: /private";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.content(), content);
    }
}
