//! Robots.txt handling module
//!
//! Robots.txt files are fetched as data capture for the response's meta
//! files, never as an access-control mechanism: the crawl does not gate
//! on them. The parser surfaces declared sitemaps and an informational
//! allow check.

mod parser;

pub use parser::ParsedRobots;
