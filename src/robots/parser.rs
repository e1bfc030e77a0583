//! robots.txt rules for one site

use robotstxt::DefaultMatcher;

/// A robots.txt body, or the permissive rules used when none is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    content: Option<String>,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Rules that allow everything; used when robots.txt is missing or
    /// could not be fetched
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.content.as_deref().map_or(true, |c| c.trim().is_empty())
    }

    /// Checks a full URL or a path against the rules for `user_agent`
    ///
    /// `user_agent` is the product token only (e.g. "AutoAlert"), not the
    /// full header value.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "AutoAlert";

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allow_all());
        assert!(robots.is_allowed("https://cars.example.com/search", AGENT));
    }

    #[test]
    fn test_disallow_everything() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://cars.example.com/", AGENT));
        assert!(!robots.is_allowed("https://cars.example.com/search?ms=3500", AGENT));
    }

    #[test]
    fn test_disallow_specific_path() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /account");
        assert!(robots.is_allowed("https://cars.example.com/search", AGENT));
        assert!(!robots.is_allowed("https://cars.example.com/account/alerts", AGENT));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /fahrzeuge\nAllow: /fahrzeuge/search");
        assert!(!robots.is_allowed("https://cars.example.com/fahrzeuge/detail/1", AGENT));
        assert!(robots.is_allowed("https://cars.example.com/fahrzeuge/search?s=Car", AGENT));
    }

    #[test]
    fn test_agent_specific_group() {
        let robots =
            ParsedRobots::from_content("User-agent: AutoAlert\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed("https://cars.example.com/search", AGENT));
        assert!(robots.is_allowed("https://cars.example.com/search", "OtherBot"));
    }

    #[test]
    fn test_garbage_and_empty_allow() {
        let garbage = ParsedRobots::from_content("this is not robots.txt {{{");
        assert!(garbage.is_allowed("https://cars.example.com/search", AGENT));

        let empty = ParsedRobots::from_content("");
        assert!(empty.is_allow_all());
        assert!(empty.is_allowed("https://cars.example.com/search", AGENT));
    }
}
