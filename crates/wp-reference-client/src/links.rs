use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://developer.wordpress.org";

const SEARCH_TEMPLATE: &str = "[url]/?s=[search_word]&paged=[paged]";
const HOME_TEMPLATE: &str = "[url]/reference/";
const FILTER_PARAMETER: &str = "post_type[]";
const FILTER_PREFIX: &str = "wp-parser-";

/// Post types the search endpoint can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Function,
    Hook,
    Class,
    Method,
}

impl Filter {
    pub const ALL: [Filter; 4] = [Filter::Function, Filter::Hook, Filter::Class, Filter::Method];

    /// Excluded unless the caller asks for them explicitly.
    pub const DISABLED_BY_DEFAULT: [Filter; 2] = [Filter::Method, Filter::Hook];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Hook => "hook",
            Self::Class => "class",
            Self::Method => "method",
        }
    }

    #[must_use]
    pub fn defaults() -> Vec<Filter> {
        Self::ALL
            .into_iter()
            .filter(|filter| !Self::DISABLED_BY_DEFAULT.contains(filter))
            .collect()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown filter `{value}`"))
    }
}

/// Builds search and reference URLs against one documentation host.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search URL for `term` on page `paged`.
    ///
    /// An empty `filters` slice selects [`Filter::defaults`]; one
    /// `post_type[]` parameter is appended per active filter.
    #[must_use]
    pub fn search_url(&self, term: &str, filters: &[Filter], paged: u32) -> String {
        let mut link = SEARCH_TEMPLATE
            .replace("[search_word]", &urlencoding::encode(term.trim()))
            .replace("[paged]", &paged.to_string())
            .replace("[url]", &self.base_url);

        let active = if filters.is_empty() {
            Filter::defaults()
        } else {
            filters.to_vec()
        };
        for filter in active {
            link.push('&');
            link.push_str(FILTER_PARAMETER);
            link.push('=');
            link.push_str(FILTER_PREFIX);
            link.push_str(filter.as_str());
        }
        link
    }

    #[must_use]
    pub fn home_page(&self) -> String {
        HOME_TEMPLATE.replace("[url]", &self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_skip_hooks_and_methods() {
        let links = LinkBuilder::default();
        assert_eq!(
            links.search_url("absint", &[], 1),
            "https://developer.wordpress.org/?s=absint&paged=1\
             &post_type[]=wp-parser-function&post_type[]=wp-parser-class"
        );
    }

    #[test]
    fn explicit_filter_replaces_defaults() {
        let links = LinkBuilder::default();
        let url = links.search_url("admin_footer", &[Filter::Hook], 3);
        assert!(url.ends_with("?s=admin_footer&paged=3&post_type[]=wp-parser-hook"));
    }

    #[test]
    fn term_is_trimmed_and_encoded() {
        let links = LinkBuilder::new("http://127.0.0.1:8080/");
        let url = links.search_url("  get user ", &[Filter::Function], 1);
        assert_eq!(
            url,
            "http://127.0.0.1:8080/?s=get%20user&paged=1&post_type[]=wp-parser-function"
        );
        assert!(reqwest::Url::parse(&url).is_ok());
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("Method".parse::<Filter>(), Ok(Filter::Method));
        assert!("post".parse::<Filter>().is_err());
        assert_eq!(Filter::defaults(), vec![Filter::Function, Filter::Class]);
    }

    #[test]
    fn home_page_points_at_reference_root() {
        assert_eq!(
            LinkBuilder::default().home_page(),
            "https://developer.wordpress.org/reference/"
        );
    }
}
