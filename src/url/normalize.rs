use crate::UrlError;
use url::Url;

/// Query parameters that never identify a listing
///
/// Result pages decorate detail links with search context and campaign
/// tags; two links that differ only in these point to the same vehicle.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "ref",
    "source",
    "searchid",
    "search_id",
    "position",
    "page",
    "pagenumber",
    "action",
    "issearchrequest",
];

/// Canonicalizes a listing detail URL
///
/// # Steps
///
/// 1. Parse; only http and https are accepted
/// 2. Lowercase the host and drop a leading `www.`
/// 3. Remove dot segments, duplicate slashes and the trailing slash
/// 4. Drop the fragment
/// 5. Drop tracking and search-context parameters, sort the rest
///
/// The scheme is kept as is, so a listing served over plain http keeps a
/// distinct identity from its https twin only if the site really serves both.
///
/// # Examples
///
/// ```
/// use auto_alert::url::canonical_listing_url;
///
/// let url = canonical_listing_url(
///     "https://WWW.Cars.example.com/details/381234567/?searchId=ab12&utm_source=mail#gallery",
/// )
/// .unwrap();
/// assert_eq!(url.as_str(), "https://cars.example.com/details/381234567");
/// ```
pub fn canonical_listing_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes dot segments, empty segments and the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme() {
        let result = canonical_listing_url("http://127.0.0.1:8080/details/1").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/details/1");
    }

    #[test]
    fn test_remove_www_and_lowercase_host() {
        let result = canonical_listing_url("https://WWW.Example.com/Details/1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Details/1");
    }

    #[test]
    fn test_remove_trailing_slash_and_fragment() {
        let result = canonical_listing_url("https://example.com/details/1/#photos").unwrap();
        assert_eq!(result.as_str(), "https://example.com/details/1");
    }

    #[test]
    fn test_strips_search_context() {
        let result = canonical_listing_url(
            "https://example.com/details.html?id=42&searchId=x&pageNumber=3&utm_campaign=y",
        )
        .unwrap();
        assert_eq!(result.as_str(), "https://example.com/details.html?id=42");
    }

    #[test]
    fn test_sorts_remaining_params() {
        let result = canonical_listing_url("https://example.com/d?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/d?a=1&b=2");
    }

    #[test]
    fn test_dot_segments_and_slashes() {
        let result = canonical_listing_url("https://example.com//a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");

        let root = canonical_listing_url("https://example.com").unwrap();
        assert_eq!(root.as_str(), "https://example.com/");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            canonical_listing_url("ftp://example.com/x"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            canonical_listing_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_idempotent() {
        let once = canonical_listing_url("https://www.example.com/d/7/?z=1&utm_source=a").unwrap();
        let twice = canonical_listing_url(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }
}
