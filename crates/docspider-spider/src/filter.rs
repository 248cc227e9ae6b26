//! URL normalization and relevance filtering.
//!
//! A value object scoped to one crawl's base hostname, in the same style
//! as the teacher's `riptide-config::spider::UrlProcessingConfig` (closed
//! exclude lists fixed at construction time) but driven by the fixed,
//! closed sets this spec names rather than a configurable regex list —
//! there's nothing here for an operator to tune per crawl.

use std::collections::BTreeSet;
use url::Url;

const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
    "campaign",
    "affiliate",
    "gclid",
    "fbclid",
];

const FORBIDDEN_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "tiff",
    // stylesheets / scripts
    "css", "js", "mjs",
    // archives
    "zip", "tar", "gz", "tgz", "rar", "7z",
    // media
    "mp3", "mp4", "avi", "mov", "wav", "ogg", "webm",
    // fonts
    "woff", "woff2", "ttf", "eot", "otf",
    // structured-data exports
    "json", "xml", "csv", "rss", "atom",
    // executables
    "exe", "dmg", "msi", "deb", "rpm", "apk",
];

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "commercial",
    "legal",
    "blog",
    "commerce",
    "support",
    "auth",
    "account",
    "social",
    "tracking",
    "sitemap",
    "github.com",
    "gitlab.com",
    "bitbucket.org",
];

/// Normalizes and relevance-filters URLs against one crawl's base host.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    base_host: String,
}

impl UrlFilter {
    /// `base_url` provides the hostname every discovered link is checked
    /// against. Returns an error if `base_url` has no host.
    pub fn new(base_url: &Url) -> Result<Self, FilterError> {
        let base_host = base_url
            .host_str()
            .ok_or(FilterError::NoHost)?
            .to_ascii_lowercase();
        Ok(Self { base_host })
    }

    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    /// Strip whitespace and trailing `:;,.`, drop fragment, force
    /// `https`, drop trailing slash (except root), lowercase host, strip
    /// tracking query params, re-encode remaining query params sorted.
    pub fn normalize(&self, raw: &str) -> Result<Url, FilterError> {
        let trimmed = raw.trim().trim_end_matches([':', ';', ',', '.']);
        let mut url = Url::parse(trimmed).map_err(FilterError::Parse)?;

        let _ = url.set_scheme("https");
        url.set_fragment(None);

        if let Some(host) = url.host_str() {
            let lower = host.to_ascii_lowercase();
            if lower != host {
                let _ = url.set_host(Some(&lower));
            }
        }

        let filtered_pairs: BTreeSet<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if filtered_pairs.is_empty() {
            url.set_query(None);
        } else {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &filtered_pairs {
                serializer.append_pair(k, v);
            }
            url.set_query(Some(&serializer.finish()));
        }

        let path = url.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            url.set_path(path.trim_end_matches('/'));
        }

        Ok(url)
    }

    /// True unless the URL fails one of the relevance checks. Callers
    /// should normalize first; this does not re-normalize.
    pub fn is_relevant(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let same_host = host == self.base_host;
        let www_variant = host == format!("www.{}", self.base_host);
        let subdomain = host.ends_with(&format!(".{}", self.base_host));
        if !(same_host || www_variant || subdomain) {
            return false;
        }

        let path = url.path();
        if let Some(ext) = path.rsplit('.').next() {
            if path.contains('.') && FORBIDDEN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                return false;
            }
        }

        let full = url.as_str().to_ascii_lowercase();
        if FORBIDDEN_KEYWORDS.iter().any(|kw| full.contains(kw)) {
            return false;
        }

        if path.is_empty() || path == "/" {
            return false;
        }

        true
    }

    /// RFC-3986 reference resolution against `base`.
    pub fn resolve(&self, base: &Url, reference: &str) -> Result<Url, FilterError> {
        base.join(reference).map_err(FilterError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("base URL has no host")]
    NoHost,
    #[error("url parse error: {0}")]
    Parse(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UrlFilter {
        UrlFilter::new(&Url::parse("https://docs.example.com/").unwrap()).unwrap()
    }

    #[test]
    fn normalize_strips_fragment_and_trailing_slash() {
        let f = filter();
        let n = f.normalize("https://docs.example.com/guide/#section").unwrap();
        assert_eq!(n.as_str(), "https://docs.example.com/guide");
    }

    #[test]
    fn normalize_keeps_root_slash() {
        let f = filter();
        let n = f.normalize("https://docs.example.com/").unwrap();
        assert_eq!(n.path(), "/");
    }

    #[test]
    fn normalize_forces_https_and_lowercases_host() {
        let f = filter();
        let n = f.normalize("http://DOCS.Example.com/Guide").unwrap();
        assert_eq!(n.scheme(), "https");
        assert_eq!(n.host_str(), Some("docs.example.com"));
    }

    #[test]
    fn normalize_strips_tracking_params_and_sorts_rest() {
        let f = filter();
        let n = f
            .normalize("https://docs.example.com/guide?z=1&utm_source=x&a=2")
            .unwrap();
        assert_eq!(n.query(), Some("a=2&z=1"));
    }

    #[test]
    fn normalize_trims_stray_trailing_punctuation() {
        let f = filter();
        let n = f.normalize("  https://docs.example.com/guide. ").unwrap();
        assert_eq!(n.path(), "/guide");
    }

    #[test]
    fn is_relevant_accepts_same_host_www_and_subdomain() {
        let f = filter();
        assert!(f.is_relevant(&Url::parse("https://docs.example.com/guide").unwrap()));
        assert!(f.is_relevant(&Url::parse("https://www.docs.example.com/guide").unwrap()));
        assert!(f.is_relevant(&Url::parse("https://api.docs.example.com/guide").unwrap()));
    }

    #[test]
    fn is_relevant_rejects_other_hosts() {
        let f = filter();
        assert!(!f.is_relevant(&Url::parse("https://evil.com/guide").unwrap()));
    }

    #[test]
    fn is_relevant_rejects_forbidden_extensions() {
        let f = filter();
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com/logo.png").unwrap()));
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com/app.js").unwrap()));
    }

    #[test]
    fn is_relevant_rejects_forbidden_keywords() {
        let f = filter();
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com/blog/post").unwrap()));
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com/account/settings").unwrap()));
    }

    #[test]
    fn is_relevant_rejects_empty_path() {
        let f = filter();
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com/").unwrap()));
        assert!(!f.is_relevant(&Url::parse("https://docs.example.com").unwrap()));
    }

    #[test]
    fn resolve_joins_relative_reference() {
        let f = filter();
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        let resolved = f.resolve(&base, "setup").unwrap();
        assert_eq!(resolved.as_str(), "https://docs.example.com/guide/setup");
    }

    #[test]
    fn resolve_handles_parent_reference() {
        let f = filter();
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        let resolved = f.resolve(&base, "../other").unwrap();
        assert_eq!(resolved.as_str(), "https://docs.example.com/other");
    }
}
