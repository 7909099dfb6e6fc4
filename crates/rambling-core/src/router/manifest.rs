use reqwest::Url;

use crate::net::NetError;

/// Paths pre-cached so logged-out visitors can browse offline.
pub const LOGGED_OUT_URLS: &[&str] = &[
    "/",
    "/about",
    "/contact",
    "/404",
    "/login",
    "/offline",
    "/css/style.css",
    "/js/blog.js",
    "/js/home.js",
    "/js/login.js",
    "/js/add-post.js",
    "/images/logo.gif",
    "/images/offline.png",
];

/// Ordered, read-only list of URLs to pre-cache.
///
/// Entries are paths relative to the origin or absolute URLs; each entry
/// is also the key its response is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    urls: Vec<String>,
}

impl Manifest {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn logged_out() -> Self {
        Self::new(LOGGED_OUT_URLS.iter().map(|u| u.to_string()).collect())
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Absolute URL to fetch for an entry.
    pub fn resolve(origin: &Url, entry: &str) -> Result<Url, NetError> {
        origin
            .join(entry)
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", entry, e)))
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::logged_out()
    }
}
