/// Whether credentials travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Omit,
    Include,
}

/// How intermediaries may serve the request from their own caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass every cache, never store.
    NoStore,
    /// Revalidate with the origin before using a cached copy.
    NoCache,
}

/// Headers that carry credentials and are dropped when credentials are omitted.
const CREDENTIAL_HEADERS: &[&str] = &["cookie", "authorization", "proxy-authorization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    pub credentials: Credentials,
    pub cache: CacheMode,
}

impl FetchOptions {
    /// Options for requests routed on behalf of a page.
    pub fn routing() -> Self {
        Self {
            credentials: Credentials::Omit,
            cache: CacheMode::NoStore,
        }
    }

    /// Options for manifest pre-caching.
    pub fn seeding() -> Self {
        Self {
            credentials: Credentials::Omit,
            cache: CacheMode::NoCache,
        }
    }

    /// Rewrite request headers to honor these options.
    pub fn apply(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = headers
            .iter()
            .filter(|(name, _)| {
                self.credentials == Credentials::Include
                    || !CREDENTIAL_HEADERS
                        .iter()
                        .any(|c| name.eq_ignore_ascii_case(c))
            })
            .filter(|(name, _)| {
                self.cache == CacheMode::Default
                    || !(name.eq_ignore_ascii_case("cache-control")
                        || name.eq_ignore_ascii_case("pragma"))
            })
            .cloned()
            .collect();

        let directive = match self.cache {
            CacheMode::Default => None,
            CacheMode::NoStore => Some("no-store"),
            CacheMode::NoCache => Some("no-cache"),
        };
        if let Some(directive) = directive {
            out.push(("cache-control".to_string(), directive.to_string()));
            out.push(("pragma".to_string(), "no-cache".to_string()));
        }
        out
    }
}
