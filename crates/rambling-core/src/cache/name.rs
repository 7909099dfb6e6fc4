use std::fmt;

/// Name of a versioned cache store, rendered as `<prefix>-<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheName {
    prefix: String,
    version: u32,
}

impl CacheName {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Extract the version embedded in `name` if it is exactly
    /// `<prefix>-<digits>`.
    pub fn parse_version(name: &str, prefix: &str) -> Option<u32> {
        let digits = name.strip_prefix(prefix)?.strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// A store is stale when it belongs to this prefix, carries a positive
    /// version, and that version is not the running one.
    pub fn is_stale(&self, name: &str) -> bool {
        match Self::parse_version(name, &self.prefix) {
            Some(version) => version > 0 && version != self.version,
            None => false,
        }
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.version)
    }
}
