/// What happened to one manifest URL during seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Already present and reload was not forced; nothing fetched.
    AlreadyCached,
    /// Fetched and written to the store.
    Stored,
    /// Fetched but the status was not 2xx; nothing written.
    Rejected(u16),
    /// Fetch or store failed; ignored.
    Failed,
}

/// Per-URL results of a seeding pass, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub outcomes: Vec<(String, SeedOutcome)>,
}

impl SeedReport {
    pub fn count(&self, outcome: SeedOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn stored(&self) -> usize {
        self.count(SeedOutcome::Stored)
    }

    pub fn outcome(&self, url: &str) -> Option<SeedOutcome> {
        self.outcomes
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, o)| *o)
    }
}
