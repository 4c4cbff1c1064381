/// Failures reported by a [`GenerationProvider`](crate::GenerationProvider).
///
/// The split matters: quota and reachability failures fall back to canned
/// knowledge, everything else becomes an apology answer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("generation provider unavailable: {0}")]
    Unavailable(String),
    #[error("generation timed out after {0}s")]
    Timeout(u64),
    #[error("generation failed: {0}")]
    Other(String),
}

impl GenerationError {
    /// Whether the resolver should answer from the knowledge base instead.
    pub fn degrades_to_knowledge(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Unavailable(_))
    }
}

/// Failures of [`ResponseResolver::resolve`](crate::ResponseResolver::resolve).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("message cannot be empty")]
    EmptyUtterance,
}
