use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// No chunk has ever been added to the lexical corpus.
    #[error("Lexical corpus is empty")]
    EmptyCorpus,

    #[error("Lexical rebuild failed: {0}")]
    LexicalRebuildFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that leave the engine usable in a degraded mode rather than
    /// failing the surrounding call.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::EmptyCorpus | Error::LexicalRebuildFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lexical_failures_degrade() {
        assert!(Error::EmptyCorpus.is_degradable());
        assert!(Error::LexicalRebuildFailed("capacity".into()).is_degradable());
        assert!(!Error::StoreUnavailable("down".into()).is_degradable());
        assert!(!Error::EmbeddingUnavailable("down".into()).is_degradable());
        assert!(!Error::InvalidConfiguration("bad".into()).is_degradable());
    }
}
