use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The surrounding run was cancelled while this operation slept.
    #[error("ingest cancelled")]
    Cancelled,

    #[error(transparent)]
    Client(#[from] statgram_client::Error),

    #[error(transparent)]
    Session(#[from] statgram_session::Error),

    /// Persistence failure from the storage collaborator.
    #[error("persistence failed: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Self::Store(source)
    }
}
