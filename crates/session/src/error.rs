use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential exists. Fatal to the calling run; the operator
    /// has to run the session bootstrap command.
    #[error("session not configured (missing {})", missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    /// A credential refresh was requested in a context that cannot prompt.
    #[error("interactive login required; run `statgram session set`")]
    LoginUnavailable,

    /// Reading or writing the session file failed. Fatal, no retry.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The session file exists but a value cannot be used as-is.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl Error {
    #[must_use]
    pub fn not_configured(missing: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::NotConfigured {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
