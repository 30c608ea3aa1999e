use async_trait::async_trait;

use crate::{
    credential::Credential,
    error::{Error, Result},
};

/// Seam for obtaining a fresh credential during
/// [`crate::SessionStore::refresh`].
///
/// The CLI implements this with terminal prompts; daemon contexts use
/// [`NonInteractive`], which refuses instead of blocking on input.
#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Produce a replacement credential. `existing` is the credential being
    /// replaced, if any; `force` requests regeneration even when the
    /// existing one looks usable.
    async fn login(&self, existing: Option<&Credential>, force: bool) -> Result<Credential>;
}

/// Login flow for contexts without a terminal. Always fails so a scheduled
/// run surfaces a bootstrap problem to the operator instead of hanging.
pub struct NonInteractive;

#[async_trait]
impl LoginFlow for NonInteractive {
    async fn login(&self, _existing: Option<&Credential>, _force: bool) -> Result<Credential> {
        Err(Error::LoginUnavailable)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_interactive_never_prompts() {
        let err = NonInteractive.login(None, true).await.unwrap_err();
        assert!(matches!(err, Error::LoginUnavailable));
    }
}
