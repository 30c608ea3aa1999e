use secrecy::{ExposeSecret, Secret};

use crate::{
    ENV_API_HASH_KEY, ENV_API_ID_KEY, ENV_SESSION_KEY,
    error::{Error, Result},
};

/// The credential used to open an authenticated connection to the platform:
/// a serialized session string plus the API application identity it was
/// issued for.
///
/// Created once by the session bootstrap command, then reused across process
/// restarts. Fetch jobs read cloned copies; only [`crate::SessionStore`]
/// replaces it.
#[derive(Clone)]
pub struct Credential {
    /// Serialized authenticated session.
    pub session: Secret<String>,

    /// API application id.
    pub api_id: i32,

    /// API application hash.
    pub api_hash: Secret<String>,

    /// Account phone number, kept for re-login.
    pub phone: Option<String>,

    /// Optional 2FA password.
    pub password: Option<Secret<String>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("session", &"[REDACTED]")
            .field("api_id", &self.api_id)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Whether `other` carries the same session string.
    #[must_use]
    pub fn same_session(&self, other: &Credential) -> bool {
        self.session.expose_secret() == other.session.expose_secret()
    }
}

/// Partial credential input, e.g. from CLI flags. Unset fields fall back to
/// whatever is already stored.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    pub session: Option<String>,
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl CredentialUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.session.is_none()
            && self.api_id.is_none()
            && self.api_hash.is_none()
            && self.phone.is_none()
            && self.password.is_none()
    }
}

/// Field-wise conflict resolution between a stored credential and incoming
/// input.
///
/// An incoming field wins only when it is set and either `force` is true or
/// the stored credential has no value for it. The session string, api id and
/// api hash are required in the result; anything still missing fails with
/// [`Error::NotConfigured`] naming the absent keys.
pub fn resolve(
    existing: Option<&Credential>,
    incoming: &CredentialUpdate,
    force: bool,
) -> Result<Credential> {
    fn pick<T: Clone>(existing: Option<T>, incoming: Option<T>, force: bool) -> Option<T> {
        if force {
            incoming.or(existing)
        } else {
            existing.or(incoming)
        }
    }

    let session = pick(
        existing.map(|c| c.session.expose_secret().clone()),
        incoming.session.clone(),
        force,
    );
    let api_id = pick(existing.map(|c| c.api_id), incoming.api_id, force);
    let api_hash = pick(
        existing.map(|c| c.api_hash.expose_secret().clone()),
        incoming.api_hash.clone(),
        force,
    );
    let phone = pick(
        existing.and_then(|c| c.phone.clone()),
        incoming.phone.clone(),
        force,
    );
    let password = pick(
        existing.and_then(|c| c.password.as_ref().map(|p| p.expose_secret().clone())),
        incoming.password.clone(),
        force,
    );

    let mut missing = Vec::new();
    if session.as_deref().is_none_or(str::is_empty) {
        missing.push(ENV_SESSION_KEY);
    }
    if api_id.is_none() {
        missing.push(ENV_API_ID_KEY);
    }
    if api_hash.as_deref().is_none_or(str::is_empty) {
        missing.push(ENV_API_HASH_KEY);
    }
    if !missing.is_empty() {
        return Err(Error::not_configured(missing));
    }

    // The three required fields were just checked.
    let (Some(session), Some(api_id), Some(api_hash)) = (session, api_id, api_hash) else {
        return Err(Error::not_configured([ENV_SESSION_KEY]));
    };

    Ok(Credential {
        session: Secret::new(session),
        api_id,
        api_hash: Secret::new(api_hash),
        phone,
        password: password.map(Secret::new),
    })
}
