//! Env-file backed credential storage.

use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::{
    ENV_API_HASH_KEY, ENV_API_ID_KEY, ENV_PASSWORD_KEY, ENV_PHONE_KEY, ENV_SESSION_KEY,
    credential::Credential,
    error::{Error, Result},
    flow::LoginFlow,
};

/// Owns the persisted session credential.
///
/// Reads happen through a cached copy under a read lock so concurrent fetch
/// jobs never contend; [`SessionStore::refresh`] takes the write lock for the
/// whole login-and-persist sequence, which keeps a half-replaced credential
/// from ever being observed.
pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Option<Credential>>,
}

impl SessionStore {
    /// Create a store over the given env file. Does not touch the disk until
    /// [`SessionStore::load`] or [`SessionStore::save`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the credential from the env file, cache it, and return a copy.
    ///
    /// Fails with [`Error::NotConfigured`] when the file or any required key
    /// is absent — the caller surfaces that to the operator, there is nothing
    /// to retry.
    pub async fn load(&self) -> Result<Credential> {
        let credential = read_credential(&self.path)?;
        let mut current = self.current.write().await;
        *current = Some(credential.clone());
        debug!(path = %self.path.display(), "session credential loaded");
        Ok(credential)
    }

    /// Cached credential, if [`SessionStore::load`] has succeeded before.
    pub async fn get(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Persist the credential, preserving unrelated lines in the env file.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let mut current = self.current.write().await;
        write_credential(&self.path, credential)?;
        *current = Some(credential.clone());
        info!(path = %self.path.display(), "session credential saved");
        Ok(())
    }

    /// Replace the credential by re-running the login flow, then persist.
    ///
    /// Holds the write lock for the whole exchange so no fetch job connects
    /// with the stale token mid-replacement.
    pub async fn refresh(&self, flow: &dyn LoginFlow, force: bool) -> Result<Credential> {
        let mut current = self.current.write().await;
        let fresh = flow.login(current.as_ref(), force).await?;
        write_credential(&self.path, &fresh)?;
        *current = Some(fresh.clone());
        info!(path = %self.path.display(), "session credential refreshed");
        Ok(fresh)
    }
}

fn read_credential(path: &Path) -> Result<Credential> {
    if !path.is_file() {
        return Err(Error::not_configured([
            ENV_SESSION_KEY,
            ENV_API_ID_KEY,
            ENV_API_HASH_KEY,
        ]));
    }

    let mut session = None;
    let mut api_id = None;
    let mut api_hash = None;
    let mut phone = None;
    let mut password = None;

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| Error::invalid_value(path.display().to_string(), e.to_string()))?;
    for entry in entries {
        let (key, value) =
            entry.map_err(|e| Error::invalid_value(path.display().to_string(), e.to_string()))?;
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            ENV_SESSION_KEY => session = Some(value),
            ENV_API_ID_KEY => {
                let parsed = value
                    .parse::<i32>()
                    .map_err(|e| Error::invalid_value(ENV_API_ID_KEY, e.to_string()))?;
                api_id = Some(parsed);
            },
            ENV_API_HASH_KEY => api_hash = Some(value),
            ENV_PHONE_KEY => phone = Some(value),
            ENV_PASSWORD_KEY => password = Some(value),
            _ => {},
        }
    }

    let mut missing = Vec::new();
    if session.is_none() {
        missing.push(ENV_SESSION_KEY);
    }
    if api_id.is_none() {
        missing.push(ENV_API_ID_KEY);
    }
    if api_hash.is_none() {
        missing.push(ENV_API_HASH_KEY);
    }
    if !missing.is_empty() {
        return Err(Error::not_configured(missing));
    }

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

fn write_credential(path: &Path, credential: &Credential) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    let mut pairs: Vec<(&str, String)> = vec![
        (
            ENV_SESSION_KEY,
            credential.session.expose_secret().clone(),
        ),
        (ENV_API_ID_KEY, credential.api_id.to_string()),
        (ENV_API_HASH_KEY, credential.api_hash.expose_secret().clone()),
    ];
    if let Some(phone) = &credential.phone {
        pairs.push((ENV_PHONE_KEY, phone.clone()));
    }
    if let Some(password) = &credential.password {
        pairs.push((ENV_PASSWORD_KEY, password.expose_secret().clone()));
    }

    for (key, value) in pairs {
        upsert_line(&mut lines, key, &value);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    std::fs::write(path, rendered)?;
    Ok(())
}

/// Replace the `key=` line in place, or append one.
fn upsert_line(lines: &mut Vec<String>, key: &str, value: &str) {
    let rendered = format!("{key}={value}");
    for line in lines.iter_mut() {
        if line.split('=').next().map(str::trim) == Some(key) {
            *line = rendered;
            return;
        }
    }
    lines.push(rendered);
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn credential(session: &str) -> Credential {
        Credential {
            session: Secret::new(session.into()),
            api_id: 12345,
            api_hash: Secret::new("abcdef".into()),
            phone: Some("+10000000000".into()),
            password: None,
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path().join(".env"))
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&credential("sess-1")).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.session.expose_secret(), "sess-1");
        assert_eq!(loaded.api_id, 12345);
        assert_eq!(loaded.phone.as_deref(), Some("+10000000000"));
    }

    #[tokio::test]
    async fn load_missing_file_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn load_reports_each_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TELEGRAM_API_ID=123\n").unwrap();

        let err = SessionStore::new(&path).load().await.unwrap_err();
        match err {
            Error::NotConfigured { missing } => {
                assert_eq!(missing, vec![ENV_SESSION_KEY, ENV_API_HASH_KEY]);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn save_preserves_unrelated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DATABASE_URL=sqlite://app.db\nTELEGRAM_API_ID=1\n").unwrap();

        let store = SessionStore::new(&path);
        store.save(&credential("sess-2")).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("DATABASE_URL=sqlite://app.db"));
        assert!(text.contains("TELEGRAM_API_ID=12345"));
        assert!(text.contains("TELEGRAM_SESSION_STRING=sess-2"));
        // replaced in place, not appended twice
        assert_eq!(text.matches("TELEGRAM_API_ID").count(), 1);
    }

    #[tokio::test]
    async fn get_returns_cached_copy_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.get().await.is_none());

        store.save(&credential("sess-3")).await.unwrap();
        let cached = store.get().await.unwrap();
        assert_eq!(cached.session.expose_secret(), "sess-3");
    }

    #[tokio::test]
    async fn refresh_with_non_interactive_flow_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&credential("sess-4")).await.unwrap();

        let err = store
            .refresh(&crate::NonInteractive, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LoginUnavailable));
        // the stored credential is untouched
        assert_eq!(
            store.get().await.unwrap().session.expose_secret(),
            "sess-4"
        );
    }

    #[tokio::test]
    async fn refresh_persists_the_fresh_credential() {
        struct FixedFlow;

        #[async_trait::async_trait]
        impl LoginFlow for FixedFlow {
            async fn login(
                &self,
                _existing: Option<&Credential>,
                _force: bool,
            ) -> Result<Credential> {
                Ok(credential("fresh"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&credential("stale")).await.unwrap();

        let fresh = store.refresh(&FixedFlow, true).await.unwrap();
        assert_eq!(fresh.session.expose_secret(), "fresh");
        assert_eq!(
            store.load().await.unwrap().session.expose_secret(),
            "fresh"
        );
    }
}
