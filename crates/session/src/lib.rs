//! Telegram session credential lifecycle.
//! Credentials live in an env-style file and are loaded once per process;
//! only an explicit refresh replaces them.

pub mod credential;
pub mod error;
pub mod flow;
pub mod store;

pub use {
    credential::{Credential, CredentialUpdate, resolve},
    error::{Error, Result},
    flow::{LoginFlow, NonInteractive},
    store::SessionStore,
};

/// Env-file key for the serialized session string.
pub const ENV_SESSION_KEY: &str = "TELEGRAM_SESSION_STRING";
/// Env-file key for the API application id.
pub const ENV_API_ID_KEY: &str = "TELEGRAM_API_ID";
/// Env-file key for the API application hash.
pub const ENV_API_HASH_KEY: &str = "TELEGRAM_API_HASH";
/// Env-file key for the account phone number.
pub const ENV_PHONE_KEY: &str = "TELEGRAM_PHONE";
/// Env-file key for the optional 2FA password.
pub const ENV_PASSWORD_KEY: &str = "TELEGRAM_PASSWORD";
