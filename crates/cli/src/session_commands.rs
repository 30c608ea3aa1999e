//! `statgram session` — bootstrap and inspect the stored credential.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use {anyhow::Result, clap::Subcommand};

use statgram_session::{
    CredentialUpdate, ENV_API_HASH_KEY, ENV_API_ID_KEY, ENV_PASSWORD_KEY, ENV_PHONE_KEY,
    ENV_SESSION_KEY, SessionStore, resolve,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Resolve and persist the Telegram session credential.
    ///
    /// Values given here win over the env file only after confirmation, or
    /// unconditionally with --force. The session string comes from the
    /// gateway's one-time login flow.
    Set {
        /// Overwrite stored values without asking.
        #[arg(long)]
        force: bool,
        /// Serialized session string to store.
        #[arg(long)]
        string_session: Option<String>,
        /// API application id.
        #[arg(long)]
        api_id: Option<i32>,
        /// API application hash.
        #[arg(long)]
        api_hash: Option<String>,
        /// Account phone number.
        #[arg(long)]
        phone: Option<String>,
        /// Optional 2FA password.
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the stored credential with secrets redacted.
    Show,
}

pub async fn handle_session(action: &SessionAction, env_path: &Path) -> Result<()> {
    match action {
        SessionAction::Set {
            force,
            string_session,
            api_id,
            api_hash,
            phone,
            password,
        } => {
            set(
                env_path,
                *force,
                CredentialUpdate {
                    session: string_session.clone(),
                    api_id: *api_id,
                    api_hash: api_hash.clone(),
                    phone: phone.clone(),
                    password: password.clone(),
                },
            )
            .await
        },
        SessionAction::Show => show(env_path).await,
    }
}

async fn set(env_path: &Path, force: bool, mut update: CredentialUpdate) -> Result<()> {
    let store = SessionStore::new(env_path);
    let existing = store.load().await.ok();

    // Without --force, every collision between a flag and a stored value is
    // confirmed on the terminal; declined values are dropped so the stored
    // ones survive the resolve below.
    if let Some(existing) = &existing
        && !force
    {
        if update.session.is_some() && !confirm(&replace_question(ENV_SESSION_KEY))? {
            update.session = None;
        }
        if update.api_id.is_some() && !confirm(&replace_question(ENV_API_ID_KEY))? {
            update.api_id = None;
        }
        if update.api_hash.is_some() && !confirm(&replace_question(ENV_API_HASH_KEY))? {
            update.api_hash = None;
        }
        if update.phone.is_some()
            && existing.phone.is_some()
            && !confirm(&replace_question(ENV_PHONE_KEY))?
        {
            update.phone = None;
        }
        if update.password.is_some()
            && existing.password.is_some()
            && !confirm(&replace_question(ENV_PASSWORD_KEY))?
        {
            update.password = None;
        }
    }

    // Surviving input always wins; the interactive pass above already
    // settled the conflicts.
    let credential = resolve(existing.as_ref(), &update, true)?;
    store.save(&credential).await?;
    println!("Session credential saved to {}", env_path.display());
    Ok(())
}

async fn show(env_path: &Path) -> Result<()> {
    let store = SessionStore::new(env_path);
    let credential = store.load().await?;
    println!("Session file: {}", env_path.display());
    println!("  {ENV_SESSION_KEY}: [set]");
    println!("  {ENV_API_ID_KEY}: {}", credential.api_id);
    println!("  {ENV_API_HASH_KEY}: [set]");
    println!(
        "  {ENV_PHONE_KEY}: {}",
        credential.phone.as_deref().unwrap_or("-")
    );
    println!(
        "  {ENV_PASSWORD_KEY}: {}",
        if credential.password.is_some() {
            "[set]"
        } else {
            "-"
        }
    );
    Ok(())
}

fn replace_question(key: &str) -> String {
    format!("{key} is already set. Replace it? [y/N] ")
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}
