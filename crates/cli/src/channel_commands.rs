//! `statgram channels` — manage the tracked channel set.

use {anyhow::Result, clap::Subcommand};

use {
    statgram_client::ChannelHandle,
    statgram_store::{ChannelSet, SqliteStatsStore},
};

#[derive(Subcommand)]
pub enum ChannelAction {
    /// Track a channel (username, @username, t.me URL or numeric id).
    Add { handle: String },
    /// Stop tracking a channel.
    Remove { handle: String },
    /// List tracked channels.
    List,
}

pub async fn handle_channels(action: &ChannelAction, database_url: &str) -> Result<()> {
    let store = SqliteStatsStore::connect(database_url).await?;
    match action {
        ChannelAction::Add { handle } => {
            let handle = ChannelHandle::parse(handle);
            store.add(&handle).await?;
            println!("Tracking {handle}");
        },
        ChannelAction::Remove { handle } => {
            let handle = ChannelHandle::parse(handle);
            store.remove(&handle).await?;
            println!("No longer tracking {handle}");
        },
        ChannelAction::List => {
            let tracked = store.tracked().await?;
            if tracked.is_empty() {
                println!("No tracked channels.");
            } else {
                for handle in tracked {
                    println!("{handle}");
                }
            }
        },
    }
    Ok(())
}
