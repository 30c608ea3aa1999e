mod channel_commands;
mod run_commands;
mod session_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "statgram", about = "statgram — Telegram channel statistics tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Env file holding the Telegram session credential.
    #[arg(long, global = true, env = "STATGRAM_ENV_PATH", default_value = ".env")]
    env_path: PathBuf,

    /// SQLite database URL.
    #[arg(
        long,
        global = true,
        env = "STATGRAM_DATABASE_URL",
        default_value = "sqlite://statgram.db?mode=rwc"
    )]
    database_url: String,

    /// Base URL of the MTProto session gateway.
    #[arg(
        long,
        global = true,
        env = "STATGRAM_GATEWAY_URL",
        default_value = "http://127.0.0.1:8842"
    )]
    gateway_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion batch over the tracked channels.
    Run {
        /// Ingest these handles instead of the tracked set.
        handles: Vec<String>,

        /// Recent posts kept per snapshot.
        #[arg(long)]
        post_limit: Option<usize>,

        /// Base pause between job submissions, in milliseconds.
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// Telegram session management.
    Session {
        #[command(subcommand)]
        action: session_commands::SessionAction,
    },
    /// Tracked channel management.
    Channels {
        #[command(subcommand)]
        action: channel_commands::ChannelAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        Commands::Run {
            ref handles,
            post_limit,
            pace_ms,
        } => {
            run_commands::handle_run(
                &cli.env_path,
                &cli.database_url,
                &cli.gateway_url,
                handles,
                post_limit,
                pace_ms,
            )
            .await
        },
        Commands::Session { ref action } => {
            session_commands::handle_session(action, &cli.env_path).await
        },
        Commands::Channels { ref action } => {
            channel_commands::handle_channels(action, &cli.database_url).await
        },
    }
}
