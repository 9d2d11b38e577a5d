#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use pair_core::SessionId;
use pair_relay::RelayConfig;
use pair_settings::PairSettings;
use pair_telemetry::{init_telemetry, TelemetryConfig};

mod commands;
mod live;
mod status;

use status::StatusBoard;

#[derive(Debug, Parser)]
#[command(name = "pairlink", about = "Pair personality quiz over a peer-to-peer session")]
struct Cli {
    /// Settings file (defaults to ~/.pairlink/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level, overriding settings.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the rendezvous relay until Ctrl-C.
    Relay {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
    },
    /// Print an encoded invite.
    Invite(InviteArgs),
    /// Print the base questions in presentation order, or follow-ups for
    /// answers already given.
    Questions {
        /// Answers file to pick follow-up questions for.
        #[arg(long)]
        followups_for: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    /// Score one answers file.
    Score { answers: PathBuf },
    /// Combine two answers files (initiator first).
    Pair { a: PathBuf, b: PathBuf },
    /// Render an encoded pair result.
    Result { encoded: String },
    /// Run a live pair session over the relay.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },
}

#[derive(Debug, Subcommand)]
enum SessionCommand {
    /// Start a session and wait for a partner.
    Host {
        #[command(flatten)]
        invite: InviteArgs,
        #[arg(long)]
        answers: PathBuf,
    },
    /// Join a session by id or encoded invite.
    Join {
        #[arg(long, required_unless_present = "invite")]
        sid: Option<String>,
        #[arg(long)]
        invite: Option<String>,
        #[arg(long)]
        answers: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct InviteArgs {
    /// Session id; generated when omitted.
    #[arg(long)]
    pub sid: Option<String>,
    #[arg(long)]
    pub key_question: Option<u32>,
    #[arg(long)]
    pub key_answer: Option<u8>,
    #[arg(long)]
    pub type_hint: Option<u8>,
    /// Free-text bonus question for the partner.
    #[arg(long)]
    pub bonus: Option<String>,
    #[arg(long)]
    pub bonus_label: Option<String>,
    #[arg(long)]
    pub bonus_min: Option<String>,
    #[arg(long)]
    pub bonus_max: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    let _telemetry = init_telemetry(TelemetryConfig::from_level_name(
        level,
        cli.json_logs || settings.logging.json,
    ));

    let board = StatusBoard::new(settings.status.banner_ttl());

    match cli.command {
        Command::Relay { port, host } => run_relay(&settings, host, port).await,
        Command::Invite(args) => {
            println!("{}", commands::encode_invite(&commands::build_invite(&args)?)?);
            Ok(())
        }
        Command::Questions { followups_for, count } => commands::questions(followups_for.as_deref(), count),
        Command::Score { answers } => commands::score(&answers),
        Command::Pair { a, b } => commands::pair(&a, &b),
        Command::Result { encoded } => commands::result(&encoded),
        Command::Session { action } => match action {
            SessionCommand::Host { invite, answers } => {
                let invite = commands::build_invite(&invite)?;
                let answers = commands::read_answers(&answers)?;
                live::host(&settings, &board, invite, answers).await
            }
            SessionCommand::Join { sid, invite, answers } => {
                let invite = match (invite, sid) {
                    (Some(encoded), _) => commands::decode_invite(&encoded)?,
                    (None, Some(sid)) => pair_core::InvitePayload::new(SessionId::from_raw(sid)),
                    (None, None) => anyhow::bail!("either --sid or --invite is required"),
                };
                let answers = commands::read_answers(&answers)?;
                live::join(&settings, &board, invite, answers).await
            }
        },
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<PairSettings> {
    match path {
        Some(path) => pair_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => pair_settings::load_settings().context("failed to load settings"),
    }
}

async fn run_relay(settings: &PairSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = RelayConfig {
        bind_host: host.unwrap_or_else(|| settings.relay.bind_host.clone()),
        port: port.unwrap_or(settings.relay.port),
        max_send_queue: settings.relay.max_send_queue,
    };
    let handle = pair_relay::start(config).await.context("failed to start relay")?;
    tracing::info!(port = handle.port, "relay ready");

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl+c")?;
    tracing::info!(peers = handle.registry.count(), "shutting down");
    handle.shutdown();
    Ok(())
}
