//! addiscare: terminal client for AddisCare notifications.
//!
//! Runs one notification session against the REST backend and acts as a
//! presentation surface over it: a live unread badge (`watch`), the list, and
//! the same read/delete/hide actions the web header and page offer, plus the
//! admin send and broadcast forms.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use addiscare_client::{ClientConfig, NotificationClient};
use addiscare_core::{
    BulkSendRequest, Error, Notification, NotificationEvent, Role, SendNotificationRequest,
};
use addiscare_notify::{
    ConfirmDelete, Filter, MutationOutcome, NotificationComposer, NotificationSession,
    NotifyConfig,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "addiscare")]
#[command(author, version, about = "AddisCare notifications from the terminal")]
#[command(propagate_version = true)]
struct Cli {
    /// Backend base URL (e.g. http://localhost:5000/api)
    #[arg(long, global = true, env = "ADDISCARE_API_URL")]
    api_url: Option<String>,

    /// Session bearer token
    #[arg(long, global = true, env = "ADDISCARE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Polling interval for `watch`, in milliseconds
    #[arg(long, global = true, env = "NOTIFY_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the unread badge live until Ctrl-C
    Watch,

    /// List recent notifications
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark one notification read
    Read {
        /// Notification id
        id: String,
    },

    /// Mark every notification read
    ReadAll,

    /// Permanently delete a notification
    Delete {
        /// Notification id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Hide a notification for yourself only
    Hide {
        /// Notification id
        id: String,
    },

    /// Send a notification to one user (admin)
    Send {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        message: String,

        /// Recipient user id
        #[arg(short, long)]
        recipient: String,

        /// Related hazard report id
        #[arg(long)]
        report: Option<String>,
    },

    /// Broadcast to every user with a role (admin)
    Broadcast {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        message: String,

        /// reporter, government, admin or all
        #[arg(short, long)]
        role: Role,

        /// Related hazard report id
        #[arg(long)]
        report: Option<String>,
    },
}

/// Asks on the terminal before a permanent delete.
struct PromptConfirm;

impl ConfirmDelete for PromptConfirm {
    fn confirm_delete(&self, notification_id: &str, notification: Option<&Notification>) -> bool {
        let target = notification
            .map(|n| format!("\"{}\"", n.title))
            .unwrap_or_else(|| notification_id.to_string());
        print!("Permanently delete notification {}? [y/N] ", target);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Deletes without asking (`--yes`).
struct AssumeYes;

impl ConfirmDelete for AssumeYes {
    fn confirm_delete(&self, _: &str, _: Option<&Notification>) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _file_guard = init_logging();
    run(cli).await
}

/// Install the tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, daily rotation)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "addiscare=info")
///
/// Console logs go to stderr so command output stays clean.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "addiscare=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("addiscare.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn client_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token.clone());
    }
    config
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = client_config(&cli);
    info!(base_url = %config.base_url, "Using notification backend");
    let client = Arc::new(
        NotificationClient::new(config).context("Failed to create notification client")?,
    );

    let mut notify = NotifyConfig::from_env();
    if let Some(ms) = cli.poll_interval_ms {
        notify = notify.with_poll_interval(ms);
    }

    match cli.command {
        Commands::Watch => cmd_watch(client, notify).await,
        Commands::Send {
            title,
            message,
            recipient,
            report,
        } => {
            let created = NotificationComposer::new(client)
                .send(SendNotificationRequest {
                    title,
                    message,
                    recipient_id: recipient,
                    report_id: report,
                })
                .await
                .map_err(describe)
                .context("Send failed")?;
            println!("Sent notification {}", created.id);
            Ok(())
        }
        Commands::Broadcast {
            title,
            message,
            role,
            report,
        } => {
            let outcome = NotificationComposer::new(client)
                .broadcast(BulkSendRequest {
                    title,
                    message,
                    role,
                    report_id: report,
                })
                .await
                .map_err(describe)
                .context("Broadcast failed")?;
            println!("Broadcast to {} sent to {} users", role, outcome.count);
            Ok(())
        }
        command => {
            // One-shot commands: no background polling, one sync up front.
            let session = NotificationSession::start(client, notify.with_enabled(false))
                .context("Failed to start notification session")?;
            session
                .refresh()
                .await
                .map_err(describe)
                .context("Failed to load notifications")?;
            let result = run_action(&session, command).await;
            session.logout().await;
            result
        }
    }
}

async fn run_action(session: &NotificationSession, command: Commands) -> anyhow::Result<()> {
    let page = session.notifications_page();
    let outcome = match command {
        Commands::List { unread } => {
            let mut page = page;
            if unread {
                page.set_filter(Filter::Unread);
            }
            print_list(session, &page.items());
            return Ok(());
        }
        Commands::Read { id } => page.mark_read(&id).await?,
        Commands::ReadAll => page.mark_all_read().await?,
        Commands::Delete { id, yes } => {
            if yes {
                page.delete(&id, &AssumeYes).await?
            } else {
                page.delete(&id, &PromptConfirm).await?
            }
        }
        Commands::Hide { id } => page.hide(&id).await?,
        Commands::Watch | Commands::Send { .. } | Commands::Broadcast { .. } => {
            bail!("not a session action")
        }
    };
    report(outcome)
}

fn report(outcome: MutationOutcome) -> anyhow::Result<()> {
    match outcome {
        MutationOutcome::Confirmed => println!("Done."),
        MutationOutcome::AlreadyResolved => println!("Already done."),
        MutationOutcome::Skipped => println!("Nothing to do."),
        MutationOutcome::RolledBack { error } => {
            return Err(describe(error)).context("The server refused the change");
        }
    }
    Ok(())
}

fn print_list(session: &NotificationSession, items: &[Notification]) {
    let snap = session.store().snapshot();
    println!("{} unread", snap.unread_count);
    for n in items {
        let marker = if n.read { ' ' } else { '*' };
        println!(
            "{} {:<26} {:<8} {}  ({})",
            marker,
            n.id,
            n.kind.to_string(),
            n.title,
            n.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

async fn cmd_watch(client: Arc<NotificationClient>, config: NotifyConfig) -> anyhow::Result<()> {
    let session =
        NotificationSession::start(client, config).context("Failed to start notification session")?;
    let badge = session.header_badge();
    let _badge_sub = badge.on_change(|label| {
        println!("unread: {}", label.as_deref().unwrap_or("0"));
    });
    let mut events = session.events().subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                break signal.context("Failed to listen for Ctrl-C");
            }
            event = events.recv() => match event {
                Ok(envelope) if envelope.payload.is_user_visible() => {
                    eprintln!("! {}", toast_text(&envelope.payload));
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    session.logout().await;
    result
}

fn toast_text(event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::SessionExpired => "Session expired, please sign in again".to_string(),
        NotificationEvent::MutationRolledBack {
            mutation, error, ..
        } => format!("Could not {}: {}", mutation, error),
        other => other.event_type().to_string(),
    }
}

/// Flatten field-level validation messages into the error text.
fn describe(error: Error) -> anyhow::Error {
    match error {
        Error::Validation { message, fields } if !fields.is_empty() => {
            let details: Vec<String> = fields
                .iter()
                .map(|f| format!("{}: {}", f.field, f.message))
                .collect();
            anyhow::anyhow!("{} ({})", message, details.join("; "))
        }
        other => other.into(),
    }
}
