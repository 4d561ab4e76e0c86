// MIT License - Copyright (c) 2026 Peter Wright
// it100-monitor: print panel events as JSON lines, send commands from stdin

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use it100_bridge::{
    CloseReason, It100Client, It100Config, It100Error, OutboundCommand, SessionEvent,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "it100-monitor")]
#[command(about = "Watch a DSC panel through an IT-100 or compatible network bridge")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "it100.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    it100: It100Toml,
}

#[derive(Debug, Deserialize)]
struct It100Toml {
    #[serde(default = "default_address")]
    address: String,
    #[serde(default = "default_connect_timeout")]
    connect_timeout_ms: u64,
    #[serde(default = "default_keep_alive_interval")]
    keep_alive_interval_secs: u64,
    #[serde(default = "default_keep_alive_multiple")]
    keep_alive_multiple: u32,
    /// Omit to disable periodic status requests.
    #[serde(default)]
    status_poll_interval_secs: Option<u64>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
    #[serde(default = "default_reconnect_delay")]
    reconnect_delay_ms: u64,
}

fn default_address() -> String {
    "127.0.0.1:4025".to_string()
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_keep_alive_interval() -> u64 {
    30
}
fn default_keep_alive_multiple() -> u32 {
    3
}
fn default_event_capacity() -> usize {
    256
}
fn default_reconnect_delay() -> u64 {
    5_000
}

fn build_it100_config(toml: &It100Toml) -> Result<It100Config> {
    if toml.address.trim().is_empty() {
        bail!("it100.address must not be empty");
    }
    if toml.keep_alive_interval_secs == 0 {
        bail!("it100.keep_alive_interval_secs must be at least 1");
    }

    let mut builder = It100Config::builder()
        .address(toml.address.trim())
        .connect_timeout(Duration::from_millis(toml.connect_timeout_ms))
        .keep_alive_interval(Duration::from_secs(toml.keep_alive_interval_secs))
        .keep_alive_multiple(toml.keep_alive_multiple)
        .status_poll_interval(
            toml.status_poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        )
        .event_capacity(toml.event_capacity);
    if let Some(password) = toml.password.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.password(password);
    }
    Ok(builder.build())
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&text).context("Failed to parse config file")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonEvent<'a> {
    now: u64,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn event_json(event: &SessionEvent) -> JsonEvent<'_> {
    let mut json = JsonEvent {
        now: now_epoch_ms(),
        kind: "",
        code: None,
        name: None,
        data: None,
        reason: None,
    };
    match event {
        SessionEvent::Command(cmd) => {
            json.kind = if cmd.is_unknown() { "unknown" } else { "command" };
            json.code = Some(cmd.code.as_str());
            json.name = cmd.name;
            json.data = Some(cmd.data.as_str());
        }
        SessionEvent::ParseFailure(cmd) => {
            json.kind = "parse_failure";
            json.code = Some(cmd.code.as_str());
            json.name = cmd.name;
            json.data = Some(cmd.data.as_str());
            json.reason = cmd.parse_failure().map(|f| f.reason.clone());
        }
        SessionEvent::Malformed(frame) => {
            json.kind = "malformed";
            json.reason = Some(frame.to_string());
        }
        SessionEvent::Closed(reason) => {
            json.kind = "closed";
            json.reason = Some(reason.to_string());
        }
    }
    json
}

fn print_event(event: &SessionEvent) {
    match serde_json::to_string(&event_json(event)) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to serialize event: {e}"),
    }
}

/// `CODE[DATA]`, e.g. `001` or `0301`.
fn parse_command_line(line: &str) -> Result<OutboundCommand> {
    let line = line.trim();
    if line.len() < 3 || !line.is_ascii() {
        bail!("expected CODE[DATA] in ASCII, got {line:?}");
    }
    let (code, data) = line.split_at(3);
    Ok(OutboundCommand::raw(code, data))
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<OutboundCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command_line(&line) {
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring input: {e}"),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

enum Exit {
    Shutdown,
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=it100_bridge=trace).
    // Default: info. Logs go to stderr; stdout carries the JSON events.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let mut reconnect_delay_ms = config.it100.reconnect_delay_ms;
    let mut it100_config = build_it100_config(&config.it100)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut commands = spawn_stdin_reader();

    loop {
        let client = It100Client::new(it100_config.clone());
        info!("Monitor running. Send SIGHUP to reload config, SIGINT/SIGTERM to stop.");

        let exit = run_client(
            &client,
            reconnect_delay_ms,
            &mut commands,
            &mut sigterm,
            &mut sighup,
        )
        .await?;

        match client.disconnect().await {
            Ok(()) | Err(It100Error::SessionFailed(_)) => {}
            Err(e) => warn!("Error disconnecting: {e}"),
        }

        match exit {
            Exit::Shutdown => break,
            Exit::Reload => {
                // Keep the previous config on failure
                info!("Reloading config from {}", cli.config);
                match load_config(&cli.config)
                    .and_then(|c| build_it100_config(&c.it100).map(|b| (c, b)))
                {
                    Ok((new_config, new_it100_config)) => {
                        reconnect_delay_ms = new_config.it100.reconnect_delay_ms;
                        it100_config = new_it100_config;
                        info!("Config reloaded successfully");
                    }
                    Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
                }
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Connect, print events and forward stdin until a signal arrives.
/// Reconnects with exponential backoff after every failure.
async fn run_client(
    client: &It100Client,
    reconnect_delay_ms: u64,
    commands: &mut mpsc::UnboundedReceiver<OutboundCommand>,
    sigterm: &mut tokio::signal::unix::Signal,
    sighup: &mut tokio::signal::unix::Signal,
) -> Result<Exit> {
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay_ms = reconnect_delay_ms * (1u64 << (attempt - 1).min(4));
            info!("Retrying in {:.1}s...", delay_ms as f64 / 1000.0);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                _ = tokio::signal::ctrl_c() => return Ok(Exit::Shutdown),
                _ = sigterm.recv() => return Ok(Exit::Shutdown),
                _ = sighup.recv() => return Ok(Exit::Reload),
            }
        }
        attempt += 1;

        match client.connect().await {
            Ok(()) => {}
            Err(e) if e.is_retryable() => {
                error!("Connection attempt {attempt} failed: {e}");
                continue;
            }
            Err(e) => {
                return Err(e).context(format!("Failed to connect to {}", client.config().address));
            }
        }
        let mut events = client.subscribe().context("Failed to subscribe to session events")?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down...");
                    return Ok(Exit::Shutdown);
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    return Ok(Exit::Shutdown);
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading config and reconnecting...");
                    return Ok(Exit::Reload);
                }
                Some(cmd) = commands.recv() => {
                    info!("Sending {cmd}");
                    if let Err(e) = client.send(cmd) {
                        warn!("Command rejected: {e}");
                    }
                }
                event = events.recv() => match event {
                    Some(event) => {
                        print_event(&event);
                        if let SessionEvent::Closed(reason) = &event {
                            if let CloseReason::Failed(cause) = reason {
                                warn!("Session failed ({cause}), will reconnect");
                            }
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        // A live session resets the backoff.
        attempt = 1;
    }
}
