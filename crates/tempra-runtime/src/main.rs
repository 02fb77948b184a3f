//! tempra - covert stopwatch forces
//!
//! - `serve`: run the directive queue server
//! - `token`: create a token on a server
//! - `push`: send a force directive
//! - `preview`: resolve a directive against a given time, offline
//! - `spectate`: headless spectator display driven from stdin

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tempra_core::{
    Condition, ConditionKind, ElapsedMs, ForceDirective, TempraError, TempraResult, Token,
};
use tempra_force::{preview, Resolver};
use tempra_queue::{DirectiveStore, MemoryStore};
use tempra_runtime::server::{AppState, Server};
use tempra_runtime::{telemetry, HttpClient, Spectator, SpectatorLoop, TempraConfig, UserAction};
use tempra_timer::MonotonicClock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "tempra")]
#[command(
    about = "Covert stopwatch forces: queue server, performer and spectator",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TEMPRA_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "TEMPRA_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the queue server
    Serve {
        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Create a token
    Token {
        #[arg(long)]
        server: Option<String>,
    },
    /// Send a force directive
    Push {
        #[arg(long)]
        server: Option<String>,
        #[arg(short, long)]
        token: String,
        #[command(flatten)]
        directive: DirectiveArgs,
    },
    /// Resolve a directive against an elapsed time without sending it
    Preview {
        /// Elapsed time as MM:SS,CC or milliseconds
        #[arg(short, long)]
        elapsed: ElapsedMs,
        #[command(flatten)]
        directive: DirectiveArgs,
    },
    /// Headless spectator: s = start/stop, l = lap, r = reset, c = clear counters, q = quit
    Spectate {
        #[arg(long)]
        server: Option<String>,
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[derive(Args)]
struct DirectiveArgs {
    /// Raw directive JSON (flat or wrapped in `force`)
    #[arg(long = "force", conflicts_with_all = ["mode", "preset"])]
    force_json: Option<String>,

    /// ms | ft | s | control
    #[arg(short, long)]
    mode: Option<String>,

    /// Mode payload
    #[arg(long)]
    target: Option<String>,

    /// stop | lap | egal
    #[arg(long)]
    trigger: Option<String>,

    /// Condition as kind=value, e.g. stops=2
    #[arg(long)]
    condition: Option<String>,

    /// Named preset
    #[arg(long, conflicts_with = "mode")]
    preset: Option<String>,
}

impl DirectiveArgs {
    fn to_directive(&self) -> TempraResult<ForceDirective> {
        if let Some(raw) = &self.force_json {
            let value: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| TempraError::InvalidDirective(e.to_string()))?;
            return ForceDirective::from_push_body(value);
        }

        let mut body = serde_json::Map::new();
        if let Some(name) = &self.preset {
            body.insert("mode".into(), "preset".into());
            body.insert("name".into(), name.clone().into());
        } else if let Some(mode) = &self.mode {
            body.insert("mode".into(), mode.clone().into());
        }
        if let Some(target) = &self.target {
            let value = match target.parse::<i64>() {
                // ft targets keep their leading zeros
                Ok(n) if !target.starts_with('0') || target == "0" => n.into(),
                _ => target.clone().into(),
            };
            body.insert("target".into(), value);
        }
        if let Some(trigger) = &self.trigger {
            body.insert("trigger".into(), trigger.clone().into());
        }
        if let Some(raw) = &self.condition {
            let condition = parse_condition(raw)?;
            body.insert(
                "conditions".into(),
                serde_json::to_value(condition)
                    .map_err(|e| TempraError::InvalidDirective(e.to_string()))?,
            );
        }
        ForceDirective::from_push_body(serde_json::Value::Object(body))
    }
}

fn parse_condition(raw: &str) -> TempraResult<Condition> {
    let bad = || {
        TempraError::InvalidDirective(format!("condition must be kind=value, got {:?}", raw))
    };
    let (kind, value) = raw.split_once('=').ok_or_else(bad)?;
    let kind = match kind.trim().to_ascii_lowercase().as_str() {
        "seconds" => ConditionKind::Seconds,
        "stops" => ConditionKind::Stops,
        "laps" => ConditionKind::Laps,
        "resets" => ConditionKind::Resets,
        _ => return Err(bad()),
    };
    let value = value.trim().parse().map_err(|_| bad())?;
    Ok(Condition::new(kind, value))
}

#[tokio::main]
async fn main() -> TempraResult<()> {
    let cli = Cli::parse();

    let mut config = TempraConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json {
        config.logging.json = true;
    }
    telemetry::init_logging(&config.logging)?;

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.server.listen_addr = listen
                    .parse()
                    .map_err(|e| TempraError::Config(format!("invalid listen address: {}", e)))?;
            }
            let store: Arc<dyn DirectiveStore> = Arc::new(MemoryStore::new());
            let state = AppState::new(store, config.preset_book()?);
            Server::new(config.server, state).run().await
        }
        Command::Token { server } => {
            let client = HttpClient::new(server.unwrap_or(config.spectator.server_url))?;
            println!("{}", client.create_token().await?);
            Ok(())
        }
        Command::Push { server, token, directive } => {
            let client = HttpClient::new(server.unwrap_or(config.spectator.server_url))?;
            let directive = directive.to_directive()?;
            let response = client.push(&Token::new(token), &directive).await?;
            println!("queued {} ({} pending)", response.id, response.queued);
            Ok(())
        }
        Command::Preview { elapsed, directive } => {
            let directive = directive.to_directive()?;
            let resolver = Resolver::new(config.spectator.digit_sum_search);
            println!("{}", preview(elapsed, &directive, &resolver));
            Ok(())
        }
        Command::Spectate { server, token } => {
            let spectator_config = config.spectator;
            spectator_config.check();

            let token = token
                .or(spectator_config.token.clone())
                .map(Token::new)
                .ok_or_else(|| TempraError::Config("spectate needs a token".to_string()))?;
            let client = HttpClient::new(server.unwrap_or(spectator_config.server_url.clone()))?;

            let clock = Arc::new(MonotonicClock::new());
            let spectator = Spectator::from_config(token.clone(), clock, &spectator_config)?;

            let (driver, handle) = SpectatorLoop::new(
                spectator,
                Arc::new(client),
                spectator_config.poll_interval(),
            );
            let task = tokio::spawn(driver.run());
            info!(%token, "spectating");

            let mut updates = handle.subscribe();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let action = match line.trim() {
                    "s" => UserAction::StartStop,
                    "l" => UserAction::Lap,
                    "r" => UserAction::Reset,
                    "c" => UserAction::ClearCounters,
                    "q" => break,
                    "" => {
                        let snapshot = handle.snapshot();
                        println!("{}  {}", snapshot.display(), snapshot.status);
                        continue;
                    }
                    other => {
                        eprintln!("unknown command {:?}", other);
                        continue;
                    }
                };
                let _ = updates.borrow_and_update();
                if !handle.send(action).await {
                    break;
                }
                if updates.changed().await.is_err() {
                    break;
                }
                let snapshot = handle.snapshot();
                println!("{}  {}", snapshot.display(), snapshot.status);
                for lap in &snapshot.laps {
                    let duration = ElapsedMs::from_millis(lap.duration.as_millis() as u64);
                    println!("  lap {:>2}  {}", lap.number, duration);
                }
            }

            drop(updates);
            drop(handle);
            let _ = task.await;
            Ok(())
        }
    }
}
