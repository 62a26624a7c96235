//! Iadess CLI - line-oriented front-end for the forge studio.
//!
//! ```text
//! main() -> load config -> GeminiGateway -> Studio -> REPL
//!                                             |
//!                                             v
//!                              Command::parse(line) -> run() -> print log lines
//! ```
//!
//! Forge log lines arrive on the studio's broadcast channel and are printed
//! after each command.

mod command;

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use iadess_config::IadessConfig;
use iadess_core::{
    ArtifactRepository, ChatRejection, ForgeLogEntry, ForgeSnapshot, LogLevel, Studio,
    TokenLedger, assert_artifact_integrity,
};
use iadess_providers::{GeminiGateway, GenerationGateway};
use iadess_types::ArtifactId;

use command::{Command, HELP, ParseError};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than interleave with the REPL.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.iadess/logs/iadess.log
    if let Some(config_path) = IadessConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("iadess.log"));
    }

    // Fallback: ./.iadess/logs/iadess.log
    candidates.push(PathBuf::from(".iadess").join("logs").join("iadess.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = IadessConfig::load()
        .context("failed to load configuration")?
        .unwrap_or_default();

    let params = config.forge_params();
    params.validate().context("invalid [forge] configuration")?;
    let realm = config
        .default_realm()
        .context("invalid [app] default_realm")?;
    let api_key = config
        .resolve_api_key()
        .context("no Gemini API key: set [api_keys] google, GEMINI_API_KEY or API_KEY")?;
    let gateway = GeminiGateway::new(config.gemini_config(api_key))
        .context("failed to build Gemini gateway")?;

    let ledger = TokenLedger::new(config.ledger_params());
    let mut studio =
        Studio::new(gateway, ledger, params, realm).with_chat_params(config.chat_params());
    if let Some(path) = config.artifacts_path() {
        studio = studio.with_repository(ArtifactRepository::new(path));
    }

    println!("IADESS forge online. {}", studio.balance());
    println!("Type `help` for commands.");
    repl(&studio).await
}

async fn repl<G: GenerationGateway>(studio: &Studio<G>) -> Result<()> {
    let mut events = studio.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut intent: Option<String> = None;

    loop {
        print!("iadess [{}]> ", studio.snapshot().realm);
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => run(studio, command, &mut intent).await,
            Err(ParseError::Empty) => continue,
            Err(e) => println!("{e}"),
        }
        print_events(&mut events);
    }

    Ok(())
}

async fn run<G: GenerationGateway>(
    studio: &Studio<G>,
    command: Command,
    intent: &mut Option<String>,
) {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
        Command::Status => print_status(&studio.snapshot()),
        Command::Balance => {
            println!("{}", studio.balance());
            if studio.chat_low_resource() {
                println!("LOW_RESOURCE: upstream quota exhausted on last chat.");
            }
            print_low_balance(studio);
        }
        Command::Realm(realm) => {
            if studio.set_realm(realm).is_ok()
                && let Some(text) = intent.as_deref()
                && let Some(cost) = studio.estimate_cost(text)
            {
                println!("Strike cost now {cost} IQ-T.");
            }
        }
        Command::Intent(text) => {
            if let Some(cost) = studio.estimate_cost(&text) {
                println!("Intent set. Strike cost: {cost} IQ-T.");
            }
            *intent = Some(text);
        }
        Command::Heat => {
            let _ = studio.apply_heat();
        }
        Command::Strike(text) => {
            if let Some(text) = text {
                *intent = Some(text);
            }
            let Some(text) = intent.as_deref() else {
                println!("No intent set. Use `intent <text>` or `strike <text>`.");
                return;
            };
            if let Err(e) = studio.strike(text).await {
                tracing::debug!("Strike ended with {e}");
            }
        }
        Command::Infinity => {
            if let Err(e) = studio.toggle_infinity().await {
                tracing::debug!("Infinity toggle ended with {e}");
            }
        }
        Command::Quench => match studio.quench().await {
            Ok(artifact) => {
                println!(
                    "{} [{}] integrity {} cost {} IQ-T",
                    artifact.name,
                    artifact.status,
                    artifact.integrity_score,
                    artifact.intelligence_cost
                );
                println!("{}", artifact.code_shard);
            }
            Err(e) => tracing::debug!("Quench ended with {e}"),
        },
        Command::List => print_artifacts(studio),
        Command::Select(key) => {
            let id = resolve_artifact(studio, &key);
            if studio.select(&id) {
                println!("Selected {id}.");
            } else {
                println!("No artifact `{key}`.");
            }
        }
        Command::Simulate => simulate(studio),
        Command::Chat(text) => chat(studio, &text).await,
        Command::Speak(text) => match studio.speak(&text).await {
            Some(clip) => println!(
                "Synthesized {:.1}s of speech at {} Hz.",
                clip.duration_secs(),
                clip.sample_rate
            ),
            None => println!("Speech synthesis unavailable."),
        },
        Command::Voice(name) => {
            if studio.set_voice(&name) {
                println!("Voice set to {name}.");
            } else {
                println!("Unknown voice `{name}` (Puck, Kore).");
            }
        }
    }
}

fn resolve_artifact<G: GenerationGateway>(studio: &Studio<G>, key: &str) -> ArtifactId {
    key.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| studio.artifacts().get(index).map(|a| a.id.clone()))
        .unwrap_or_else(|| ArtifactId::new(key))
}

fn simulate<G: GenerationGateway>(studio: &Studio<G>) {
    let Some(artifact) = studio.selected() else {
        println!("No artifact selected.");
        return;
    };
    if let Err(e) = assert_artifact_integrity(&artifact) {
        println!("{e}");
        return;
    }
    if let Some(report) = studio.simulate_selected() {
        for line in &report.logs {
            println!("  {line}");
        }
        let verdict = if report.success { "PASS" } else { "FAIL" };
        println!("{verdict} performance {}", report.performance_score);
    }
}

async fn chat<G: GenerationGateway>(studio: &Studio<G>, text: &str) {
    match studio.send_chat(text).await {
        Ok(reply) => {
            println!("IADESS: {}", reply.text);
            for reference in &reply.grounding {
                println!("  [{}] {}", reference.title, reference.uri);
            }
        }
        Err(ChatRejection::InsufficientTokens { .. }) => {
            if let Some(last) = studio.chat_messages().last() {
                println!("IADESS: {}", last.text);
            }
        }
        Err(e) => println!("{e}"),
    }
    print_low_balance(studio);
}

fn print_low_balance<G: GenerationGateway>(studio: &Studio<G>) {
    if studio.chat_low_balance() {
        println!("LOW_BALANCE: IQ-T reserves running low ({}).", studio.balance());
    }
}

fn print_status(snapshot: &ForgeSnapshot) {
    println!(
        "REALM {} ({})  PHASE {:?}",
        snapshot.realm,
        snapshot.realm.display_name(),
        snapshot.phase
    );
    println!(
        "HEAT {}°C{}  STRIKES {}  INTEGRITY {}  INFINITY {}",
        snapshot.heat,
        if snapshot.is_prepared { " [prepared]" } else { "" },
        snapshot.strike_count,
        snapshot.integrity,
        if snapshot.infinity_mode { "on" } else { "off" }
    );
    if let Some(name) = &snapshot.draft_name {
        println!(
            "DRAFT {name} ({} chars) tags {:?}",
            snapshot.draft_code.chars().count(),
            snapshot.last_tags
        );
    }
    for line in &snapshot.log_buffer {
        println!("  {line}");
    }
}

fn print_artifacts<G: GenerationGateway>(studio: &Studio<G>) {
    let artifacts = studio.artifacts();
    if artifacts.is_empty() {
        println!("No artifacts yet.");
        return;
    }
    let selected = studio.selected().map(|a| a.id);
    for (i, artifact) in artifacts.iter().enumerate() {
        let marker = if selected.as_ref() == Some(&artifact.id) { '*' } else { ' ' };
        println!(
            "{marker}{:>3}. {} [{}] {} {}",
            i + 1,
            artifact.name,
            artifact.status,
            artifact.integrity_score,
            artifact.id
        );
    }
}

fn print_events(events: &mut broadcast::Receiver<ForgeLogEntry>) {
    loop {
        match events.try_recv() {
            Ok(entry) => {
                let tag = match entry.level {
                    LogLevel::Info => "INFO",
                    LogLevel::Success => " OK ",
                    LogLevel::Warning => "WARN",
                    LogLevel::Error => "FAIL",
                };
                println!("[{tag}] {} {}", entry.timestamp.format("%H:%M:%S"), entry.message);
            }
            Err(TryRecvError::Lagged(skipped)) => println!("[....] {skipped} log lines dropped"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
