mod command_script;
mod commands;
mod config;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::info;

use command_script::CommandScriptPlayer;
use commands::{execute_command, parse_command, CommandOutput};
use config::{load_item_registry, RuntimeConfig, DEFAULT_ITEMS_PATH, DEFAULT_RUNTIME_PATH};
use session::Session;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless item transfer session", long_about = None)]
struct Args {
    /// Runtime configuration (TOML)
    #[arg(long, default_value = DEFAULT_RUNTIME_PATH)]
    config: PathBuf,
    /// Item type definitions (JSON)
    #[arg(long, default_value = DEFAULT_ITEMS_PATH)]
    items: PathBuf,
    /// Command script to play back instead of reading stdin
    #[arg(long)]
    script: Option<PathBuf>,
    /// Write a JSON state dump here on exit
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Override the scatter seed from the config
    #[arg(long)]
    seed: Option<u64>,
    /// Write the effective runtime config (TOML) here and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // WARN by default, override with RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!("Starting stowaway v{}", env!("CARGO_PKG_VERSION"));

    let mut config = RuntimeConfig::load_from_path(&args.config);
    if let Some(seed) = args.seed {
        config.transfer.seed = seed;
    }
    if let Some(path) = &args.write_config {
        return write_config(&config, path);
    }
    let registry = load_item_registry(&args.items);
    let mut session = Session::new(&config, registry);

    match &args.script {
        Some(path) => run_script(&mut session, path)?,
        None => run_stdin(&mut session)?,
    }

    if let Some(path) = &args.snapshot {
        write_snapshot(&session, path)?;
    }
    Ok(())
}

fn run_script(session: &mut Session, path: &Path) -> Result<()> {
    let mut script = CommandScriptPlayer::from_path(path)?;
    info!(script = %path.display(), "playing command script");
    while !script.is_finished() {
        for step in script.drain_ready_commands(session.tick()) {
            println!("> {}", step.line);
            print_output(execute_command(session, step.command));
        }
        session.advance_tick();
    }
    Ok(())
}

fn run_stdin(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read command from stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if matches!(trimmed, "quit" | "exit" | "/quit" | "/exit") {
            break;
        }
        run_line(session, trimmed);
        session.advance_tick();
    }
    Ok(())
}

fn run_line(session: &mut Session, line: &str) {
    println!("> {line}");
    match parse_command(line) {
        Ok(cmd) => print_output(execute_command(session, cmd)),
        Err(err) => println!("Error: {err}"),
    }
}

fn print_output(output: CommandOutput) {
    for line in output.lines {
        println!("{line}");
    }
}

fn write_config(config: &RuntimeConfig, path: &Path) -> Result<()> {
    config
        .save_to_path(path)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "wrote runtime config");
    Ok(())
}

fn write_snapshot(session: &Session, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&session.snapshot())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    info!(path = %path.display(), "wrote session snapshot");
    Ok(())
}
