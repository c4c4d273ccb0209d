//! CLI for the MeiLin ambient behavior engine.
//!
//! `run` writes one JSON event per line to stdout and reads console commands
//! from stdin. Tracing output goes to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use meilin::diagnostics::init_tracing;
use meilin::{
    AmbientCommand, AmbientEngine, AmbientEvent, AmbientLoop, AmbientLoopConfig, MeiLinConfig,
    TokioClock,
};
use meilin_ambient::{AmbientPack, ManualClock, Timestamp};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// MeiLin ambient behaviors: sighs, giggles and hums while chat is quiet.
#[derive(Parser)]
#[command(name = "meilin-ambient", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "MEILIN_CONFIG")]
    config: Option<PathBuf>,

    /// Behavior pack JSON, overriding the config.
    #[arg(long)]
    pack: Option<PathBuf>,

    /// Fixed RNG seed, overriding the config.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the idle loop until Ctrl-C.
    Run,

    /// List personality modes.
    Modes,

    /// Show what a mode boosts and suppresses.
    Stats {
        /// Mode to inspect; the starting mode when omitted.
        #[arg(long)]
        mode: Option<String>,
    },

    /// Simulate draws on a manual clock and print frequencies.
    Sample {
        #[arg(long, default_value = "normal")]
        mode: String,
        /// Context tag; unfiltered draws when omitted.
        #[arg(long)]
        context: Option<String>,
        #[arg(long, default_value_t = 1000)]
        count: u32,
        /// Simulated seconds between draws.
        #[arg(long, default_value_t = 60)]
        step_secs: u64,
    },

    /// Load and validate a behavior pack.
    Validate {
        pack: PathBuf,
    },

    /// Pick a pre-generated idle response.
    Idle {
        context: String,
        /// Local hour to use instead of the current one.
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
    },

    /// Pick an ambient clip (`waiting_api`, `after_command`, `processing`, ...).
    Clip {
        context: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = MeiLinConfig::load_or_default(cli.config.as_deref())
        .context("cannot load configuration")?;
    if let Some(pack) = cli.pack {
        config.ambient.pack_path = Some(pack);
    }
    if let Some(seed) = cli.seed {
        config.ambient.seed = Some(seed);
    }
    let _log_guard = init_tracing(&config.logging)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Modes => list_modes(&config),
        Command::Stats { mode } => stats(&config, mode.as_deref()),
        Command::Sample {
            mode,
            context,
            count,
            step_secs,
        } => sample(&config, &mode, context.as_deref(), count, step_secs),
        Command::Validate { pack } => validate(pack),
        Command::Idle { context, hour } => idle(&config, &context, hour),
        Command::Clip { context } => clip(&config, &context),
    }
}

async fn run(config: MeiLinConfig) -> anyhow::Result<()> {
    let engine =
        AmbientEngine::from_config_with_clock(&config.ambient, Box::new(TokioClock::new()))?;
    let cancel = CancellationToken::new();
    let (handle, mut events, task) =
        AmbientLoop::spawn(engine, AmbientLoopConfig::from(&config.ambient), cancel.clone());

    let console = handle.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.parse::<AmbientCommand>() {
                Ok(command) => {
                    if !console.send(command) {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("cannot encode event: {e}"),
            }
            if event == AmbientEvent::Stopped {
                break;
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for Ctrl-C")?;
    info!("shutting down");
    handle.shutdown();

    let engine = task.await.context("ambient loop panicked")?;
    if let Err(e) = printer.await {
        warn!("event printer failed: {e}");
    }
    info!(mode = %engine.current_mode().id, "ambient loop stopped");
    Ok(())
}

fn list_modes(config: &MeiLinConfig) -> anyhow::Result<()> {
    let engine = AmbientEngine::from_config(&config.ambient)?;
    for mode in engine.list_modes() {
        let marker = if mode.is_active { "*" } else { " " };
        println!(
            "{marker} {:<10} {:<12} {}",
            mode.id, mode.display_name, mode.description
        );
    }
    Ok(())
}

fn stats(config: &MeiLinConfig, mode: Option<&str>) -> anyhow::Result<()> {
    let mut engine = AmbientEngine::from_config(&config.ambient)?;
    if let Some(mode) = mode {
        engine.switch_mode(mode)?;
    }
    let stats = engine.current_mode_stats()?;
    println!("{} ({})", stats.display_name, stats.mode_id);
    if !stats.description.is_empty() {
        println!("  {}", stats.description);
    }
    println!(
        "  available: {}/{}",
        stats.available_behaviors, stats.total_behaviors
    );
    println!("  boosted:    {}", join_ids(&stats.boosted));
    println!("  suppressed: {}", join_ids(&stats.suppressed));
    Ok(())
}

fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    if ids.is_empty() {
        return "-".to_owned();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample(
    config: &MeiLinConfig,
    mode: &str,
    context: Option<&str>,
    count: u32,
    step_secs: u64,
) -> anyhow::Result<()> {
    let clock = ManualClock::new(Timestamp::ZERO);
    let mut engine =
        AmbientEngine::from_config_with_clock(&config.ambient, Box::new(clock.clone()))?;
    engine.switch_mode(mode)?;

    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut empty = 0u32;
    let mut fallbacks = 0u32;
    for _ in 0..count {
        let pick = match context {
            Some(context) => engine.behavior(context)?,
            None => engine.random_behavior()?,
        };
        match pick {
            Some(selection) => {
                if context.is_some() && !selection.matched_context {
                    fallbacks += 1;
                }
                *counts.entry(selection.behavior_id.to_string()).or_default() += 1;
            }
            None => empty += 1,
        }
        clock.advance(Duration::from_secs(step_secs));
    }

    let mut rows: Vec<_> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    println!("{count} draws in mode {mode}, {step_secs}s apart");
    for (id, hits) in rows {
        let share = f64::from(hits) / f64::from(count.max(1)) * 100.0;
        println!("  {id:<14} {hits:>6}  {share:5.1}%");
    }
    println!("  (cooling down) {empty:>6}");
    if context.is_some() {
        println!("  context fallbacks: {fallbacks}");
    }
    Ok(())
}

fn validate(pack: PathBuf) -> anyhow::Result<()> {
    let parts = AmbientPack::from_file(&pack)
        .and_then(AmbientPack::into_parts)
        .with_context(|| format!("invalid pack {}", pack.display()))?;
    println!(
        "{}: {} behaviors, {} modes, {} idle responses, {} clips, default mode {}",
        pack.display(),
        parts.catalog.len(),
        parts.modes.len(),
        parts.idle.len(),
        parts.clips.len(),
        parts.settings.default_mode
    );
    Ok(())
}

fn idle(config: &MeiLinConfig, context: &str, hour: Option<u32>) -> anyhow::Result<()> {
    let clock = ManualClock::new(Timestamp::ZERO);
    clock.set_hour(hour.unwrap_or_else(current_hour));
    let mut engine = AmbientEngine::from_config_with_clock(&config.ambient, Box::new(clock))?;
    match engine.idle_response(context) {
        Some(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        None => anyhow::bail!("no idle response for context {context}"),
    }
}

fn clip(config: &MeiLinConfig, context: &str) -> anyhow::Result<()> {
    let mut engine = AmbientEngine::from_config(&config.ambient)?;
    match engine.clip(context) {
        Some(clip) => {
            println!("{}", serde_json::to_string_pretty(&clip)?);
            Ok(())
        }
        None => anyhow::bail!("no clip for context {context}"),
    }
}

fn current_hour() -> u32 {
    use chrono::Timelike;
    chrono::Local::now().hour()
}
