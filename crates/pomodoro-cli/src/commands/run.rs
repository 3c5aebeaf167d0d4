use std::time::Duration;

use clap::Args;
use pomodoro_core::timer::preset;
use pomodoro_core::{Config, Database, EventSink, PomodoroEngine, RunConfig};
use tokio::sync::mpsc;
use tracing::debug;

use crate::render;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Number of sessions to run
    #[arg(long)]
    pub sessions: Option<u32>,
    /// Rounds per session
    #[arg(long)]
    pub rounds: Option<u32>,
    /// Duration preset number (see `pomodoro presets`)
    #[arg(long)]
    pub preset: Option<usize>,
    /// Focus minutes, overriding the preset
    #[arg(long)]
    pub focus: Option<u32>,
    /// Short break minutes, overriding the preset
    #[arg(long)]
    pub short_break: Option<u32>,
    /// Long break minutes, overriding the preset
    #[arg(long)]
    pub long_break: Option<u32>,
    /// Length of one minute in milliseconds (demo mode)
    #[arg(long, hide = true)]
    pub minute_ms: Option<u64>,
    /// Print the final record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Merge flags over the configured defaults.
fn build_config(args: &RunArgs, config: &Config) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let preset = preset(args.preset.unwrap_or(config.run.preset))?;
    let mut run = RunConfig::from_preset(
        args.sessions.unwrap_or(config.run.sessions),
        args.rounds.unwrap_or(config.run.rounds_per_session),
        preset,
    )
    .with_break_cancel_policy(config.run.break_cancel_policy);

    if let Some(focus) = args.focus {
        run.focus_minutes = focus;
    }
    if let Some(short_break) = args.short_break {
        run.short_break_minutes = short_break;
    }
    if let Some(long_break) = args.long_break {
        run.long_break_minutes = long_break;
    }
    run.validate()?;
    Ok(run)
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let run_config = build_config(&args, &config)?;
    debug!(?run_config, "starting run");

    let minute = args
        .minute_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.clock.minute());

    let (tx, rx) = mpsc::unbounded_channel();
    let mut engine = PomodoroEngine::new(Database::open()?)
        .with_events(EventSink::new(tx))
        .with_minute(minute)
        .with_tick(config.clock.tick());

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel.cancel();
    });

    let renderer = if args.json {
        tokio::spawn(render::render_events(rx, tokio::io::sink()))
    } else {
        tokio::spawn(render::render_events(rx, tokio::io::stdout()))
    };

    let result = engine.start(&run_config).await;
    // The renderer ends once the engine's sender is gone.
    drop(engine);
    renderer.await?;

    let record = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", render::final_record(&record));
    }
    Ok(())
}
