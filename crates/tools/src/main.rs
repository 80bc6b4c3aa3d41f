use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use foundation::Period;
use serde::Serialize;
use tokio::sync::mpsc;
use tools::{Command, Player, Visualization, VizConfig, load_dataset, logging};

#[derive(Parser, Debug)]
#[command(name = "timemap", about = "Animate time-indexed values over a map", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the period axis.
    Index { config: PathBuf },
    /// Print one frame as JSON.
    Render {
        config: PathBuf,
        /// Last period at or before this one is drawn; the start period otherwise.
        #[arg(long)]
        period: Option<String>,
    },
    /// Play the animation, printing one JSON line per frame.
    Play {
        config: PathBuf,
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Print the tooltip for an entity.
    Hover {
        config: PathBuf,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        period: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
    },
    /// Print the detail timeline for an entity.
    Timeline {
        config: PathBuf,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        period: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(e) = real_main().await {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Cmd::Index { config } => cmd_index(&config).await,
        Cmd::Render { config, period } => cmd_render(&config, period.as_deref()).await,
        Cmd::Play {
            config,
            ticks,
            interval_ms,
        } => cmd_play(&config, ticks, interval_ms).await,
        Cmd::Hover {
            config,
            entity,
            period,
            x,
            y,
        } => cmd_hover(&config, &entity, period.as_deref(), [x, y]).await,
        Cmd::Timeline {
            config,
            entity,
            period,
        } => cmd_timeline(&config, &entity, period.as_deref()).await,
    }
}

fn emit<T: Serialize>(value: &T) -> Result<(), String> {
    let line = serde_json::to_string(value).map_err(|e| format!("encode output: {e}"))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").map_err(|e| format!("write output: {e}"))
}

async fn open(path: &Path) -> Result<Visualization, String> {
    let config = VizConfig::load(path).map_err(|e| e.to_string())?;
    let dataset = load_dataset(&config)
        .await
        .map_err(|e| format!("load failed: {e}"))?;
    Visualization::new(config, dataset).map_err(|e| e.to_string())
}

fn seek_to(viz: &mut Visualization, period: Option<&str>) -> Result<(), String> {
    let Some(raw) = period else {
        return Ok(());
    };
    let period = Period::parse(raw).map_err(|e| format!("--period: {e}"))?;
    viz.seek_period(period)
        .map(|_| ())
        .ok_or_else(|| format!("--period {period} is before the first period"))
}

async fn cmd_index(config: &Path) -> Result<(), String> {
    #[derive(Serialize)]
    struct IndexOut<'a> {
        periods: &'a [Period],
        entities: usize,
        records: usize,
        unmatched_names: usize,
    }

    let viz = open(config).await?;
    emit(&IndexOut {
        periods: viz.index().periods(),
        entities: viz.store().entity_count(),
        records: viz.store().record_count(),
        unmatched_names: viz.unmatched_names(),
    })
}

async fn cmd_render(config: &Path, period: Option<&str>) -> Result<(), String> {
    let mut viz = open(config).await?;
    seek_to(&mut viz, period)?;
    let update = viz.render().ok_or("nothing to render")?;
    emit(&update)?;
    if let Some(legend) = viz.legend() {
        emit(&legend)?;
    }
    if let Some(words) = viz.words() {
        emit(&words)?;
    }
    Ok(())
}

async fn cmd_play(config: &Path, ticks: Option<u64>, interval_ms: Option<u64>) -> Result<(), String> {
    let viz = open(config).await?;
    let interval_ms = interval_ms.unwrap_or(viz.config().playback.interval_ms);
    if interval_ms == 0 {
        return Err("--interval-ms must be positive".to_string());
    }

    let mut player = Player::new(viz, Duration::from_millis(interval_ms));
    if let Some(ticks) = ticks {
        player = player.with_tick_limit(ticks);
    }

    let (tx, rx) = mpsc::channel(4);
    tx.send(Command::Start)
        .await
        .map_err(|e| format!("queue start: {e}"))?;
    drop(tx);

    let mut result = Ok(());
    player
        .run(rx, |out| {
            if result.is_ok() {
                result = emit(&out);
            }
        })
        .await;
    result
}

async fn cmd_hover(
    config: &Path,
    entity: &str,
    period: Option<&str>,
    pointer: [f64; 2],
) -> Result<(), String> {
    let mut viz = open(config).await?;
    seek_to(&mut viz, period)?;
    viz.render();
    let tip = viz
        .hover(entity, pointer)
        .ok_or("nothing is displayed")?;
    emit(&tip)
}

async fn cmd_timeline(config: &Path, entity: &str, period: Option<&str>) -> Result<(), String> {
    let mut viz = open(config).await?;
    seek_to(&mut viz, period)?;
    match viz.click(entity) {
        Some(timeline) => emit(&timeline),
        None => Err(format!("no data for {entity:?}")),
    }
}
