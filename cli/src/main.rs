//! `gridpath`: drive the traversal engine from a terminal.

mod generators;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gridpath_core::{GridModel, Outcome, TraversalEngine, TraversalEvent};
use gridpath_session::{PaintMode, Session, Settings};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::generators::GeneratorKind;

/// Grid pathfinding visualizer: breadth-first search, traced and replayed
#[derive(Parser, Debug)]
#[command(name = "gridpath")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file (rows, cols, delay_ms, max_delay_ms, min_delay_ms)
    #[arg(long, global = true, env = "GRIDPATH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time the engine on large generated grids
    Bench {
        /// Generator to run; all of them when omitted
        #[arg(long, value_enum)]
        generator: Option<GeneratorKind>,

        /// Side length of the square grid. The full trace is kept in memory,
        /// so sides above 2000 are refused.
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..=2_000))]
        size: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the event trace of one run as JSON lines
    Trace {
        #[command(flatten)]
        grid: GridArgs,
    },

    /// Animate a run in the terminal
    Play {
        #[command(flatten)]
        grid: GridArgs,

        /// Speed control value; higher is faster
        #[arg(long, conflicts_with = "delay_ms")]
        speed: Option<u64>,

        /// Delay between steps in milliseconds
        #[arg(long, env = "GRIDPATH_DELAY_MS")]
        delay_ms: Option<u64>,

        /// Draw only the final frame
        #[arg(long)]
        final_only: bool,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    #[arg(long, value_enum, default_value_t = GeneratorKind::Maze)]
    generator: GeneratorKind,

    #[arg(long, env = "GRIDPATH_ROWS")]
    rows: Option<usize>,

    #[arg(long, env = "GRIDPATH_COLS")]
    cols: Option<usize>,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn load_settings(path: Option<&PathBuf>, grid: &GridArgs) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            Settings::from_json_str(&raw)
                .with_context(|| format!("loading settings from {}", path.display()))?
        }
        None => Settings::default(),
    };
    if let Some(rows) = grid.rows {
        settings.rows = rows;
    }
    if let Some(cols) = grid.cols {
        settings.cols = cols;
    }
    settings.validate()?;
    Ok(settings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so frames and traces on stdout stay clean.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Bench {
            generator,
            size,
            seed,
        } => {
            let kinds = match generator {
                Some(kind) => vec![kind],
                None => GeneratorKind::ALL.to_vec(),
            };
            for kind in kinds {
                run_benchmark(kind, size as usize, seed)?;
            }
            Ok(())
        }
        Command::Trace { grid } => {
            let settings = load_settings(cli.config.as_ref(), &grid)?;
            trace(&grid, &settings)
        }
        Command::Play {
            grid,
            speed,
            delay_ms,
            final_only,
        } => {
            let mut settings = load_settings(cli.config.as_ref(), &grid)?;
            if let Some(speed) = speed {
                settings.set_speed(speed);
            }
            if let Some(ms) = delay_ms {
                settings.delay_ms = ms;
            }
            settings.validate()?;
            play(&grid, settings, final_only).await
        }
    }
}

fn run_benchmark(kind: GeneratorKind, size: usize, seed: u64) -> Result<()> {
    println!("--- {} ---", kind.name());

    let t = Instant::now();
    let grid = kind.generate(size, size, seed)?;
    println!(
        "Generated {}x{} in {:.1}ms, {} walls",
        size,
        size,
        t.elapsed().as_secs_f64() * 1000.0,
        grid.wall_count()
    );

    let engine = TraversalEngine::new();
    let t = Instant::now();
    let result = engine.run(&grid)?;
    let elapsed = t.elapsed();
    debug!(
        generator = kind.name(),
        size,
        events = result.len(),
        outcome = ?result.outcome(),
        "benchmark run finished"
    );

    println!(
        "{:>12} {:>12} {:>12} {:>10}",
        "events", "visited", "path", "time"
    );
    println!("{:->12} {:->12} {:->12} {:->10}", "", "", "", "");
    let path = match result.outcome() {
        Outcome::PathFound => result.path_steps().count().to_string(),
        Outcome::NoPathFound => "none".to_string(),
    };
    println!(
        "{:>12} {:>12} {:>12} {:>8.1}ms",
        result.len(),
        result.nodes_visited(),
        path,
        elapsed.as_secs_f64() * 1000.0
    );
    println!();
    Ok(())
}

fn trace(args: &GridArgs, settings: &Settings) -> Result<()> {
    let grid = args
        .generator
        .generate(settings.rows, settings.cols, args.seed)?;
    let result = TraversalEngine::new().run(&grid)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in result.events() {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    writeln!(
        out,
        "{}",
        serde_json::json!({
            "outcome": result.outcome(),
            "nodes_visited": result.nodes_visited(),
            "events": result.len(),
        })
    )?;
    Ok(())
}

/// Replays a generated grid into a session through its click interface.
fn paint(session: &mut Session, grid: &GridModel) -> Result<()> {
    session.set_mode(PaintMode::Wall);
    for pos in grid.positions().filter(|&pos| !grid.is_passable(pos)) {
        session.click(pos)?;
    }
    if let Some(start) = grid.start() {
        session.set_mode(PaintMode::Start);
        session.click(start)?;
    }
    if let Some(end) = grid.end() {
        session.set_mode(PaintMode::End);
        session.click(end)?;
    }
    Ok(())
}

enum Frame {
    Step(TraversalEvent),
    Done(Outcome),
}

async fn play(args: &GridArgs, settings: Settings, final_only: bool) -> Result<()> {
    let grid = args
        .generator
        .generate(settings.rows, settings.cols, args.seed)?;
    let mut session = Session::new(settings)?;
    paint(&mut session, &grid)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let done_tx = tx.clone();
    let _handle = session.run(
        move |event| {
            let _ = tx.send(Frame::Step(*event));
        },
        move |outcome| {
            let _ = done_tx.send(Frame::Done(outcome));
        },
    )?;

    let mut steps = 0usize;
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(Frame::Step(event)) => {
                    steps += 1;
                    if !final_only {
                        draw(&session, &format!("step {steps}: {event:?}"))?;
                    }
                }
                Some(Frame::Done(outcome)) => {
                    info!(?outcome, steps, "playback finished");
                    let status = match outcome {
                        Outcome::PathFound => "Path found".to_string(),
                        Outcome::NoPathFound => "No Path Found!".to_string(),
                    };
                    draw(&session, &format!("{status} after {steps} steps"))?;
                    return Ok(());
                }
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                info!(steps, "playback cancelled");
                draw(&session, &format!("cancelled after {steps} steps"))?;
                return Ok(());
            }
        }
    }
}

fn draw(session: &Session, status: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "\x1b[2J\x1b[H{}{}", session.render(), status)?;
    out.flush()?;
    Ok(())
}
