//! Memory Spiral - Rust Implementation
//!
//! CLI commands:
//! - gui: Launch the native viewer
//! - curve: Dump the sampled spiral
//! - palette: Print period ranges and colors
//! - export: Write a render frame
//! - paint / attach / randomize: Edit a saved journal

mod color;
mod config;
mod controller;
mod curve;
mod imaging;
mod locator;
mod logging;
mod markers;
mod params;
mod render;
mod segments;
mod session;
mod viewer;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use crate::controller::{Journal, TubeClick};
use crate::params::PERIOD_COUNT;

#[derive(Parser)]
#[command(name = "memory_spiral")]
#[command(about = "A sculptable spiral timeline of memories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to spiral.yaml config
    #[arg(short, long, default_value = "spiral.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native GUI viewer
    Gui {
        /// Journal file (defaults to SPIRAL_SESSION)
        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Write the sampled spiral curve as JSON
    Curve {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the journal's parameters instead of the config defaults
        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Print each period's date range and colors
    Palette {
        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Write a render frame as JSON
    Export {
        #[arg(long)]
        session: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Catmull-Rom steps between samples
        #[arg(
            long,
            default_value = "1",
            value_parser = clap::value_parser!(u16).range(1..=curve::MAX_SUBDIVISIONS as i64)
        )]
        smoothing: u16,
    },

    /// Paint at a normalized position along the tube
    Paint {
        /// Position along the tube, 0.0 to 1.0
        #[arg(long)]
        u: f64,

        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Attach images to consecutive markers
    Attach {
        /// First marker id
        #[arg(long)]
        start: Option<usize>,

        /// Image files, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Randomize frequencies and hues
    Randomize {
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        session: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = config::Env::load();

    // Initialize logging first
    logging::init_logging(&env.log_dir)?;
    tracing::info!("Memory Spiral starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = config::Config::load_or_default(&cli.config)?;
    tracing::info!(
        "Config loaded: {} segments, epoch {}",
        config.segment_count,
        config.epoch
    );

    match cli.command {
        Commands::Gui { session } => {
            let path = session.unwrap_or(env.session);
            let journal = session::load_or_new(&path, &config)?;
            tracing::info!("Launching native viewer");
            let runtime = tokio::runtime::Handle::current();
            tokio::task::block_in_place(|| viewer::run_viewer(config, journal, path, runtime))?;
        }

        Commands::Curve { output, session } => {
            let journal = journal_or_defaults(session, &config)?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&curve_json(&journal))?)?;
        }

        Commands::Palette { session } => {
            print_palette(&journal_or_defaults(session, &config)?);
        }

        Commands::Export { session, output, smoothing } => {
            let journal = session::load_or_new(session.unwrap_or(env.session), &config)?;
            let frame = render::RenderFrame::from_journal(&journal, smoothing as usize);
            write_output(output.as_deref(), &serde_json::to_string_pretty(&frame)?)?;
        }

        Commands::Paint { u, session } => {
            let path = session.unwrap_or(env.session);
            let mut journal = session::load_or_new(&path, &config)?;
            let mut rng = StdRng::from_entropy();
            let click = journal.click_tube(u, &mut rng);
            println!("{}", describe_click(&click));
            if let TubeClick::Painted { .. } = click {
                session::save(&path, &journal)?;
            }
        }

        Commands::Attach { start, files, session } => {
            let path = session.unwrap_or(env.session);
            let mut journal = session::load_or_new(&path, &config)?;

            println!("Acquiring {} images...", files.len());
            let results = imaging::acquire_files(files).await;
            let report = journal.bulk_attach(start, results);

            for id in &report.assigned {
                println!("  node {} <- image", id);
            }
            for (id, err) in &report.failed {
                println!("  node {} failed: {}", id, err);
            }
            if report.dropped > 0 {
                println!("  {} images dropped (only 12 nodes)", report.dropped);
            }
            println!("{} nodes visible", report.node_count);
            session::save(&path, &journal)?;
        }

        Commands::Randomize { seed, session } => {
            let path = session.unwrap_or(env.session);
            let mut journal = session::load_or_new(&path, &config)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            journal.randomize(&mut rng);
            print_palette(&journal);
            session::save(&path, &journal)?;
        }
    }

    Ok(())
}

/// The saved journal when a session is named, the config defaults otherwise
fn journal_or_defaults(session: Option<PathBuf>, config: &config::Config) -> anyhow::Result<Journal> {
    match session {
        Some(path) => Ok(session::load(path, config)?),
        None => Ok(Journal::new(config)),
    }
}

fn curve_json(journal: &Journal) -> serde_json::Value {
    let curve = journal.curve();
    serde_json::json!({
        "height": curve.height(),
        "radius": curve.radius(),
        "points": curve.points(),
    })
}

fn describe_click(click: &TubeClick) -> String {
    match click {
        TubeClick::Painted { segment, count, color, .. } => {
            format!("Painted {} segments around {} with {}", count, segment, color)
        }
        TubeClick::Focused => {
            "Journal is in VIEW mode: the click focused the view, nothing was painted".to_string()
        }
    }
}

/// Write to a file, or stdout when no path is given
fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            println!("Wrote {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn print_palette(journal: &Journal) {
    let params = journal.params();
    let segments = journal.segments();
    let per_period = segments.len() / PERIOD_COUNT;

    println!("Periods ({} segments, {} years):", segments.len(), params.duration());
    for period in 0..PERIOD_COUNT {
        let first = segments.get(period * per_period);
        let last = segments.get(((period + 1) * per_period).saturating_sub(1));
        println!(
            "  [{}] {:<20} freq {:>5} hue {:>5}  {} .. {}",
            period,
            journal.period_label(period),
            params.frequencies()[period],
            params.period_hues()[period],
            first.map(|s| s.color.to_string()).unwrap_or_default(),
            last.map(|s| s.color.to_string()).unwrap_or_default(),
        );
    }
}
