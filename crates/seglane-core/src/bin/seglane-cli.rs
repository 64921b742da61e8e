use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use seglane_core::{
    SeglaneConfig, SegmentIterExt, Track, Value, ValueStats, VcdTrack, basic_statistics,
    diagnostics::init_tracing,
    export::export_vcd,
    fixtures::{demo_capture, demo_modes},
    mode_report,
};

#[derive(Debug, Parser)]
#[command(name = "seglane-cli")]
#[command(about = "Headless tools for seglane capture processing and export")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file; discovered from the environment and cwd when unset.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    DemoExport {
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "raw")]
        variant: DemoVariant,
    },
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DemoVariant {
    Raw,
    Deglitched,
    All,
}

#[derive(Debug, Serialize)]
struct StatsRow {
    values: Vec<Value>,
    #[serde(flatten)]
    stats: ValueStats,
}

#[derive(Debug, Serialize)]
struct TrackStats {
    track: String,
    duration_seconds: f64,
    rows: Vec<StatsRow>,
}

fn track_stats(track: &dyn Track) -> TrackStats {
    TrackStats {
        track: track.name().to_string(),
        duration_seconds: track.duration_seconds(),
        rows: basic_statistics(track.segments())
            .into_iter()
            .map(|(values, stats)| StatsRow { values, stats })
            .collect(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SeglaneConfig::load_from(path)?,
        None => SeglaneConfig::load_or_default()?,
    };
    if let Some(log_dir) = cli.log_dir {
        config.diagnostics.log_dir = log_dir;
    }
    let _telemetry = init_tracing(&config.diagnostics)?;

    match cli.command {
        Commands::DemoExport {
            output_dir,
            variant,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
            let capture = demo_capture();
            let options = config.export.vcd_options();

            if matches!(variant, DemoVariant::Raw | DemoVariant::All) {
                export_vcd(&capture.vcd_tracks(), &output_dir.join("demo.vcd"), &options)?;
            }
            if matches!(variant, DemoVariant::Deglitched | DemoVariant::All) {
                let mut bus = capture.bus.clone();
                let threshold = bus.seconds_to_samples(config.capture.deglitch_threshold_seconds);
                let deglitched: Vec<_> = bus.segments().deglitched(threshold).cleaned().collect();
                bus.set_segments(Box::new(deglitched.into_iter()))?;
                let tracks: [&dyn VcdTrack; 1] = [&bus];
                export_vcd(&tracks, &output_dir.join("demo-deglitched.vcd"), &options)?;
            }
            tracing::info!(path = %output_dir.display(), "demo export finished");
        }
        Commands::Stats => {
            let capture = demo_capture();
            let mut tracks: Vec<TrackStats> = capture
                .bits
                .iter()
                .map(|track| track_stats(track))
                .collect();
            tracks.push(track_stats(&capture.bus));
            tracks.push(track_stats(&capture.supply));

            let report = serde_json::json!({
                "tracks": tracks,
                "modes": mode_report(&capture.bus, &demo_modes()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
