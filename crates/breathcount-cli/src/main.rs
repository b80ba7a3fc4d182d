use breathcount_core::CoreError;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "breathcount", version, about = "Breathcount segmented interval timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preset management
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Edit the segments of a preset
    Segment {
        #[command(subcommand)]
        action: commands::segment::SegmentAction,
    },
    /// Set how many passes a preset runs
    Repeat {
        /// Preset ID
        preset: String,
        /// Number of passes (at least 1)
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run a preset in the foreground
    Play {
        /// Preset ID
        preset: String,
        /// Do not play cues
        #[arg(long)]
        no_audio: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("breathcount=warn,breathcount_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Segment { action } => commands::segment::run(action),
        Commands::Repeat { preset, count } => commands::segment::set_repeat(&preset, count),
        Commands::Config { action } => commands::config::run(action),
        Commands::Play { preset, no_audio } => commands::play::run(&preset, no_audio),
    };

    if let Err(e) = result {
        match e.downcast_ref::<CoreError>().and_then(CoreError::code) {
            Some(code) => eprintln!("error: {e} ({code})"),
            None => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
