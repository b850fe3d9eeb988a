use std::path::PathBuf;

use anyhow::{Context, Result};
use aurora_scramble::{ScrambleConfig, Scrambler};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "aurora-scramble",
    version,
    about = "Uglify Python, C/C++, JavaScript/TypeScript and Go sources"
)]
struct Cli {
    /// Files or directories to scramble.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Descend into subdirectories.
    #[arg(short, long)]
    recursive: bool,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the textual noise pass.
    #[arg(long)]
    no_noise: bool,

    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Marker inserted into output file and directory names.
    #[arg(long, value_name = "NAME")]
    marker: Option<String>,

    /// Log every applied rule.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<ScrambleConfig> {
        let mut config = match &self.config {
            Some(path) => ScrambleConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ScrambleConfig::default(),
        };
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if self.no_noise {
            config = config.without_noise();
        }
        if let Some(marker) = &self.marker {
            config = config.output_marker(marker.clone());
        }
        if self.recursive {
            config = config.recursive(true);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "aurora_scramble=debug" } else { "aurora_scramble=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = cli.load_config()?;
    let mut scrambler = Scrambler::new(config).context("invalid configuration")?;
    let report = scrambler.scramble_paths(&cli.paths);

    for (path, err) in &report.failed {
        eprintln!("error: {}: {}", path.display(), err);
    }
    println!("{}", report.summary());

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
