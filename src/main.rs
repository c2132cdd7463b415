use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cover_analysis::analysis::{basic_analysis, fancy_analysis, render_summary};
use cover_analysis::backends::dependency_check;
use cover_analysis::io::report::{default_report_path, write_json};
use cover_analysis::{AnalysisConfig, Analyzer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Musical analysis for cover generation
#[derive(Parser)]
#[command(name = "cover-analysis")]
#[command(about = "Analyze tempo, key, timbre, structure and patterns of audio recordings")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every stage, with stems, transcription and embeddings when available
    Full,
    /// Features and capability flags only
    Basic,
    /// Separation, transcription and advanced features, each on its own
    Fancy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Device {
    Cpu,
    Cuda,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze audio files and write JSON reports
    Analyze {
        /// Input audio files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Report path (single input only); defaults to <input>.analysis.json
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pipeline to run
        #[arg(long, value_enum, default_value = "full")]
        mode: Mode,

        /// Device for model inference
        #[arg(long, value_enum, default_value = "cpu")]
        device: Device,

        /// Files analysed in parallel
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Check that the ML runtime is usable
    Check,
    /// Show default configuration
    ShowConfig,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn analyze_one(
    analyzer: &Analyzer,
    mode: Mode,
    input: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = analyzer.config();
    let report_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_report_path(input));

    match mode {
        Mode::Full => {
            let run = analyzer.analyze(input, Some(&report_path))?;
            if !quiet {
                println!("{}", render_summary(&run.report, &config.report));
            }
        }
        Mode::Basic => {
            let report = basic_analysis(input, config, analyzer.registry())?;
            write_json(&report, &report_path)?;
        }
        Mode::Fancy => {
            let report = fancy_analysis(input, config, analyzer.registry())?;
            write_json(&report, &report_path)?;
            if !quiet {
                println!("Summary: {}", report.summary_line());
            }
        }
    }
    if !quiet {
        println!("Analysis saved to {}", report_path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            output,
            config,
            mode,
            device,
            jobs,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }
            if output.is_some() && inputs.len() > 1 {
                anyhow::bail!("--output can only be used with a single input file");
            }
            init_logging(verbose, quiet);

            let mut config = match config {
                Some(path) => AnalysisConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => AnalysisConfig::default(),
            }
            .with_env_overrides();
            config.models.device = match device {
                Device::Cpu => "cpu",
                Device::Cuda => "cuda",
            }
            .to_string();

            let analyzer = Analyzer::new(config);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs.max(1))
                .build()
                .context("building worker pool")?;

            let failures: Vec<String> = pool.install(|| {
                inputs
                    .par_iter()
                    .filter_map(|input| {
                        analyze_one(&analyzer, mode, input, output.as_deref(), quiet)
                            .err()
                            .map(|e| format!("{}: {:#}", input.display(), e))
                    })
                    .collect()
            });

            if !failures.is_empty() {
                for failure in &failures {
                    eprintln!("Error: {}", failure);
                }
                anyhow::bail!("{} of {} file(s) failed", failures.len(), inputs.len());
            }
        }
        Commands::Check => match dependency_check() {
            Ok(()) => println!("OK"),
            Err(missing) => {
                println!("MISSING: {}", missing);
                std::process::exit(1);
            }
        },
        Commands::ShowConfig => {
            let json = serde_json::to_string_pretty(&AnalysisConfig::default())?;
            println!("{}", json);
        }
    }

    Ok(())
}
