use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vaultmark::clock::{Clock, SystemClock};
use vaultmark::config::Config;
use vaultmark::integrity;
use vaultmark::logging::{init_subscriber, LogFormat};
use vaultmark::watermark::{resolve_stamp, StampContext, WatermarkRenderer};

/// Vaultmark - protected document delivery: integrity checks and
/// per-viewer watermark stamping
#[derive(Parser, Debug)]
#[command(name = "vaultmark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the structural sanity gate against a local document
    Validate {
        /// Document to inspect
        file: PathBuf,
    },
    /// Stamp a local document with a viewer-specific watermark
    Stamp {
        /// Input document
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the stamped derivative
        #[arg(short, long)]
        output: PathBuf,

        /// Viewer label resolved into the stamp template
        #[arg(long)]
        viewer: String,

        /// Override the configured stamp template for this run
        #[arg(long)]
        text: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::from_file(path)
                .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?;
            // The CLI never issues URLs, so only the watermark section has
            // to hold up here.
            config
                .watermark
                .style()
                .map_err(|e| anyhow::anyhow!("invalid watermark config: {}", e))?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_subscriber(format).expect("Failed to initialize logging subsystem");

    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Validate { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            match integrity::validate(&bytes) {
                Ok(()) => {
                    println!("{}: ok ({} bytes)", file.display(), bytes.len());
                    Ok(())
                }
                Err(err) => bail!("{}: {}", file.display(), err),
            }
        }
        Command::Stamp {
            input,
            output,
            viewer,
            text,
        } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            integrity::validate(&bytes)
                .with_context(|| format!("{} failed validation", input.display()))?;

            let style = config
                .watermark
                .style()
                .map_err(|e| anyhow::anyhow!("invalid watermark config: {}", e))?;
            let template = text.unwrap_or(config.watermark.stamp_template);
            let stamp = resolve_stamp(
                &template,
                &StampContext {
                    viewer,
                    document: input
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    at: SystemClock.now(),
                },
            );

            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                stamp = %stamp,
                "stamping document"
            );

            let renderer = WatermarkRenderer::new();
            let stamped = renderer.render(&bytes, &stamp, &style)?;
            std::fs::write(&output, &stamped)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("{} -> {} ({} bytes)", input.display(), output.display(), stamped.len());
            Ok(())
        }
    }
}
