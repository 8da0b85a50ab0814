mod analyze_cmd;
mod inspect_cmd;
mod parse_manifest_cmd;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use streamaudit_config::StreamAuditConfig;
use streamaudit_core::StreamingAnalysisResult;
use tracing::{error, warn};

use report::OutputFormat;

#[derive(Parser)]
#[command(name = "streamaudit")]
#[command(about = "StreamAudit: EN 301 549 Clause 7 checks for video streaming pages")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.streamaudit/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct OutputArgs {
    /// Report format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Exit with status 2 when a critical clause fails
    #[arg(long)]
    fail_on_critical: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a live page through a Chrome DevTools endpoint
    Analyze {
        /// Page to load
        #[arg(long)]
        url: String,

        /// DevTools WebSocket URL of the target page (overrides browser.cdpEndpoint)
        #[arg(long)]
        cdp: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Audit a saved HTML snapshot together with captured manifest files
    Inspect {
        /// HTML snapshot of the page
        #[arg(long)]
        html: PathBuf,

        /// Manifest files (.m3u8 / .mpd), repeatable
        #[arg(long = "manifest")]
        manifests: Vec<PathBuf>,

        /// JSON object of page globals, e.g. {"Hls": {"version": "1.5.7"}}
        #[arg(long)]
        globals: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Parse one manifest file and print its tracks
    ParseManifest {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "streamaudit failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| streamaudit_config::config_file_path(&streamaudit_config::config_dir()));
    let config = streamaudit_config::load_and_prepare(&config_path).await?;
    init_logging(&config, cli.log_level.as_deref())?;

    match cli.command {
        Commands::Analyze { url, cdp, output } => {
            let result = analyze_cmd::run(&config, &url, cdp.as_deref()).await?;
            finish(&result, output)
        }
        Commands::Inspect {
            html,
            manifests,
            globals,
            output,
        } => {
            let result = inspect_cmd::run(&html, &manifests, globals.as_deref()).await?;
            finish(&result, output)
        }
        Commands::ParseManifest { file } => {
            parse_manifest_cmd::run(&file).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(config: &StreamAuditConfig, level_override: Option<&str>) -> Result<()> {
    let logging = config.logging.clone().unwrap_or_default();
    let level = level_override
        .map(str::to_string)
        .or(logging.level)
        .unwrap_or_else(|| streamaudit_config::defaults::DEFAULT_LOG_LEVEL.to_string());
    streamaudit_logging::init_logger(logging.dir.as_deref().map(Path::new), &level)
}

fn finish(result: &StreamingAnalysisResult, output: OutputArgs) -> Result<ExitCode> {
    report::emit(result, output.format)?;
    let summary = result.summary();
    if output.fail_on_critical && summary.has_critical_failures() {
        warn!(
            critical_failures = summary.critical_failures,
            "Critical Clause 7 failures found"
        );
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
