use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{info, warn};

use border_scanner_lib::{load_image, process_image, save_outputs, CancelToken, Config, LogMode};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Border scanner - Otsu binarization and scanline contour tracing")]
struct Args {
    /// Path to input image (png, jpg, gif, tiff, bmp)
    #[clap(short, long)]
    input: Option<String>,

    /// Output file; format inferred from extension (default png)
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (ignored if missing)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Log output mode (overwrites config)
    #[clap(long)]
    log: Option<LogModeArg>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Also save the binary mask next to the output
    #[clap(long)]
    save_mask: bool,

    /// Invert colours before binarization
    #[clap(long)]
    invert: bool,

    /// Dump contour points to a CSV file
    #[clap(long)]
    contours_csv: Option<String>,

    /// Save a preview with this many scanned rows drawn over the mask
    #[clap(long)]
    preview_rows: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogModeArg {
    Auto,
    Json,
    Text,
}

impl From<LogModeArg> for LogMode {
    fn from(arg: LogModeArg) -> Self {
        match arg {
            LogModeArg::Auto => LogMode::Auto,
            LogModeArg::Json => LogMode::Json,
            LogModeArg::Text => LogMode::Text,
        }
    }
}

/// Install env_logger; `RUST_LOG` still wins over the default level
fn init_logging(mode: LogMode, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    let json = match mode {
        LogMode::Auto => !std::io::stderr().is_terminal(),
        LogMode::Json => true,
        LogMode::Text => false,
    };

    if json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "time": buf.timestamp().to_string(),
                "level": record.level().as_str(),
                "target": record.target(),
                "msg": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }

    builder.init();
}

/// How a run ended when no error occurred
#[derive(Debug, PartialEq)]
enum Outcome {
    Completed(PathBuf),
    Interrupted,
}

/// Load, process and save one image; cancellation is reported as `Interrupted`
fn run(config: &Config, cancel: &CancelToken) -> anyhow::Result<Outcome> {
    let start_time = Instant::now();
    info!("Input: {}", config.input_path);
    info!("Output: {}", config.output_path);

    let input_image = load_image(&config.input_path)
        .with_context(|| format!("failed to load input image '{}'", config.input_path))?;

    let output = match process_image(&input_image.image, config, cancel) {
        Ok(output) => output,
        Err(e) if e.is_cancelled() => return Ok(Outcome::Interrupted),
        Err(e) => return Err(e.into()),
    };

    let overlay_path = save_outputs(&output, config)
        .with_context(|| format!("failed to write output for '{}'", input_image.filename))?;

    info!(
        "Processed {} -> {} in {:.2} seconds",
        input_image.path.display(),
        overlay_path.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(Outcome::Completed(overlay_path))
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Load configuration if present
    let mut config = if Path::new(&args.config).is_file() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(mode) = args.log {
        config.log_mode = mode.into();
    }
    if args.save_mask {
        config.save_mask = true;
    }
    if args.invert {
        config.invert = true;
    }
    if args.contours_csv.is_some() {
        config.contours_csv = args.contours_csv;
    }
    if args.preview_rows.is_some() {
        config.preview_rows = args.preview_rows;
    }

    init_logging(config.log_mode, args.debug);
    config.validate()?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl+C handler")?;

    match run(&config, &cancel)? {
        Outcome::Completed(_) => Ok(ExitCode::SUCCESS),
        Outcome::Interrupted => {
            warn!("Interrupted; no output written");
            Ok(ExitCode::from(130))
        }
    }
}
