//! qrcode-footprint: QR code PCB footprint generator
//!
//! Encodes text as a QR or Micro QR code and writes it out as a KiCad
//! footprint, previews it in the terminal, or serves generation to AI
//! assistants over MCP.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use qrcode_footprint::config::{self, Config, OutputFormat};
use qrcode_footprint::error::{ExportError, GenerateError};
use qrcode_footprint::footprint::{generate, generate_kicad, CopperStyle, QrFootprintParams};
use qrcode_footprint::mcp::server::McpServer;
use qrcode_footprint::surface::{footprint_name_for, FootprintBody};

/// QR code PCB footprint generator.
///
/// Builds a footprint carrying a scannable QR code on copper and/or
/// silkscreen, with a mask opening, courtyard and labels.
#[derive(Parser, Debug)]
#[command(name = "qrcode-footprint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a footprint file
    Generate {
        #[command(flatten)]
        footprint: FootprintArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Footprint name (derived from the content when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Print an ASCII preview of a footprint
    Preview {
        #[command(flatten)]
        footprint: FootprintArgs,

        /// Millimetres per character (one module when omitted)
        #[arg(long, value_name = "MM")]
        cell: Option<f64>,
    },

    /// Run the MCP server on stdio
    Serve,
}

/// Footprint parameter overrides shared by `generate` and `preview`.
#[derive(clap::Args, Debug, Default)]
struct FootprintArgs {
    /// Text to encode (configured content when omitted)
    content: Option<String>,

    /// Module edge length in mm
    #[arg(long, value_name = "MM")]
    pixel_size: Option<f64>,

    /// Fixed quiet zone in modules (recommended quiet zone when omitted)
    #[arg(long, value_name = "MODULES")]
    border: Option<u32>,

    /// Draw light modules instead of dark ones
    #[arg(long)]
    negative: bool,

    /// Never use Micro QR
    #[arg(long)]
    no_micro: bool,

    /// Also draw modules on the front silkscreen
    #[arg(long)]
    silk: bool,

    /// Do not draw modules on front copper
    #[arg(long)]
    no_copper: bool,

    /// Keep the solder mask closed over the symbol
    #[arg(long)]
    no_mask_cutout: bool,

    /// Draw copper modules as SMD pads instead of polygons
    #[arg(long)]
    pads: bool,

    /// Reference designator text
    #[arg(long)]
    reference: Option<String>,
}

impl FootprintArgs {
    /// Applies the overrides on top of `params`.
    fn apply(self, mut params: QrFootprintParams) -> QrFootprintParams {
        if let Some(content) = self.content {
            params.content = content;
        }
        if let Some(pixel_size) = self.pixel_size {
            params.pixel_size = pixel_size;
        }
        if let Some(border) = self.border {
            params.border_auto = false;
            params.border = border;
        }
        if let Some(reference) = self.reference {
            params.reference = reference;
        }
        params.negative |= self.negative;
        params.allow_compact_format &= !self.no_micro;
        params.use_silk_layer |= self.silk;
        params.use_copper_layer &= !self.no_copper;
        params.mask_cut_out &= !self.no_mask_cutout;
        if self.pads {
            params.copper_style = CopperStyle::Pad;
        }
        params
    }
}

/// Output formats accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// KiCad `.kicad_mod` footprint
    Kicad,
    /// JSON dump of the placed primitives
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Kicad => Self::Kicad,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Errors reported by the `generate` and `preview` commands.
#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries footprints and MCP messages, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Generates a footprint and writes it to `output` or stdout.
fn run_generate(
    cfg: &Config,
    params: &QrFootprintParams,
    output: Option<PathBuf>,
    format: OutputFormat,
    name: Option<String>,
) -> Result<(), CliError> {
    let name = name
        .or_else(|| cfg.output.footprint_name.clone())
        .unwrap_or_else(|| footprint_name_for(&params.content));

    let (footprint, report) = generate_kicad(params, name)?;
    info!(summary = %report.description(), "Footprint ready");

    match format {
        OutputFormat::Kicad => match output {
            Some(path) => footprint.write(&path)?,
            None => print!("{}", footprint.to_sexpr()),
        },
        OutputFormat::Json => {
            let document = json!({
                "name": footprint.name,
                "description": footprint.description,
                "report": report,
                "primitives": footprint.body(),
            });
            let text = serde_json::to_string_pretty(&document).map_err(ExportError::from)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text + "\n")
                        .map_err(|e| ExportError::file_write(&path, e))?;
                    info!(path = %path.display(), "Wrote JSON footprint");
                }
                None => println!("{text}"),
            }
        }
    }

    Ok(())
}

/// Generates a footprint and prints its ASCII preview.
fn run_preview(
    cfg: &Config,
    params: &QrFootprintParams,
    cell: Option<f64>,
) -> Result<(), CliError> {
    let mut body = FootprintBody::new();
    let report = generate(params, &mut body)?;

    let cell = cell
        .or(cfg.output.preview_cell)
        .unwrap_or(params.pixel_size);

    println!("{}", report.description());
    println!("{}", body.render_ascii(cell));
    Ok(())
}

/// Runs the MCP server until stdin closes or a signal arrives.
fn run_serve(cfg: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting qrcode-footprint MCP server"
    );

    let allowed_paths = if cfg.allowed_paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cfg.allowed_paths
    };

    info!(
        allowed_paths = ?allowed_paths,
        "Allowed paths configured"
    );

    let mut server =
        McpServer::new(cfg.barcode, allowed_paths).with_preview_cell(cfg.output.preview_cell);

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

/// Entry point for qrcode-footprint.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config_or_default(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the expected layout");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    let result = match args.command {
        Command::Serve => return run_serve(cfg),
        Command::Generate {
            footprint,
            output,
            format,
            name,
        } => {
            let params = footprint.apply(cfg.barcode.clone());
            let format = format.map_or(cfg.output.format, OutputFormat::from);
            run_generate(&cfg, &params, output, format, name)
        }
        Command::Preview { footprint, cell } => {
            let params = footprint.apply(cfg.barcode.clone());
            run_preview(&cfg, &params, cell)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Generation failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
