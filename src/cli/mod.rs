//! # Command Line Interface
//!
//! Reads one YAML document, runs it through the selected processor and writes
//! the resulting Envoy bootstrap. Output is rendered fully in memory first, so
//! a failed run never leaves a truncated file behind.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::config::{EnvoySettings, Settings};
use crate::observability::{init_logging, log_settings_info};
use crate::output::{render, OutputFormat};
use crate::processors::{run_pipeline, ProcessorRegistry};
use crate::xds::generate_bootstrap;

#[derive(Parser, Debug)]
#[command(name = "envoy-confgen")]
#[command(about = "Generate static Envoy bootstrap configurations from declarative YAML")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Processor used to transform the input document
    #[arg(short, long)]
    pub processor: Option<String>,

    /// File to write to, defaults to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output encoding
    #[arg(long, value_enum, default_value_t = OutputFormat::Pb)]
    pub format: OutputFormat,

    /// Settings file, replacing the default search path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the registered processors and exit
    #[arg(long)]
    pub list_processors: bool,

    /// The YAML document to convert
    #[arg(required_unless_present = "list_processors")]
    pub path: Option<PathBuf>,
}

/// Read, validate and transform `path`, returning the rendered bootstrap
pub fn convert_file(
    registry: &ProcessorRegistry,
    processor_name: &str,
    path: &Path,
    settings: &EnvoySettings,
    format: OutputFormat,
) -> anyhow::Result<Vec<u8>> {
    let processor = registry.create(processor_name)?;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read YAML file \"{}\"", path.display()))?;
    let doc: Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("Could not parse YAML file \"{}\".", path.display()))?;

    debug!(path = %path.display(), processor = processor.name(), "Loaded input document");

    let resources = run_pipeline(processor.as_ref(), &doc, settings)
        .with_context(|| format!("Could not parse YAML file \"{}\".", path.display()))?;

    let bootstrap = generate_bootstrap(resources, settings);
    Ok(render(&bootstrap, format)?)
}

fn write_output(rendered: &[u8], output: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Could not write output file \"{}\"", path.display()))?;
            info!(path = %path.display(), bytes = rendered.len(), %format, "Wrote bootstrap");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            if format == OutputFormat::Pb && stdout.is_terminal() {
                warn!("Writing binary protobuf to a terminal; use --output or --format summary");
            }
            stdout.write_all(rendered).context("Could not write to stdout")?;
            stdout.flush().context("Could not flush stdout")?;
        }
    }
    Ok(())
}

fn print_processors(registry: &ProcessorRegistry) {
    let default = registry.default_name();
    for name in registry.names() {
        let aliases = registry.aliases_of(name);
        let aliases = if aliases.is_empty() {
            String::new()
        } else {
            format!(" (alias: {})", aliases.join(", "))
        };

        if Some(name) == default {
            println!("{}{} {}", name.bold(), aliases, "(default)".dimmed());
        } else {
            println!("{name}{aliases}");
        }
    }
}

/// Print an error and its causes, one per line
pub fn report_error(error: &anyhow::Error) {
    eprintln!("{} {}", "error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("{cause}");
    }
}

/// Run CLI commands
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };

    init_logging(&settings.logging, cli.verbose)?;
    log_settings_info(&settings);

    let registry = ProcessorRegistry::builtin();

    if cli.list_processors {
        print_processors(&registry);
        return Ok(());
    }

    let path = cli.path.as_deref().context("An input YAML path is required")?;
    let processor_name = match cli.processor.as_deref().or(registry.default_name()) {
        Some(name) => name,
        None => anyhow::bail!("No processors are registered"),
    };

    let rendered = convert_file(&registry, processor_name, path, &settings.envoy, cli.format)?;
    write_output(&rendered, cli.output.as_deref(), cli.format)
}
