use crate::config::load_config;
use crate::render::{write_output_png, write_output_svg, DiagramRequest, DiagramThemer};
use crate::templates::TemplateCache;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sdt", version, about = "Theme SVG diagram templates from a JSON request")]
pub struct Args {
    /// Request file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Directory of *.svg templates; built-in templates when omitted
    #[arg(short = 't', long = "templates")]
    pub templates: Option<PathBuf>,

    /// Engine config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// List available templates and exit
    #[arg(long = "list")]
    pub list: bool,

    /// Debug logging and metadata on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = load_config(args.config.as_deref())?;

    let loaded;
    let templates = match args.templates.as_deref() {
        Some(dir) => {
            loaded = TemplateCache::load_dir(dir)?;
            &loaded
        }
        None => TemplateCache::builtin(),
    };

    if args.list {
        for name in templates.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let input = read_input(args.input.as_deref())?;
    let request = parse_request(&input)?;
    let themer = DiagramThemer::new(templates, config.engine.clone());
    let output = themer.render(&request)?;
    if args.verbose {
        eprintln!("{}", serde_json::to_string_pretty(&output.metadata)?);
    }

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&output.content, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let path = ensure_output(&args.output, "png")?;
            write_output_png(&output.content, &path, &config.render)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// JSON5 is a superset of JSON, so plain wire requests parse too.
fn parse_request(input: &str) -> Result<DiagramRequest> {
    json5::from_str(input).map_err(|err| anyhow::anyhow!("invalid request: {err}"))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
