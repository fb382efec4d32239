//! GCDM client - fetch and decode netCDF data from a remote GCDM server

#![allow(clippy::print_stdout, clippy::print_stderr)]

use console::style;
use gcdm_client::cli::{Cli, Commands, ConfigAction};
use gcdm_client::config::Config;
use gcdm_client::decode::{FileHeader, NetcdfDecoder};
use gcdm_client::fetch::{self, FetchRequest};
use gcdm_client::output::{self, OutputFormat};
use gcdm_client::{GcdmError, Result};
use std::path::{Path, PathBuf};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

/// Main application entry point
fn run() -> i32 {
    let cli = Cli::parse_args();
    gcdm_client::logging::init(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {err}");
            return 1;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red().bold());
            err.exit_code()
        }
    }
}

/// Resolve configuration: defaults, then file, then env, then flags
fn resolve_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_or_default(&path)?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok((config, path))
}

/// Execute the requested command
async fn execute(cli: Cli) -> Result<()> {
    let (config, config_path) = resolve_config(&cli)?;
    if config.verbose {
        eprintln!("GCDM client v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Server: {}", config.server_url);
    }

    match cli.command {
        Commands::Fetch {
            location,
            variable,
            format,
            output,
            ..
        } => handle_fetch(&config, location, variable, format, output.as_deref()).await,
        Commands::Header {
            location,
            format,
            output,
        } => handle_header(&config, &location, format, output.as_deref()).await,
        Commands::Config { action } => handle_config(&config, &config_path, &action),
        Commands::Version => {
            println!("gcdm {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Handle fetch command
async fn handle_fetch(
    config: &Config,
    location: String,
    variable: String,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let request = FetchRequest::new(location, variable, config);
    let decoded = fetch::fetch_and_decode(config, &request, &NetcdfDecoder::new()).await?;

    emit(&decoded, &config.server_url, format, output)?;
    if let Some(path) = output {
        eprintln!(
            "{} Wrote {} ({} values) to {}",
            style("✓").green(),
            decoded.variable.full_name,
            decoded.variable.values.len(),
            path.display()
        );
    }
    Ok(())
}

/// Handle header command
async fn handle_header(
    config: &Config,
    location: &str,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let response = fetch::fetch_header(config, location, config.timeout()).await?;
    let header = FileHeader::from_response(&response)?;
    emit(&header, &config.server_url, format, output)
}

/// Handle config command
fn handle_config(config: &Config, path: &Path, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config)
                .map_err(|e| GcdmError::SerializationError(e.to_string()))?;
            println!("# {}", path.display());
            print!("{text}");
            Ok(())
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(GcdmError::InvalidArgument(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            Config::default().save_to(path)?;
            println!("{} Wrote {}", style("✓").green(), path.display());
            Ok(())
        }
    }
}

fn emit<T>(payload: &T, server: &str, format: OutputFormat, path: Option<&Path>) -> Result<()>
where
    T: serde::Serialize + std::fmt::Display,
{
    let bytes = output::render(payload, server, format)
        .map_err(|e| GcdmError::SerializationError(format!("{e:#}")))?;
    output::write_output(&bytes, path).map_err(|e| GcdmError::FileError {
        path: path.map_or_else(|| PathBuf::from("<stdout>"), Path::to_path_buf),
        reason: format!("{e:#}"),
    })
}
