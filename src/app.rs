use crate::completion;
use crate::config::Config;
use crate::device::{self, DeviceError};
use crate::parser::{read_clippings, ParseError};
use crate::query::{apply, Query, QueryError};
use crate::render::{Renderer, Style};
use std::io::{IsTerminal, Write};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum AppError {
    Parse(ParseError),
    Query(QueryError),
    Device(DeviceError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Parse(e) => write!(f, "{}", e),
            AppError::Query(e) => write!(f, "{}", e),
            AppError::Device(e) => write!(f, "{}", e),
            AppError::Json(e) => write!(f, "Failed to encode JSON: {}", e),
            AppError::Io(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::Parse(e)
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::Query(e)
    }
}

impl From<DeviceError> for AppError {
    fn from(e: DeviceError) -> Self {
        AppError::Device(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

pub fn run(config: &Config) -> Result<(), AppError> {
    let stdout = std::io::stdout();
    let style = Style::resolve(
        config.color,
        stdout.is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    );
    let mut out = stdout.lock();

    if let Some(shell) = config.completions {
        completion::generate(shell, &mut out);
        return Ok(());
    }

    if let Some(dir) = &config.completion_dir {
        if let Err(e) = completion::ensure_zsh_completion(dir) {
            warn!(dir = %dir.display(), error = %e, "could not write zsh completion");
        }
    }

    let output = query(config, style)?;
    out.write_all(output.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Copies (if asked), parses, filters and renders into a single buffer so
/// that nothing is printed when any step fails.
pub fn query(config: &Config, style: Style) -> Result<String, AppError> {
    if config.copy {
        device::copy_from_device(&config.device_path, &config.clippings_path)?;
    }

    let clippings = read_clippings(&config.clippings_path)?;
    let query = Query::compile(&config.query)?;
    let matched = apply(&clippings, &query, config.sort);
    debug!(parsed = clippings.len(), emitted = matched.len(), "query finished");

    let renderer = Renderer::new(config.fields.clone(), style);
    if config.json {
        let mut json = renderer.render_json(&matched)?;
        json.push('\n');
        return Ok(json);
    }

    let mut output = String::new();
    for line in renderer.render(&matched) {
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}
