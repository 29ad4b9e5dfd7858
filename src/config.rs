use crate::models::Field;
use crate::query::{QueryOptions, SortOrder};
use crate::render::{parse_fields, ColorChoice};
use clap::Parser;
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "kcq";
const CONFIG_FILE: &str = "config.toml";
const CLIPPINGS_FILE: &str = "My Clippings.txt";

#[derive(Parser, Debug)]
#[command(name = "kcq")]
#[command(about = "Query highlights from a Kindle \"My Clippings.txt\" export")]
pub struct CliArgs {
    /// Comma-delimited field names (#,title,author,pageStart,pageEnd,createdAt,highlightText)
    #[arg(short, long)]
    pub fields: Option<String>,

    /// Copy the "My Clippings.txt" file from your Kindle
    #[arg(short, long)]
    pub copy: bool,

    /// Regex for query (against the title, author & highlight text)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Regex for query (against the title)
    #[arg(short = 'b', long)]
    pub query_book_title: Option<String>,

    /// Regex for query (against the author)
    #[arg(short = 'a', long)]
    pub query_author: Option<String>,

    /// Regex for query (against the highlight text)
    #[arg(short = 't', long)]
    pub query_highlighted_text: Option<String>,

    /// Sort by creation date
    #[arg(short, long, conflicts_with = "sort_descending")]
    pub sort: bool,

    /// Sort by creation date, descending
    #[arg(short = 'S', long)]
    pub sort_descending: bool,

    /// Path to the local "My Clippings.txt"
    #[arg(short = 'p', long)]
    pub clippings_path: Option<PathBuf>,

    /// Mount point of the Kindle
    #[arg(short, long)]
    pub device_path: Option<PathBuf>,

    /// When to color the output. Query matches are only marked in color;
    /// use --json to keep match positions when piping
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print clippings as a JSON array, with the byte range of each query
    /// match under "matches"
    #[arg(long)]
    pub json: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

/// Contents of `config.toml`. An empty `completion_dir` turns off the zsh
/// completion bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub clippings_path: Option<PathBuf>,
    pub device_path: Option<PathBuf>,
    pub completion_dir: Option<PathBuf>,
}

/// Values read from `KCQ_*` environment variables (after `.env` is loaded).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub clippings_path: Option<PathBuf>,
    pub device_path: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            clippings_path: std::env::var_os("KCQ_CLIPPINGS_PATH").map(PathBuf::from),
            device_path: std::env::var_os("KCQ_DEVICE_PATH").map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub clippings_path: PathBuf,
    pub device_path: PathBuf,
    pub completion_dir: Option<PathBuf>,
    pub copy: bool,
    pub query: QueryOptions,
    pub sort: SortOrder,
    pub fields: Vec<Field>,
    pub color: ColorChoice,
    pub json: bool,
    pub completions: Option<Shell>,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    NoConfigDir,
    Io { path: String, message: String },
    InvalidConfigFile { path: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => {
                write!(f, "Could not determine the user config directory")
            }
            ConfigError::Io { path, message } => {
                write!(f, "Cannot access config file '{}': {}", path, message)
            }
            ConfigError::InvalidConfigFile { path, message } => {
                write!(f, "Invalid config file '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cli = CliArgs::parse();

        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let defaults = default_file_config(
            &config_dir,
            dirs::home_dir().as_deref(),
            std::env::var("USER").ok().as_deref(),
        );
        let file = bootstrap_config_file(&config_dir.join(APP_DIR).join(CONFIG_FILE), &defaults)?;

        Ok(Self::from_sources(cli, EnvOverrides::from_env(), file, defaults))
    }

    /// Layers CLI flags over environment over config file over defaults.
    pub fn from_sources(
        cli: CliArgs,
        env: EnvOverrides,
        file: FileConfig,
        defaults: FileConfig,
    ) -> Self {
        let clippings_path = cli
            .clippings_path
            .or(env.clippings_path)
            .or(file.clippings_path)
            .or(defaults.clippings_path)
            .unwrap_or_else(|| PathBuf::from(CLIPPINGS_FILE));

        let device_path = cli
            .device_path
            .or(env.device_path)
            .or(file.device_path)
            .or(defaults.device_path)
            .unwrap_or_else(|| default_device_path(None));

        let completion_dir = file
            .completion_dir
            .or(defaults.completion_dir)
            .filter(|dir| !dir.as_os_str().is_empty());

        Config {
            clippings_path,
            device_path,
            completion_dir,
            copy: cli.copy,
            query: QueryOptions {
                combined: cli.query,
                title: cli.query_book_title,
                author: cli.query_author,
                text: cli.query_highlighted_text,
            },
            sort: SortOrder::from_flags(cli.sort, cli.sort_descending),
            fields: parse_fields(cli.fields.as_deref()),
            color: cli.color,
            json: cli.json,
            completions: cli.completions,
        }
    }
}

pub fn default_file_config(config_dir: &Path, home: Option<&Path>, user: Option<&str>) -> FileConfig {
    FileConfig {
        clippings_path: Some(config_dir.join(APP_DIR).join(CLIPPINGS_FILE)),
        device_path: Some(default_device_path(user)),
        completion_dir: home.map(|h| h.join(".config").join("zsh").join("completions")),
    }
}

fn default_device_path(user: Option<&str>) -> PathBuf {
    if cfg!(target_os = "macos") {
        return PathBuf::from("/Volumes/Kindle");
    }

    match user {
        Some(user) => Path::new("/media").join(user).join("Kindle"),
        None => PathBuf::from("/media/Kindle"),
    }
}

/// Reads the config file, writing `defaults` to it first if it does not exist.
/// A config file that cannot be written only costs a warning; one that exists
/// but does not parse is an error.
pub fn bootstrap_config_file(path: &Path, defaults: &FileConfig) -> Result<FileConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        return toml::from_str(&content).map_err(|e| ConfigError::InvalidConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        });
    }

    match write_config_file(path, defaults) {
        Ok(()) => info!(path = %path.display(), "wrote default config"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write default config"),
    }

    Ok(defaults.clone())
}

fn write_config_file(path: &Path, config: &FileConfig) -> Result<(), Box<dyn std::error::Error>> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
