use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Default number of bytes the watermark stage will buffer. Objects
/// larger than this fail the transform instead of ballooning memory.
const DEFAULT_TRANSFORM_MAX_BYTES: usize = 16 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub container: String,
    pub watermark: bool,
    pub transform_max_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Conditional-GET streaming relay")]
pub struct Args {
    /// Host to bind to (overrides OBJECT_RELAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides OBJECT_RELAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides OBJECT_RELAY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides OBJECT_RELAY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Demo container name (overrides OBJECT_RELAY_CONTAINER)
    #[arg(long)]
    pub container: Option<String>,

    /// Disable the watermark transform and stream payloads unchanged
    #[arg(long)]
    pub no_watermark: bool,

    /// Transform input cap in bytes (overrides OBJECT_RELAY_TRANSFORM_MAX_BYTES)
    #[arg(long)]
    pub transform_max_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("OBJECT_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("OBJECT_RELAY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing OBJECT_RELAY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading OBJECT_RELAY_PORT"),
        };
        let env_storage =
            env::var("OBJECT_RELAY_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("OBJECT_RELAY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/object_relay.db?mode=rwc".into());
        let env_container =
            env::var("OBJECT_RELAY_CONTAINER").unwrap_or_else(|_| "tutorial-streaming".into());
        let env_watermark = match env::var("OBJECT_RELAY_WATERMARK") {
            Ok(value) => !matches!(value.as_str(), "0" | "false" | "off"),
            Err(_) => true,
        };
        let env_transform_max = match env::var("OBJECT_RELAY_TRANSFORM_MAX_BYTES") {
            Ok(value) => value.parse::<usize>().with_context(|| {
                format!("parsing OBJECT_RELAY_TRANSFORM_MAX_BYTES value `{}`", value)
            })?,
            Err(_) => DEFAULT_TRANSFORM_MAX_BYTES,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            container: args.container.unwrap_or(env_container),
            watermark: env_watermark && !args.no_watermark,
            transform_max_bytes: args.transform_max_bytes.unwrap_or(env_transform_max),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
