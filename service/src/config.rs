use clap::builder::TypedValueParser as _;
use clap::Args;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use portal_auth::http::DEFAULT_AUTH_HEADER;

/// Default portal API the client talks to when `BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Where the persisted session record lives between runs.
pub const DEFAULT_SESSION_FILE: &str = ".event_portal_session.json";

/// Client settings, read from flags with environment fallbacks.
///
/// Flattened into the command line with `#[command(flatten)]`; loading `.env`
/// beforehand is up to the binary.
#[derive(Clone, Debug, Args)]
pub struct Config {
    /// Base URL of the Event Portal API
    #[arg(short, long, env, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Name of the request header that carries the session token
    #[arg(long, env, default_value = DEFAULT_AUTH_HEADER)]
    auth_header: String,

    /// File the session record is persisted to between runs
    #[arg(short, long, env, default_value = DEFAULT_SESSION_FILE)]
    session_file: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// How many times a transient failure of a GET, PUT or DELETE is retried
    #[arg(long, env, default_value_t = 2)]
    pub max_retries: u32,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,
}

impl Config {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
