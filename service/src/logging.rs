use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Modules to filter out from logging when not in Trace mode.
/// The HTTP stack logs every connection and retry at debug level.
const FILTERED_MODULES: &[&str] = &[
    "reqwest",
    "reqwest_retry",
    "reqwest_middleware",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "mockito",
];

pub struct Logger {}

impl Logger {
    /// Installs the terminal logger at the configured level.
    ///
    /// Below Trace, log lines from the HTTP stack are dropped so request failures
    /// are reported once, by this client. Fails if a logger is already installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_target_level(LevelFilter::Error);

        if level != LevelFilter::Trace {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
