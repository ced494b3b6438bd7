//! Tracing setup for the dogfight client.
//!
//! Console output carries uptime, target and thread name. Debug builds can
//! also write one JSON object per event to `dogfight.log` for replaying a
//! session afterwards.

use std::fs::File;
use std::path::{Path, PathBuf};

use dogfight_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config provide a usable one.
pub const DEFAULT_FILTER: &str = "info,tungstenite=warn,tokio_tungstenite=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "dogfight.log";

/// Install the global subscriber. Returns the JSON log path when file
/// logging was enabled.
///
/// `RUST_LOG` wins over `config.debug.log_level`. A config level that does
/// not parse as a filter falls back to [`DEFAULT_FILTER`]. Calling this twice
/// leaves the first subscriber in place.
///
/// ```no_run
/// use dogfight_config::Config;
///
/// let config = Config::default();
/// let json_log = dogfight_log::init_logging(Some("logs".as_ref()), true, Some(&config));
/// ```
pub fn init_logging(
    log_dir: Option<&Path>,
    debug_build: bool,
    config: Option<&Config>,
) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config_filter(config));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let file = log_dir
        .filter(|_| debug_build)
        .and_then(|dir| open_log_file(dir).map(|file| (dir.join(LOG_FILE_NAME), file)));

    match file {
        Some((path, file)) => {
            let json_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_timer(fmt::time::uptime())
                .json();
            registry.with(json_layer).try_init().ok().map(|()| path)
        }
        None => {
            let _ = registry.try_init();
            None
        }
    }
}

/// Filter taken from the config, or [`DEFAULT_FILTER`] when the configured
/// level is blank or malformed.
pub fn config_filter(config: Option<&Config>) -> EnvFilter {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log_file(dir: &Path) -> Option<File> {
    std::fs::create_dir_all(dir).ok()?;
    File::create(dir.join(LOG_FILE_NAME)).ok()
}
