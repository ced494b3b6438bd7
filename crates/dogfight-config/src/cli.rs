//! Command-line overrides shared by every dogfight binary.

use std::path::PathBuf;

use clap::Args;

use crate::Config;

/// Flags that take precedence over `config.ron`. Binaries flatten this into
/// their own parser.
#[derive(Args, Debug, Clone, Default)]
pub struct CliArgs {
    /// Peer host name or IP.
    #[arg(long)]
    pub server: Option<String>,

    /// Peer port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Callsign announced in `init`.
    #[arg(long)]
    pub callsign: Option<String>,

    /// Log filter, e.g. `debug` or `info,dogfight_net=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron`.
    #[arg(long = "config", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Overwrite file settings with any flag that was given. Blank strings
    /// count as absent.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(server) = non_blank(&args.server) {
            self.network.server_address = server.to_string();
        }
        if let Some(port) = args.port {
            self.network.server_port = port;
        }
        if let Some(callsign) = non_blank(&args.callsign) {
            self.network.callsign = Some(callsign.to_string());
        }
        if let Some(level) = non_blank(&args.log_level) {
            self.debug.log_level = level.to_string();
        }
    }
}
