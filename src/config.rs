//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::lookup::{AuthScheme, LookupConfig, SearchStrategy};

/// Base URL baked in at build time, if the build environment provided one.
pub const DEFAULT_API_BASE_URL: &str = match option_env!("COPYRIGHT_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Terminal front-end for copyright metadata lookups
#[derive(Parser, Debug, Clone)]
#[command(name = "copyright-desk")]
#[command(version)]
pub struct Config {
    /// Base URL of the copyright lookup service
    #[arg(long, env = "COPYRIGHT_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Credential sent with every lookup request
    #[arg(long, value_enum, default_value_t = AuthScheme::ApiKey)]
    pub auth_scheme: AuthScheme,

    /// How table-wide searches are sent
    #[arg(long, value_enum, default_value_t = SearchStrategy::PerItem)]
    pub search_strategy: SearchStrategy,

    /// API key stored into the session at startup
    #[arg(long, env = "COPYRIGHT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Do not append the `mode` query parameter to lookup requests
    #[arg(long)]
    pub no_ai_mode: bool,

    /// Directory exported spreadsheets are written to
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Tracing filter directives, e.g. `debug` or `copyright_desk=trace`
    #[arg(long, env = "COPYRIGHT_LOG", default_value = "info")]
    pub log_filter: String,

    /// Log file (defaults to ~/.copyright-desk/copyright-desk.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            base_url: self.api_base_url.clone(),
            auth_scheme: self.auth_scheme,
            send_ai_mode: !self.no_ai_mode,
        }
    }

    /// The startup API key, ignoring blank values.
    pub fn seed_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
