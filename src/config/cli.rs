use std::path::PathBuf;

use clap::{Args, Parser, builder::BoolishValueParser};

/// Command-line arguments for the Tally binary.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Tally counter server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TALLY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port. A blank value counts as unset.
    #[arg(long = "server-port", env = "PORT", value_name = "PORT")]
    pub server_port: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the store backend (redis|memory).
    #[arg(long = "store-backend", value_name = "BACKEND")]
    pub store_backend: Option<String>,

    /// Override the store address as host:port.
    #[arg(long = "store-address", env = "REDIS_ADDR", value_name = "HOST:PORT")]
    pub store_address: Option<String>,

    /// Override the store username.
    #[arg(long = "store-username", env = "REDIS_USERNAME", value_name = "NAME")]
    pub store_username: Option<String>,

    /// Override the store password.
    #[arg(
        long = "store-password",
        env = "REDIS_PASSWORD",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub store_password: Option<String>,

    /// Override the per-call store timeout.
    #[arg(long = "store-timeout-ms", value_name = "MS")]
    pub store_timeout_ms: Option<u64>,

    /// Override the counter key namespace prefix.
    #[arg(long = "counters-key-prefix", value_name = "PREFIX")]
    pub counters_key_prefix: Option<String>,

    /// Override the lifetime of fresh counters and remote writes.
    #[arg(long = "counters-default-ttl-seconds", value_name = "SECONDS")]
    pub counters_default_ttl_seconds: Option<u64>,

    /// Override the reconciliation interval.
    #[arg(long = "counters-flush-interval-ms", value_name = "MS")]
    pub counters_flush_interval_ms: Option<u64>,
}
