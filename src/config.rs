use clap::Parser;

/// Log output format for `tracing-subscriber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Runtime configuration for the server binary. Every field can come from a
/// flag or its matching `CONSTELLATION_*` environment variable, following
/// the teacher's one-process/one-binary model rather than a config file.
#[derive(Debug, Clone, Parser)]
#[command(name = "constellation", version, about = "Kubernetes resource graph server")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "CONSTELLATION_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Namespace used to resolve a seed object when the request omits one.
    #[arg(long, env = "CONSTELLATION_NAMESPACE", default_value = "default")]
    pub default_namespace: String,

    /// Overrides the engine's recursion depth cutoff.
    #[arg(long, env = "CONSTELLATION_MAX_DEPTH")]
    pub max_depth: Option<u32>,

    /// `tracing-subscriber` output format.
    #[arg(long, env = "CONSTELLATION_LOG_FORMAT", value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

impl Config {
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        match self.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt().with_env_filter(filter).compact().init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt().with_env_filter(filter).json().init();
            }
        }
    }
}
