use thiserror::Error;

/// Errors raised while loading configuration or bootstrapping the provider.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid authorization provider URL '{url}': {reason}")]
    InvalidProviderUrl { url: String, reason: String },

    #[error("cannot read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config format: {0}")]
    Format(#[from] serde_yaml::Error),

    #[error("config is not valid, total errors: {}\n{}", .0.len(), .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("token storage error: {0}")]
    Storage(String),
}
