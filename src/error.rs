use thiserror::Error;

/// Failures of the fetch stage. Every variant is terminal for a pipeline run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{0}': expected an absolute http(s) URL with a host")]
    InvalidUrl(String),

    #[error("Navigation to {url} did not settle within {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to fetch page: {0}")]
    Failed(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// Failures of a single call to the generative capability.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("empty response")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("No draft in this session; generate scenarios first")]
    NoDraft,

    #[error("Failed to write feature file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

pub type Result<T> = std::result::Result<T, Error>;
