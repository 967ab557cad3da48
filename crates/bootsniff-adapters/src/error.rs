use thiserror::Error;

/// Errors raised while preparing adapters from configuration.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid pattern for target.{field}: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid target configuration: {0}")]
    Invalid(String),
}
