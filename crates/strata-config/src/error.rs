//! Errors from `config.ron` handling.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config.ron: {0}")]
    Read(#[source] std::io::Error),

    #[error("cannot write config.ron: {0}")]
    Write(#[source] std::io::Error),

    #[error("config.ron is not valid RON: {0}")]
    Parse(#[source] ron::error::SpannedError),

    #[error("cannot encode config as RON: {0}")]
    Serialize(#[source] ron::Error),

    /// Written by a build with a different config layout.
    #[error("config version {found} is not supported (this build reads {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// A setting the builders cannot use.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
