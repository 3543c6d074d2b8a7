use thiserror::Error;

/// Problems in a tracker configuration, detected before any event is handled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tracker key must not be empty")]
    EmptyKey,

    #[error("tracker '{0}' has max_stacks = 0")]
    ZeroMaxStacks(String),

    #[error("tracker '{0}' has max_stacks above {1}")]
    MaxStacksTooLarge(String, u32),

    #[error("tracker key '{0}' is defined more than once")]
    DuplicateKey(String),

    #[error("no embedded profile matches '{0}'")]
    UnknownProfile(String),
}
