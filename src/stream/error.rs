/// Errors that can occur while configuring or running the stream scanner
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The trigger table is not valid TOML or misses required keys
    #[error("invalid trigger configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The pattern of a trigger does not compile
    #[error("invalid regex for trigger {shortname}: {source}")]
    Regex {
        shortname: String,
        #[source]
        source: regex::Error,
    },
}
