//! Startup configuration errors.

/// Fatal configuration problems detected before the server starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no signing secret configured (set STARSTUDY_JWT_SECRET or use --jwt-secret-file)")]
    MissingSecret,
    #[error("signing secret is shorter than {min} bytes")]
    SecretTooShort { min: usize },
    #[error("failed to read signing secret from {path}: {source}")]
    SecretFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
