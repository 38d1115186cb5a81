//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::error::ConfigError;
use crate::guard::RouteGuardConfig;
use crate::jwt::JwtConfig;
use crate::users::UserDirectory;
use clap::Parser;

/// Environment variable holding the signing secret.
pub const JWT_SECRET_ENV: &str = "STARSTUDY_JWT_SECRET";

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "StarStudy", about = "Study room booking session server")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to file containing the JWT secret. Prefer the STARSTUDY_JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Mark the refresh cookie Secure (enable in production behind HTTPS)
    #[arg(long, env = "STARSTUDY_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Take the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long)]
    pub trust_proxy: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the JWT secret from the environment or a file.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Result<String, ConfigError> {
    let secret = if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(JWT_SECRET_ENV) };
        secret
    } else if let Some(path) = jwt_secret_file {
        read_secret_file(path)?
    } else {
        return Err(ConfigError::MissingSecret);
    };

    validate_secret(secret)
}

fn read_secret_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .map_err(|source| ConfigError::SecretFile {
            path: path.to_string(),
            source,
        })
}

fn validate_secret(secret: String) -> Result<String, ConfigError> {
    if secret.is_empty() {
        return Err(ConfigError::MissingSecret);
    }
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            min: MIN_JWT_SECRET_LENGTH,
        });
    }
    Ok(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, jwt_secret: &str) -> Result<ServerConfig, ConfigError> {
    Ok(ServerConfig {
        jwt: JwtConfig::new(jwt_secret.as_bytes())?,
        users: UserDirectory::new(),
        secure_cookies: args.secure_cookies,
        trust_proxy: args.trust_proxy,
        guard: RouteGuardConfig::default(),
    })
}
