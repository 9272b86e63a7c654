use std::env;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Config {
    // Credential signing
    pub jwt_secret: String,

    // Server
    pub bind_addr: SocketAddr,

    // Environment
    pub production: bool,
    pub skip_auth: bool,

    // Credential validity window (seconds)
    pub token_ttl_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("production", &self.production)
            .field("skip_auth", &self.skip_auth)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // JWT_SECRET is required: tokens signed with a guessable default
        // would be forgeable by anyone
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        if jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        let production = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let skip_auth = env::var("SKIP_AUTH").map(|v| v == "true").unwrap_or(false);

        // SKIP_AUTH bypasses authentication entirely; a production process
        // must refuse to start with it rather than rely on a runtime check
        if production && skip_auth {
            return Err(ConfigError::InvalidValue(
                "SKIP_AUTH".to_string(),
                "cannot be enabled when APP_ENV=production".to_string(),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Credential validity window, 24h by default
        let token_ttl_secs = parse_env_or_default("TOKEN_TTL_SECS", 86_400)?;
        if token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            jwt_secret,
            bind_addr,
            production,
            skip_auth,
            token_ttl_secs,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
