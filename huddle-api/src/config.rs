/// Configuration management for the API server
///
/// Loaded once in `main` from environment variables (and a `.env` file when
/// present), then shared read-only through `AppState`.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3001)
/// - `CORS_ORIGINS`: Comma separated origins, `*` for permissive (default: http://localhost:3000)
/// - `REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `SENDGRID_API_KEY`: Enables SendGrid delivery; mail is only logged when unset
/// - `MAIL_FROM`: Sender address (default: info@huddle.local)
/// - `FRONTEND_URL`: Base URL for links in emails (default: http://localhost:3000)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// # Example
///
/// ```no_run
/// use huddle_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` means permissive
    pub cors_origins: Vec<String>,

    pub request_timeout_seconds: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// `None` selects the logging mailer
    pub sendgrid_api_key: Option<String>,

    pub from: String,

    /// Base URL of the web app, used to build reset links
    pub frontend_url: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", name, raw, e))
}

/// Splits a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let sendgrid_api_key = env::var("SENDGRID_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: parse_var("API_PORT", "3001")?,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "http://localhost:3000")),
                request_timeout_seconds: parse_var("REQUEST_TIMEOUT_SECONDS", "30")?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            mail: MailConfig {
                sendgrid_api_key,
                from: var_or("MAIL_FROM", "info@huddle.local"),
                frontend_url: var_or("FRONTEND_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
            },
            log_format: parse_var("LOG_FORMAT", "pretty")?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should allow any origin
    pub fn cors_is_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }

    /// Link placed in password reset emails
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.mail.frontend_url, token)
    }
}
