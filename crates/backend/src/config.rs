//! Server configuration loaded from the environment (and `.env`).

use clap::Parser;

pub const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Parser)]
#[command(name = "backend")]
#[command(about = "Authentication server with local and Google OAuth sign-in")]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL", default_value = "")]
    pub database_url: String,

    /// Keep users in process memory instead of Postgres (development only).
    #[arg(long, env = "IN_MEMORY_STORE", default_value_t = false)]
    pub in_memory_store: bool,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Origin the OAuth callback redirects back to after login.
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = "http://localhost:3000")]
    pub frontend_origin: String,

    /// Comma-separated CORS origins. Falls back to `FRONTEND_ORIGIN`.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS")]
    pub cors_allowed_origins: Option<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Session token lifetime in minutes. Also used as the cookie max-age.
    #[arg(long, env = "TOKEN_EXPIRES_IN", default_value_t = 60)]
    pub token_expires_in: i64,

    #[arg(long, env = "COOKIE_DOMAIN", default_value = "localhost")]
    pub cookie_domain: String,

    #[arg(long, env = "COOKIE_SECURE", default_value_t = false)]
    pub cookie_secure: bool,

    #[arg(long, env = "GOOGLE_OAUTH_CLIENT_ID")]
    pub google_client_id: String,

    #[arg(long, env = "GOOGLE_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: String,

    #[arg(long, env = "GOOGLE_OAUTH_REDIRECT_URI")]
    pub google_redirect_uri: String,

    #[arg(long, env = "GOOGLE_AUTH_URL", default_value = DEFAULT_GOOGLE_AUTH_URL)]
    pub google_auth_url: String,

    #[arg(long, env = "GOOGLE_TOKEN_URL", default_value = DEFAULT_GOOGLE_TOKEN_URL)]
    pub google_token_url: String,

    #[arg(long, env = "GOOGLE_USERINFO_URL", default_value = DEFAULT_GOOGLE_USERINFO_URL)]
    pub google_userinfo_url: String,

    /// Upper bound for each call to the identity provider.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 30)]
    pub provider_timeout_secs: u64,

    /// Upper bound for each user store lookup.
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 5)]
    pub store_timeout_secs: u64,
}

impl Config {
    /// Parse configuration from environment variables only (no CLI args).
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self::try_parse_from(["backend"])?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET cannot be empty");
        }
        if self.token_expires_in <= 0 {
            anyhow::bail!("TOKEN_EXPIRES_IN must be a positive number of minutes");
        }
        if !self.in_memory_store && self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must be set unless IN_MEMORY_STORE=true");
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_expires_in)
    }

    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_timeout_secs)
    }

    /// Origins allowed to make credentialed cross-origin requests.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or(&self.frontend_origin)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        in_memory_store: true,
        port: 0,
        frontend_origin: "http://localhost:3000".to_string(),
        cors_allowed_origins: None,
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        token_expires_in: 60,
        cookie_domain: "localhost".to_string(),
        cookie_secure: false,
        google_client_id: "test-client-id".to_string(),
        google_client_secret: "test-client-secret".to_string(),
        google_redirect_uri: "http://localhost:8000/api/sessions/oauth/google".to_string(),
        google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
        google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
        google_userinfo_url: DEFAULT_GOOGLE_USERINFO_URL.to_string(),
        provider_timeout_secs: 5,
        store_timeout_secs: 1,
    }
}
