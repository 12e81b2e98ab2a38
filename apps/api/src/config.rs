use std::time::Duration;

use anyhow::{Context, Result};

/// Default Gemini generation endpoint. Overridable through `GEMINI_ENDPOINT`.
pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Low temperature keeps the analysis output stable across calls.
pub const GEMINI_TEMPERATURE: f32 = 0.2;

/// Application configuration loaded from environment variables.
/// Loaded once at startup; components receive immutable views of it.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    /// Optional at startup. A missing key is reported by the pipeline at call time.
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
    pub gemini_timeout_secs: u64,
    pub require_bearer_scheme: bool,
    pub port: u16,
    pub rust_log: String,
}

/// Settings consumed by the authentication gate.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    /// When false, any first token of the Authorization header is accepted as the scheme.
    pub require_bearer_scheme: bool,
}

/// Settings consumed by the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = require(&lookup, "JWT_SECRET")?;

        Ok(Config {
            jwt_secret,
            gemini_api_key: optional(&lookup, "GEMINI_API_KEY"),
            gemini_endpoint: optional(&lookup, "GEMINI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            gemini_timeout_secs: optional(&lookup, "GEMINI_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("GEMINI_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(120),
            require_bearer_scheme: optional(&lookup, "AUTH_REQUIRE_BEARER_SCHEME")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            port: optional(&lookup, "PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional(&lookup, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            secret: self.jwt_secret.clone(),
            require_bearer_scheme: self.require_bearer_scheme,
        }
    }

    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            endpoint: self.gemini_endpoint.clone(),
            temperature: GEMINI_TEMPERATURE,
            timeout: Duration::from_secs(self.gemini_timeout_secs),
        }
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Blank values count as unset.
fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
