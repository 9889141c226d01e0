use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

/// Credentials for the PostgREST-style persistent record store.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// None means demo mode: pure in-memory store seeded with mock data.
    pub backend: Option<BackendConfig>,
    /// None means enrichment always uses the fallback pools.
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Demo mode is entered when the backend or provider variables are
    /// absent or still hold the template placeholders from the sample env
    /// file, so a fresh checkout runs without any credentials.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5001".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let backend = match (real_var("SUPABASE_URL"), real_var("SUPABASE_ANON_KEY")) {
            (Some(base_url), Some(api_key)) => Some(BackendConfig { base_url, api_key }),
            _ => None,
        };

        let gemini_api_key = real_var("GEMINI_API_KEY");

        Ok(Config {
            bind_address,
            backend,
            gemini_api_key,
        })
    }

    pub fn demo_mode(&self) -> bool {
        self.backend.is_none() || self.gemini_api_key.is_none()
    }

    pub fn mode_label(&self) -> &'static str {
        if self.demo_mode() { "DEMO" } else { "LIVE" }
    }
}

/// Reads a variable, treating placeholder template values as unset.
fn real_var(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("your-") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_values_count_as_unset() {
        // real_var reads the process environment, so exercise the trimming
        // logic through a variable we control.
        unsafe {
            env::set_var("MEMEHUSTLE_TEST_PLACEHOLDER", "your-supabase-project-url");
        }
        assert_eq!(real_var("MEMEHUSTLE_TEST_PLACEHOLDER"), None);
        unsafe {
            env::set_var("MEMEHUSTLE_TEST_PLACEHOLDER", "https://db.example.com");
        }
        assert_eq!(
            real_var("MEMEHUSTLE_TEST_PLACEHOLDER"),
            Some("https://db.example.com".to_string())
        );
        unsafe {
            env::remove_var("MEMEHUSTLE_TEST_PLACEHOLDER");
        }
    }
}
