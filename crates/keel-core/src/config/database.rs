use serde::{Deserialize, Serialize};

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Pool checkout timeout in seconds.
    #[serde(default = "default_pool_timeout")]
    pub pool_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: default_pool_size(),
            pool_timeout_secs: default_pool_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve a connection URL from the environment.
    ///
    /// Uses `DATABASE_URL` verbatim when present, otherwise builds one from
    /// `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and `DB_SSLMODE`.
    pub fn url_from_env() -> String {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                return url;
            }
        }

        compose_url(
            &env_or("DB_USER", "postgres"),
            &env_or("DB_PASSWORD", "password"),
            &env_or("DB_HOST", "localhost"),
            &env_or("DB_PORT", "5432"),
            &env_or("DB_NAME", "go_clean_gin"),
            &env_or("DB_SSLMODE", "disable"),
        )
    }
}

fn compose_url(
    user: &str,
    password: &str,
    host: &str,
    port: &str,
    name: &str,
    sslmode: &str,
) -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        user, password, host, port, name, sslmode
    )
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn default_pool_size() -> u32 {
    10
}

fn default_pool_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.pool_timeout_secs, 30);
    }

    #[test]
    fn test_parse_database_config() {
        let toml = r#"
            url = "postgres://localhost/test"
            pool_size = 2
            pool_timeout_secs = 5
        "#;

        let config: DatabaseConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.pool_timeout_secs, 5);
    }

    #[test]
    fn test_compose_url() {
        let url = compose_url("app", "secret", "db", "6543", "shop", "require");
        assert_eq!(url, "postgres://app:secret@db:6543/shop?sslmode=require");
    }
}
