use crate::error::{EbdError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Reads settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("EBD_MAX_CONNECTIONS").ok(),
        )
    }

    fn from_vars(database_url: Option<String>, max_connections: Option<String>) -> Result<Self> {
        let database_url = database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| EbdError::Config("DATABASE_URL must be set".to_string()))?;

        let max_connections = match max_connections {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                EbdError::Config(format!(
                    "EBD_MAX_CONNECTIONS must be a positive integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pool_size() {
        let config = Config::from_vars(Some("postgres://localhost/ebd".into()), None).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/ebd");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn requires_database_url() {
        let err = Config::from_vars(None, None).unwrap_err();
        assert!(matches!(err, EbdError::Config(_)));

        let err = Config::from_vars(Some("  ".into()), None).unwrap_err();
        assert!(matches!(err, EbdError::Config(_)));
    }

    #[test]
    fn parses_pool_size() {
        let config =
            Config::from_vars(Some("postgres://db".into()), Some("12".into())).unwrap();
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn rejects_bad_pool_size() {
        assert!(Config::from_vars(Some("postgres://db".into()), Some("zero".into())).is_err());
        assert!(Config::from_vars(Some("postgres://db".into()), Some("0".into())).is_err());
    }
}
