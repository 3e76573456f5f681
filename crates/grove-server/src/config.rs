use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use grove_db::queries::notifications::{DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};

/// Server settings read from `GROVE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub public_url: String,
    pub notification_retention_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let retention_days: i64 = parse(
            "GROVE_NOTIFICATION_RETENTION_DAYS",
            &var("GROVE_NOTIFICATION_RETENTION_DAYS", &DEFAULT_RETENTION_DAYS.to_string()),
        )?;
        anyhow::ensure!(
            (0..=MAX_RETENTION_DAYS).contains(&retention_days),
            "GROVE_NOTIFICATION_RETENTION_DAYS must be between 0 and {MAX_RETENTION_DAYS}"
        );

        Ok(Self {
            host: var("GROVE_HOST", "0.0.0.0"),
            port: parse("GROVE_PORT", &var("GROVE_PORT", "5000"))?,
            db_path: PathBuf::from(var("GROVE_DB_PATH", "grove.db")),
            public_url: var("GROVE_PUBLIC_URL", "http://localhost:5000")
                .trim_end_matches('/')
                .to_string(),
            notification_retention_days: retention_days,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.db_path, PathBuf::from("grove.db"));
        assert_eq!(cfg.public_url, "http://localhost:5000");
        assert_eq!(cfg.notification_retention_days, 30);
        assert_eq!(cfg.addr().unwrap().port(), 5000);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("GROVE_PORT", "8080"),
            ("GROVE_PUBLIC_URL", "https://grove.example/"),
            ("GROVE_NOTIFICATION_RETENTION_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.public_url, "https://grove.example");
        assert_eq!(cfg.notification_retention_days, 7);
    }

    #[test]
    fn bad_numbers_abort() {
        assert!(config(&[("GROVE_PORT", "eighty")]).is_err());
        assert!(config(&[("GROVE_NOTIFICATION_RETENTION_DAYS", "-1")]).is_err());
    }

    #[test]
    fn retention_is_capped() {
        assert!(config(&[("GROVE_NOTIFICATION_RETENTION_DAYS", "100000000")]).is_err());
        let cfg = config(&[("GROVE_NOTIFICATION_RETENTION_DAYS", "36500")]).unwrap();
        assert_eq!(cfg.notification_retention_days, MAX_RETENTION_DAYS);
    }
}
